// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for scan orchestration.
//!
//! - [`ConfigurationError`]: settings for the selected transport are incomplete
//! - [`TransportError`]: the backend could not be reached or misbehaved
//! - [`ScanError`]: what the orchestrator lets escape to the caller
//!
//! Transport errors never leave the orchestrator; they are folded into an
//! unreachable outcome and kept for diagnostics.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::record::{ScanAction, ScanState};

/// Required backend settings are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("socket address required")]
    SocketAddressRequired,
    #[error("executable path required")]
    ExecutablePathRequired,
}

/// Failure to obtain a structured reply from the backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to clamd at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("clamd I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to open {} for scanning: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backend answered with an `ERROR` status.
    #[error("backend error: {0}")]
    Daemon(String),

    #[error("unexpected backend reply: {0}")]
    Protocol(String),

    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} exited with {status}: {output}", program.display())]
    Exit {
        program: PathBuf,
        status: ExitStatus,
        output: String,
    },
}

/// Errors surfaced by [`crate::orchestrator::ScanOrchestrator::scan_file`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The backend replied but the reply lacks a required field.
    #[error("unexpected response format: missing '{field}' in reply {reply:?}")]
    UnexpectedResponseFormat { field: &'static str, reply: String },
}

/// Illegal operator disposition of a scan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispositionError {
    #[error("record already dispositioned as {0}")]
    AlreadyDispositioned(ScanAction),
    #[error("record in state {state} cannot be marked {action}")]
    NotApplicable { state: ScanState, action: ScanAction },
}
