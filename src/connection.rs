// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Backend handle selection.
//!
//! A [`ConnectionProvider`] belongs to one orchestrator and builds its
//! handle at most once. Handles do not connect on construction; a bad
//! address shows up as a transport error on the first call.

use std::path::Path;

use log::debug;

use crate::backend::binary::ClamdScan;
use crate::backend::socket::ClamdSocket;
use crate::backend::{Backend, ScanResponse};
use crate::config::{ScanConfig, TransportMode};
use crate::error::TransportError;

/// Backend handle tagged by transport.
#[derive(Debug, Clone)]
pub enum ConnectionHandle {
    Socket(ClamdSocket),
    Binary(ClamdScan),
}

impl ConnectionHandle {
    /// Build the handle for the configured transport.
    #[must_use]
    pub fn for_config(config: &ScanConfig) -> Self {
        match config.transport {
            TransportMode::Socket => Self::Socket(ClamdSocket::from_config(&config.clamd)),
            TransportMode::Binary => Self::Binary(ClamdScan::from_config(&config.clamd)),
        }
    }

    fn backend(&self) -> &dyn Backend {
        match self {
            Self::Socket(socket) => socket,
            Self::Binary(binary) => binary,
        }
    }
}

impl Backend for ConnectionHandle {
    fn transport(&self) -> TransportMode {
        self.backend().transport()
    }

    fn ping(&self) -> Result<(), TransportError> {
        self.backend().ping()
    }

    fn version(&self) -> Result<String, TransportError> {
        self.backend().version()
    }

    fn scan(&self, path: &Path) -> Result<ScanResponse, TransportError> {
        self.backend().scan(path)
    }
}

/// Lazily built, cached backend handle.
#[derive(Default)]
pub struct ConnectionProvider {
    handle: Option<Box<dyn Backend>>,
}

impl ConnectionProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that always yields `backend`.
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            handle: Some(backend),
        }
    }

    /// Cached handle, built from `config` on first use.
    pub fn get(&mut self, config: &ScanConfig) -> &dyn Backend {
        &**self.handle.get_or_insert_with(|| -> Box<dyn Backend> {
            debug!("Creating {} backend handle", config.transport);
            Box::new(ConnectionHandle::for_config(config))
        })
    }

    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.handle.is_some()
    }
}
