// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! `clamdscan` executable transport.
//!
//! Exit codes: 0 = clean, 1 = virus found, anything else = error.
//! Output is one `<path>: <status>` line per scanned file.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use log::debug;

use super::{Backend, ScanResponse};
use crate::config::{ClamdConfig, TransportMode};
use crate::error::TransportError;

/// `ClamAV` scanner invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct ClamdScan {
    executable: PathBuf,
    args: Vec<String>,
}

impl ClamdScan {
    #[must_use]
    pub const fn new(executable: PathBuf, args: Vec<String>) -> Self {
        Self { executable, args }
    }

    #[must_use]
    pub fn from_config(config: &ClamdConfig) -> Self {
        Self::new(config.local_binary.clone(), config.binary_args.clone())
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn run(&self, command: &mut Command) -> Result<Output, TransportError> {
        command.output().map_err(|source| TransportError::Spawn {
            program: self.executable.clone(),
            source,
        })
    }

    fn exit_error(&self, output: &Output) -> TransportError {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        TransportError::Exit {
            program: self.executable.clone(),
            status: output.status,
            output: text.to_string(),
        }
    }
}

/// First non-empty line of the output.
fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

impl Backend for ClamdScan {
    fn transport(&self) -> TransportMode {
        TransportMode::Binary
    }

    fn ping(&self) -> Result<(), TransportError> {
        self.version().map(|_| ())
    }

    fn version(&self) -> Result<String, TransportError> {
        let output = self.run(Command::new(&self.executable).arg("--version"))?;
        if !output.status.success() {
            return Err(self.exit_error(&output));
        }
        first_line(&output.stdout)
            .ok_or_else(|| TransportError::Protocol("empty version output".to_string()))
    }

    fn scan(&self, path: &Path) -> Result<ScanResponse, TransportError> {
        debug!("{} scanning {}", self.executable.display(), path.display());

        let output = self.run(Command::new(&self.executable).args(&self.args).arg(path))?;
        let expected_exit = matches!(output.status.code(), Some(0 | 1));
        let response = ScanResponse::from_reply(&first_line(&output.stdout).unwrap_or_default());

        if response.is_error() {
            return Err(TransportError::Daemon(response.reply));
        }
        if !expected_exit && !response.is_complete() {
            return Err(self.exit_error(&output));
        }
        Ok(response)
    }
}
