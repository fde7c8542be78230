// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Default clamd socket path (matches `LocalSocket` in clamd.conf).
pub const DEFAULT_CLAMD_SOCKET: &str = "/var/run/clamav/clamd.ctl";

/// Default `clamdscan` location.
pub const DEFAULT_CLAMD_BINARY: &str = "/usr/bin/clamdscan";

/// Default socket read/write timeout in seconds (matches clamd `CommandReadTimeout`)
const fn default_timeout_secs() -> u64 {
    30
}

/// Backend transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// clamd Unix socket.
    #[default]
    Socket,
    /// `clamdscan` executable.
    Binary,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Socket => write!(f, "socket"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// How file contents reach clamd over the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketScanMode {
    /// Stream contents in chunks (works when clamd cannot read the file).
    #[default]
    Instream,
    /// Pass an open file descriptor (clamd reads the file itself).
    Fildes,
}

/// Settings that must agree with clamd.conf.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClamdConfig {
    /// Socket the daemon listens on (required for socket transport).
    pub local_socket: PathBuf,

    /// Scanner executable (required for binary transport).
    pub local_binary: PathBuf,

    /// Arguments passed before the target path.
    pub binary_args: Vec<String>,

    /// Socket scan mode: instream (default) or fildes.
    pub socket_scan_mode: SocketScanMode,

    /// Socket read/write timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClamdConfig {
    fn default() -> Self {
        Self {
            local_socket: PathBuf::from(DEFAULT_CLAMD_SOCKET),
            local_binary: PathBuf::from(DEFAULT_CLAMD_BINARY),
            binary_args: vec!["--no-summary".to_string()],
            socket_scan_mode: SocketScanMode::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClamdConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Scan engine configuration.
///
/// Built once (usually from a JSON file) and handed to each orchestrator.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Transport used to reach the backend.
    pub transport: TransportMode,

    /// clamd connection settings.
    pub clamd: ClamdConfig,

    /// Fail-closed upload gating: treat an unreachable backend as infected.
    /// Consumed by callers, not by the scan path.
    pub deny_on_failure: bool,

    /// Files created before this instant are left out of the initial backlog.
    pub initial_scan_ignore_before: Option<DateTime<Utc>>,
}

impl ScanConfig {
    /// Check that the selected transport is fully configured.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self.transport {
            TransportMode::Socket if self.clamd.local_socket.as_os_str().is_empty() => {
                Err(ConfigurationError::SocketAddressRequired)
            }
            TransportMode::Binary if self.clamd.local_binary.as_os_str().is_empty() => {
                Err(ConfigurationError::ExecutablePathRequired)
            }
            _ => Ok(()),
        }
    }

    /// Log configuration info.
    pub fn log_config_info(&self) {
        match self.transport {
            TransportMode::Socket => info!(
                "Transport: socket {} ({:?})",
                self.clamd.local_socket.display(),
                self.clamd.socket_scan_mode
            ),
            TransportMode::Binary => {
                info!("Transport: binary {}", self.clamd.local_binary.display());
            }
        }
        if self.deny_on_failure {
            info!("Deny on failure enabled (unreachable backend treated as infected)");
        }
        if let Some(cutoff) = self.initial_scan_ignore_before {
            debug!("Initial scan ignores files created before {cutoff}");
        }
    }

    /// Load configuration from file.
    pub fn load_config(config_path: &Path) -> Result<Self> {
        let config_data = fs::read(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self =
            serde_json::from_slice(&config_data).context("Failed to parse config JSON")?;

        config.log_config_info();
        Ok(config)
    }
}

/// Verify configuration file without contacting the backend.
pub fn verify_config(config_path: &Path) -> Result<()> {
    let config = ScanConfig::load_config(config_path)?;
    config
        .validate()
        .with_context(|| format!("Invalid {} transport configuration", config.transport))?;
    eprintln!("Configuration valid ({} transport)", config.transport);
    Ok(())
}
