// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Scan orchestration.
//!
//! [`ScanOrchestrator`] validates configuration, obtains the backend handle
//! and maps every exchange into a typed outcome:
//! - configuration problems and malformed replies are returned as errors
//! - transport failures become [`BackendOutcome::Unreachable`], are logged,
//!   and remain available through [`ScanOrchestrator::last_error`]
//!
//! An orchestrator is meant to be short-lived (one per request or job). It
//! caches its backend handle and its offline flag for its whole lifetime.

use std::path::Path;

use log::{debug, info, warn};

use crate::backend::{Backend, BackendOutcome, ScanResponse};
use crate::catalog::FileEntry;
use crate::config::ScanConfig;
use crate::connection::ConnectionProvider;
use crate::error::{ConfigurationError, ScanError, TransportError};
use crate::record::ScanRecord;

/// Source address used outside of a request.
pub const LOOPBACK_ADDRESS: &str = "127.0.0.1";

/// Fetches file contents that are not present locally (e.g. from a CDN).
pub trait FileResolver {
    /// Materialize the file at its local path.
    fn fetch(&self, file: &FileEntry) -> anyhow::Result<()>;

    /// Remove a local copy created by [`FileResolver::fetch`].
    fn cleanup(&self, file: &FileEntry) -> anyhow::Result<()>;
}

/// The request on whose behalf a scan runs.
pub trait RequestContext {
    /// Network address of the current caller, if known.
    fn client_address(&self) -> Option<String>;
}

pub struct ScanOrchestrator {
    config: ScanConfig,
    connection: ConnectionProvider,
    last_error: Option<TransportError>,
    offline: Option<bool>,
    request_context: Option<Box<dyn RequestContext>>,
    file_resolver: Option<Box<dyn FileResolver>>,
}

impl ScanOrchestrator {
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self::with_connection(config, ConnectionProvider::new())
    }

    /// Orchestrator using a preconfigured connection provider.
    #[must_use]
    pub fn with_connection(config: ScanConfig, connection: ConnectionProvider) -> Self {
        Self {
            config,
            connection,
            last_error: None,
            offline: None,
            request_context: None,
            file_resolver: None,
        }
    }

    #[must_use]
    pub fn with_request_context(mut self, context: Box<dyn RequestContext>) -> Self {
        self.request_context = Some(context);
        self
    }

    #[must_use]
    pub fn with_file_resolver(mut self, resolver: Box<dyn FileResolver>) -> Self {
        self.file_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Most recent transport failure.
    ///
    /// Cleared when [`Self::scan_file`] or [`Self::version`] starts.
    #[must_use]
    pub const fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    /// Scan a file and build its record.
    ///
    /// An unreachable backend is not an error: the record is marked unscanned.
    pub fn scan_file(&mut self, path: &Path) -> Result<ScanRecord, ScanError> {
        self.last_error = None;
        self.config.validate()?;

        let result = self.backend().scan(path);
        let filename = path.display().to_string();
        let source_address = self.source_address();

        match self.capture(result) {
            BackendOutcome::Reached(response) => {
                check_response(&response)?;
                let record = ScanRecord::scanned(filename, source_address, response);
                if let Some(signature) = record.signature() {
                    warn!("Virus in {}: {signature}", record.filename);
                } else {
                    debug!("Clean: {}", record.filename);
                }
                Ok(record)
            }
            BackendOutcome::Unreachable => Ok(ScanRecord::unreachable(filename, source_address)),
        }
    }

    /// Scan a catalog entry, fetching it first if it is not stored locally.
    ///
    /// Returns `None` when the file is missing and cannot be fetched.
    pub fn scan_file_entry(&mut self, file: &FileEntry) -> Result<Option<ScanRecord>, ScanError> {
        let fetched = if file.filename.exists() {
            false
        } else {
            let Some(resolver) = &self.file_resolver else {
                debug!("File {} missing locally: {}", file.id, file.filename.display());
                return Ok(None);
            };
            if let Err(e) = resolver.fetch(file) {
                warn!("Failed to fetch file {}: {e:#}", file.id);
                return Ok(None);
            }
            info!("Fetched file {} for scanning", file.id);
            true
        };

        let result = self.scan_file(&file.filename);

        if fetched {
            if let Some(resolver) = &self.file_resolver {
                if let Err(e) = resolver.cleanup(file) {
                    warn!("Failed to clean up fetched file {}: {e:#}", file.id);
                }
            }
        }

        let mut record = result?;
        record.file_ref = Some(file.id);
        Ok(Some(record))
    }

    /// Check whether the backend answers.
    pub fn ping(&mut self) -> Result<bool, ConfigurationError> {
        self.config.validate()?;
        let result = self.backend().ping();
        Ok(!self.capture(result).is_unreachable())
    }

    /// Backend version string.
    pub fn version(&mut self) -> Result<BackendOutcome<String>, ConfigurationError> {
        self.last_error = None;
        self.config.validate()?;
        let result = self.backend().version();
        Ok(self.capture(result))
    }

    /// Whether the backend is offline, pinging at most once per instance.
    pub fn is_offline(&mut self) -> Result<bool, ConfigurationError> {
        if let Some(offline) = self.offline {
            return Ok(offline);
        }
        let offline = !self.ping()?;
        self.offline = Some(offline);
        Ok(offline)
    }

    fn backend(&mut self) -> &dyn Backend {
        self.connection.get(&self.config)
    }

    /// Fold a transport result into an outcome, keeping and logging the error.
    fn capture<T>(&mut self, result: Result<T, TransportError>) -> BackendOutcome<T> {
        match result {
            Ok(value) => BackendOutcome::Reached(value),
            Err(e) => {
                warn!("ClamAV unreachable: {e}");
                self.last_error = Some(e);
                BackendOutcome::Unreachable
            }
        }
    }

    fn source_address(&self) -> String {
        self.request_context.as_ref().map_or_else(
            || LOOPBACK_ADDRESS.to_string(),
            |context| context.client_address().unwrap_or_default(),
        )
    }
}

/// A reply must name the file and carry a status.
fn check_response(response: &ScanResponse) -> Result<(), ScanError> {
    let field = if response.status.is_none() {
        "status"
    } else if response.file.is_none() {
        "file"
    } else {
        return Ok(());
    };
    Err(ScanError::UnexpectedResponseFormat {
        field,
        reply: response.reply.clone(),
    })
}
