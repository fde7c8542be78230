// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Scan records.
//!
//! One record is produced per scan attempt and never updated by a later
//! scan. The only mutation is the operator disposition ([`ScanAction`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendOutcome, ScanResponse, CLEAN_STATUS};
use crate::catalog::FileId;
use crate::error::DispositionError;

/// Operator disposition of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    #[default]
    None,
    /// Operator accepted the file despite the outcome.
    Ignored,
    /// Operator deleted the infected file.
    Removed,
}

impl std::fmt::Display for ScanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Ignored => write!(f, "ignored"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Scan outcome as shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Clean,
    Infected,
    /// Backend was unreachable; the file still needs a scan.
    Unscanned,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Infected => write!(f, "infected"),
            Self::Unscanned => write!(f, "unscanned"),
        }
    }
}

/// Outcome of one scan attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Path that was scanned.
    pub filename: String,
    /// Client address, or loopback outside a request.
    pub source_address: String,
    is_scanned: bool,
    is_infected: bool,
    raw_result: BackendOutcome<ScanResponse>,
    #[serde(default)]
    action: ScanAction,
    /// Owning file, if the scan was for a catalog entry.
    pub file_ref: Option<FileId>,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Record for a structured backend reply. The reply must carry a status.
    #[must_use]
    pub fn scanned(filename: String, source_address: String, response: ScanResponse) -> Self {
        let is_infected = response.status.as_deref() != Some(CLEAN_STATUS);
        Self {
            filename,
            source_address,
            is_scanned: true,
            is_infected,
            raw_result: BackendOutcome::Reached(response),
            action: ScanAction::None,
            file_ref: None,
            created_at: Utc::now(),
        }
    }

    /// Record for an attempt that got no reply from the backend.
    #[must_use]
    pub fn unreachable(filename: String, source_address: String) -> Self {
        Self {
            filename,
            source_address,
            is_scanned: false,
            is_infected: false,
            raw_result: BackendOutcome::Unreachable,
            action: ScanAction::None,
            file_ref: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn is_scanned(&self) -> bool {
        self.is_scanned
    }

    /// Infection flag; `None` when the file was not scanned.
    #[must_use]
    pub const fn is_infected(&self) -> Option<bool> {
        if self.is_scanned {
            Some(self.is_infected)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn raw_result(&self) -> &BackendOutcome<ScanResponse> {
        &self.raw_result
    }

    #[must_use]
    pub const fn action(&self) -> ScanAction {
        self.action
    }

    #[must_use]
    pub const fn state(&self) -> ScanState {
        match self.is_infected() {
            Some(true) => ScanState::Infected,
            Some(false) => ScanState::Clean,
            None => ScanState::Unscanned,
        }
    }

    /// Detected signature, if infected.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.raw_result.reached()?.signature()
    }

    /// Whether an upload gate must reject the file.
    ///
    /// Infected files are always denied; unscanned ones only when failing closed.
    #[must_use]
    pub const fn should_deny(&self, deny_on_failure: bool) -> bool {
        match self.state() {
            ScanState::Infected => true,
            ScanState::Unscanned => deny_on_failure,
            ScanState::Clean => false,
        }
    }

    /// Operator accepts an infected or unscanned file.
    pub fn ignore(&mut self) -> Result<(), DispositionError> {
        self.disposition(ScanAction::Ignored, |state| {
            matches!(state, ScanState::Infected | ScanState::Unscanned)
        })
    }

    /// Operator removed the infected file.
    pub fn mark_removed(&mut self) -> Result<(), DispositionError> {
        self.disposition(ScanAction::Removed, |state| state == ScanState::Infected)
    }

    fn disposition(
        &mut self,
        action: ScanAction,
        applicable: impl Fn(ScanState) -> bool,
    ) -> Result<(), DispositionError> {
        if self.action != ScanAction::None {
            return Err(DispositionError::AlreadyDispositioned(self.action));
        }
        let state = self.state();
        if !applicable(state) {
            return Err(DispositionError::NotApplicable { state, action });
        }
        self.action = action;
        Ok(())
    }
}
