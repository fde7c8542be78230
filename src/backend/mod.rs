// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Backend transports for `ClamAV`.
//!
//! Two interchangeable transports implement [`Backend`]:
//! - [`socket::ClamdSocket`]: clamd over its Unix socket
//! - [`binary::ClamdScan`]: the `clamdscan` executable
//!
//! A transport either returns a structured [`ScanResponse`] or a
//! [`TransportError`]. Interpreting the response is left to the orchestrator.

pub mod binary;
pub mod socket;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::TransportMode;
use crate::error::TransportError;

/// Status token clamd uses for a clean file.
pub const CLEAN_STATUS: &str = "OK";

/// Status suffix clamd uses for a detection.
pub const FOUND_SUFFIX: &str = " FOUND";

/// Status suffix clamd uses for scan errors.
pub const ERROR_SUFFIX: &str = "ERROR";

/// Result of one backend exchange: either a reply was obtained or not.
///
/// `Unreachable` is a distinct tag; it never shares a shape with a reply.
/// A reached value is carried under `response`, whatever its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "response", rename_all = "lowercase")]
pub enum BackendOutcome<T> {
    Reached(T),
    Unreachable,
}

impl<T> BackendOutcome<T> {
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable)
    }

    #[must_use]
    pub const fn reached(&self) -> Option<&T> {
        match self {
            Self::Reached(value) => Some(value),
            Self::Unreachable => None,
        }
    }
}

impl<T> From<Result<T, TransportError>> for BackendOutcome<T> {
    fn from(result: Result<T, TransportError>) -> Self {
        result.map_or(Self::Unreachable, Self::Reached)
    }
}

/// A structured scan reply, `<file>: <status>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// Name the backend reports (path, `stream` or `fd[N]`).
    pub file: Option<String>,
    /// `OK` or `<signature> FOUND`.
    pub status: Option<String>,
    /// Reply line as received.
    pub reply: String,
}

impl ScanResponse {
    /// Parse a clamd reply line.
    ///
    /// Splits at the last `": "` since paths may contain the separator but
    /// signature names do not. Missing parts are left as `None`.
    #[must_use]
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim_matches('\0').trim();
        let (file, status) = match reply.rsplit_once(": ") {
            Some((file, status)) => (
                Some(file.to_string()).filter(|f| !f.is_empty()),
                Some(status.trim().to_string()).filter(|s| !s.is_empty()),
            ),
            None => (None, None),
        };

        Self {
            file,
            status,
            reply: reply.to_string(),
        }
    }

    /// Whether the backend flagged this reply as a scan error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.ends_with(ERROR_SUFFIX))
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.file.is_some() && self.status.is_some()
    }

    /// Signature name for an infected reply.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.status.as_deref()?.strip_suffix(FOUND_SUFFIX)
    }
}

/// Virus scanning backend interface.
///
/// Each call is one blocking request/response exchange. No retries.
pub trait Backend: Send {
    fn transport(&self) -> TransportMode;

    /// Succeeds only when the backend answered the ping.
    fn ping(&self) -> Result<(), TransportError>;

    fn version(&self) -> Result<String, TransportError>;

    /// Scan a file by path.
    fn scan(&self, path: &Path) -> Result<ScanResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_clean_reply() {
        let response = ScanResponse::from_reply("stream: OK\0");
        assert_eq!(response.file.as_deref(), Some("stream"));
        assert_eq!(response.status.as_deref(), Some("OK"));
        assert_eq!(response.reply, "stream: OK");
        assert!(response.is_complete());
        assert!(response.signature().is_none());
    }

    #[test]
    fn parse_found_reply() {
        let response =
            ScanResponse::from_reply("/srv/uploads/eicar.com: Win.Test.EICAR_HDB-1 FOUND\n");
        assert_eq!(response.file.as_deref(), Some("/srv/uploads/eicar.com"));
        assert_eq!(response.signature(), Some("Win.Test.EICAR_HDB-1"));
        assert!(!response.is_error());
    }

    #[test]
    fn parse_path_containing_separator() {
        let response = ScanResponse::from_reply("/srv/a: b.txt: OK");
        assert_eq!(response.file.as_deref(), Some("/srv/a: b.txt"));
        assert_eq!(response.status.as_deref(), Some("OK"));
    }

    #[test]
    fn parse_error_reply() {
        let response = ScanResponse::from_reply("/srv/x: lstat() failed: No such file. ERROR");
        assert!(response.is_error());
    }

    #[test]
    fn parse_reply_without_separator() {
        let response = ScanResponse::from_reply("garbage");
        assert!(response.file.is_none());
        assert!(response.status.is_none());
        assert!(!response.is_complete());
        assert_eq!(response.reply, "garbage");
    }

    #[test]
    fn parse_reply_with_empty_status() {
        let response = ScanResponse::from_reply("stream: ");
        assert!(response.status.is_none());
    }

    #[test]
    fn outcome_from_transport_result() {
        let ok: BackendOutcome<u8> = Ok(7).into();
        assert_eq!(ok.reached(), Some(&7));

        let err: BackendOutcome<u8> = Err(TransportError::Protocol("x".into())).into();
        assert!(err.is_unreachable());
    }

    #[test]
    fn unreachable_serializes_distinct_from_clean() {
        let unreachable: BackendOutcome<ScanResponse> = BackendOutcome::Unreachable;
        let clean = BackendOutcome::Reached(ScanResponse::from_reply("stream: OK"));

        let unreachable = serde_json::to_value(&unreachable).unwrap();
        let clean = serde_json::to_value(&clean).unwrap();

        assert_eq!(unreachable, serde_json::json!({ "outcome": "unreachable" }));
        assert_eq!(clean["outcome"], "reached");
        assert_eq!(clean["response"]["status"], "OK");
    }

    #[test]
    fn version_outcome_round_trip() {
        let version = BackendOutcome::Reached("ClamAV 1.4.1/27422".to_string());

        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, r#"{"outcome":"reached","response":"ClamAV 1.4.1/27422"}"#);

        let parsed: BackendOutcome<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, version);

        let unreachable: BackendOutcome<String> =
            serde_json::from_str(r#"{"outcome":"unreachable"}"#).unwrap();
        assert!(unreachable.is_unreachable());
    }
}
