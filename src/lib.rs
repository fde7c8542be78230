// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Virus scan orchestration for stored application files.
//!
//! This library mediates between a file catalog and a `ClamAV` backend:
//! - clamd over its local Unix socket (INSTREAM or FILDES)
//! - the `clamdscan` executable
//!
//! Every scan attempt yields a [`record::ScanRecord`]. A backend that cannot
//! be reached produces an explicit unreachable outcome instead of an error,
//! so upload gating can fail open or closed deterministically.
//!
//! # Modules
//!
//! - [`orchestrator`] - Scan/ping/version facade with error capture
//! - [`connection`] - Per-instance backend handle selection
//! - [`backend`] - Socket and binary transports
//! - [`backlog`] - Initial and retry scan queues

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

pub mod backend;
pub mod backlog;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod record;
pub mod util;

#[cfg(test)]
mod testing;
