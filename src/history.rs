// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only scan history, one JSON record per line.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::record::ScanRecord;

/// Scan history stored as JSON lines.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Existing lines are never rewritten.
    pub fn append(&self, record: &ScanRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize scan record")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write history: {}", self.path.display()))?;

        debug!("Recorded scan of {} in {}", record.filename, self.path.display());
        Ok(())
    }

    /// All records in file order. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<ScanRecord>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read history: {}", self.path.display()))
            }
        };

        data.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!(
                        "Malformed record at {}:{}",
                        self.path.display(),
                        index + 1
                    )
                })
            })
            .collect()
    }
}
