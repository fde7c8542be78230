// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// Identifier of a stored file in the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A stored file known to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: FileId,
    /// Local path of the file contents.
    pub filename: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Folders are listed in the catalog but never scanned.
    #[serde(default)]
    pub is_folder: bool,
}

/// Load a file catalog (JSON array of entries).
pub fn load_catalog(path: &Path) -> Result<Vec<FileEntry>> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    let entries: Vec<FileEntry> =
        serde_json::from_slice(&data).context("Failed to parse catalog JSON")?;
    info!("Loaded catalog with {} entries", entries.len());
    Ok(entries)
}
