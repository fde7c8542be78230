// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Scan backlogs: files that still need a scan.
//!
//! Both queries are pure selections over catalog and history; they keep no
//! state and never contact the backend. Results follow catalog order.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::catalog::{FileEntry, FileId};
use crate::record::{ScanAction, ScanRecord};

/// Files that have never been scanned.
///
/// Excludes folders, files referenced by any existing record, and files
/// created before `cutoff` (so a first deployment does not queue the whole
/// history).
pub fn initial_backlog<'a>(
    files: &'a [FileEntry],
    existing_record_file_ids: impl IntoIterator<Item = FileId>,
    cutoff: Option<DateTime<Utc>>,
) -> Vec<&'a FileEntry> {
    let scanned: HashSet<FileId> = existing_record_file_ids.into_iter().collect();

    files
        .iter()
        .filter(|file| !file.is_folder)
        .filter(|file| !scanned.contains(&file.id))
        .filter(|file| cutoff.is_none_or(|cutoff| file.created_at >= cutoff))
        .collect()
}

/// Files whose latest scan attempt could not reach the backend and that no
/// operator has dispositioned yet.
pub fn retry_backlog<'a>(files: &'a [FileEntry], records: &[ScanRecord]) -> Vec<&'a FileEntry> {
    let latest = latest_records(records);

    files
        .iter()
        .filter(|file| !file.is_folder)
        .filter(|file| {
            latest.get(&file.id).is_some_and(|record| {
                !record.is_scanned() && record.action() == ScanAction::None
            })
        })
        .collect()
}

/// Latest record per file. Later records win ties on `created_at`.
fn latest_records(records: &[ScanRecord]) -> HashMap<FileId, &ScanRecord> {
    let mut latest: HashMap<FileId, &ScanRecord> = HashMap::new();

    for record in records {
        let Some(file_id) = record.file_ref else {
            continue;
        };
        latest
            .entry(file_id)
            .and_modify(|current| {
                if record.created_at >= current.created_at {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    latest
}

/// File ids referenced by records.
pub fn referenced_file_ids(records: &[ScanRecord]) -> impl Iterator<Item = FileId> + '_ {
    records.iter().filter_map(|record| record.file_ref)
}
