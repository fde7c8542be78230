// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;

// =============================================================================
// Logger
// =============================================================================

/// Syslog identifier for journal entries.
pub const SYSLOG_IDENTIFIER: &str = "clamav-scan";

/// Initialize the systemd journal logger.
///
/// # Errors
/// Returns an error if the journal logger fails to initialize.
pub fn init_logger(debug: bool) -> Result<()> {
    let log_level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    systemd_journal_logger::JournalLog::new()?
        .with_syslog_identifier(SYSLOG_IDENTIFIER.to_string())
        .install()?;
    log::set_max_level(log_level);
    Ok(())
}
