// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use clamav_scan::backend::BackendOutcome;
use clamav_scan::backlog::{initial_backlog, referenced_file_ids, retry_backlog};
use clamav_scan::catalog::load_catalog;
use clamav_scan::config::{verify_config, ScanConfig};
use clamav_scan::history::HistoryLog;
use clamav_scan::orchestrator::ScanOrchestrator;
use clamav_scan::record::{ScanRecord, ScanState};
use clamav_scan::util::init_logger;

#[derive(Parser)]
#[command(name = "clamav-scan")]
#[command(about = "Scan files with ClamAV and track scan records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Verify configuration file without contacting ClamAV
    Verify {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Check whether ClamAV answers
    Ping {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        debug: bool,
    },
    /// Print the ClamAV version
    Version {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        debug: bool,
    },
    /// Scan files
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        debug: bool,
        /// Append records to this history file
        #[arg(long)]
        history: Option<PathBuf>,
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List (and optionally scan) files still waiting for a scan
    Backlog {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        debug: bool,
        /// JSON array of catalog entries
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        history: PathBuf,
        /// List files whose last scan could not reach ClamAV
        #[arg(long)]
        retry: bool,
        /// Scan listed files and append the records
        #[arg(long)]
        scan: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { config } => {
            verify_config(&config).with_context(|| {
                format!("Failed to verify configuration file {}", config.display())
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ping { config, debug } => {
            init_logger(debug)?;
            let mut orchestrator = ScanOrchestrator::new(load(&config)?);

            if orchestrator.is_offline()? {
                println!("offline");
                return Ok(ExitCode::FAILURE);
            }
            println!("PONG");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version { config, debug } => {
            init_logger(debug)?;
            let mut orchestrator = ScanOrchestrator::new(load(&config)?);

            match orchestrator.version()? {
                BackendOutcome::Reached(version) => {
                    println!("{version}");
                    Ok(ExitCode::SUCCESS)
                }
                BackendOutcome::Unreachable => {
                    println!("unreachable");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Scan {
            config,
            debug,
            history,
            json,
            paths,
        } => {
            init_logger(debug)?;
            let config = load(&config)?;
            let deny_on_failure = config.deny_on_failure;
            let history = history.map(HistoryLog::new);
            let mut orchestrator = ScanOrchestrator::new(config);

            let mut denied = false;
            for path in &paths {
                let record = orchestrator
                    .scan_file(path)
                    .with_context(|| format!("Failed to scan {}", path.display()))?;
                report(&record, json)?;
                if let Some(history) = &history {
                    history.append(&record)?;
                }
                denied |= record.should_deny(deny_on_failure);
            }

            Ok(exit_code(denied))
        }
        Commands::Backlog {
            config,
            debug,
            catalog,
            history,
            retry,
            scan,
        } => {
            init_logger(debug)?;
            let config = load(&config)?;
            let files = load_catalog(&catalog)?;
            let history = HistoryLog::new(history);
            let records = history.load()?;

            let backlog = if retry {
                retry_backlog(&files, &records)
            } else {
                initial_backlog(
                    &files,
                    referenced_file_ids(&records),
                    config.initial_scan_ignore_before,
                )
            };
            log::info!("{} file(s) in {} backlog", backlog.len(), backlog_name(retry));

            if !scan {
                for file in &backlog {
                    println!("{} {}", file.id, file.filename.display());
                }
                return Ok(ExitCode::SUCCESS);
            }

            let deny_on_failure = config.deny_on_failure;
            let mut orchestrator = ScanOrchestrator::new(config);
            if orchestrator.is_offline()? {
                log::warn!("ClamAV offline, backlog left for a later run");
                return Ok(ExitCode::FAILURE);
            }

            let mut denied = false;
            for file in backlog {
                let Some(record) = orchestrator
                    .scan_file_entry(file)
                    .with_context(|| format!("Failed to scan file {}", file.id))?
                else {
                    continue;
                };
                report(&record, false)?;
                history.append(&record)?;
                denied |= record.should_deny(deny_on_failure);
            }

            Ok(exit_code(denied))
        }
    }
}

fn load(config_path: &Path) -> Result<ScanConfig> {
    ScanConfig::load_config(config_path).with_context(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })
}

fn report(record: &ScanRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }
    match (record.state(), record.signature()) {
        (ScanState::Infected, Some(signature)) => {
            println!("{}: {} {signature}", record.filename, record.state());
        }
        (state, _) => println!("{}: {state}", record.filename),
    }
    Ok(())
}

const fn backlog_name(retry: bool) -> &'static str {
    if retry {
        "retry"
    } else {
        "initial"
    }
}

const fn exit_code(denied: bool) -> ExitCode {
    if denied {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
