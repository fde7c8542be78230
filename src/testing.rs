// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! Test doubles: an in-process clamd and a scripted backend.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sendfd::RecvWithFd;
use tempfile::TempDir;

use crate::backend::binary::ClamdScan;
use crate::backend::{Backend, ScanResponse};
use crate::config::TransportMode;
use crate::error::TransportError;

/// Standard antivirus test file.
pub const EICAR: &str =
    r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

const EICAR_MARKER: &[u8] = b"EICAR-STANDARD-ANTIVIRUS-TEST-FILE";

const FAKE_VERSION: &str = "ClamAV 1.4.1/27422/Mon Oct 12 08:21:05 2026";

/// Text file busy (script still open for writing in a forked child)
const ETXTBSY: i32 = 26;

pub fn write_fixture(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Write an executable shell script standing in for `clamdscan`.
pub fn fake_binary(dir: &Path, body: &str) -> ClamdScan {
    let path = dir.join("clamdscan");
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    // Parallel tests fork while the script may still be open for writing
    for _ in 0..100 {
        match Command::new(&path).arg("--version").output() {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                thread::sleep(Duration::from_millis(10));
            }
            _ => break,
        }
    }

    ClamdScan::new(path, Vec::new())
}

// =============================================================================
// Fake clamd
// =============================================================================

/// clamd stand-in answering PING, VERSION, INSTREAM and FILDES on a Unix socket.
pub struct FakeClamd {
    _dir: TempDir,
    socket_path: PathBuf,
}

impl FakeClamd {
    pub fn start() -> Self {
        Self::spawn(None)
    }

    /// Answer every INSTREAM with a fixed reply.
    pub fn with_scan_reply(reply: &'static str) -> Self {
        Self::spawn(Some(reply))
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn spawn(scan_reply: Option<&'static str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("clamd.ctl");
        let listener = UnixListener::bind(&socket_path).unwrap();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let _ = handle_connection(stream, scan_reply);
            }
        });

        Self {
            _dir: dir,
            socket_path,
        }
    }
}

fn read_command(stream: &mut UnixStream) -> io::Result<Vec<u8>> {
    let mut command = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte)?;
        if byte[0] == b'\0' {
            return Ok(command);
        }
        command.push(byte[0]);
    }
}

fn read_chunks(stream: &mut UnixStream) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len)?;
        let len = u32::from_be_bytes(len) as usize;
        if len == 0 {
            return Ok(data);
        }
        let start = data.len();
        data.resize(start + len, 0);
        stream.read_exact(&mut data[start..])?;
    }
}

/// Receive the descriptor sent after `zFILDES` and read the file behind it.
fn read_passed_file(stream: &UnixStream) -> io::Result<(RawFd, Vec<u8>)> {
    let mut byte = [0u8; 1];
    let mut fds: [RawFd; 1] = [-1];
    let (_, received) = stream.recv_with_fd(&mut byte, &mut fds)?;
    if received != 1 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "no descriptor"));
    }

    // SAFETY: the descriptor was just received and is owned by nobody else
    let mut file = unsafe { File::from_raw_fd(fds[0]) };
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok((fds[0], data))
}

fn verdict(name: &str, data: &[u8], scan_reply: Option<&'static str>) -> String {
    scan_reply.map_or_else(
        || {
            if data.windows(EICAR_MARKER.len()).any(|w| w == EICAR_MARKER) {
                format!("{name}: Eicar-Test-Signature FOUND")
            } else {
                format!("{name}: OK")
            }
        },
        ToString::to_string,
    )
}

fn handle_connection(mut stream: UnixStream, scan_reply: Option<&'static str>) -> io::Result<()> {
    let command = read_command(&mut stream)?;
    let reply = match command.as_slice() {
        b"zPING" => "PONG".to_string(),
        b"zVERSION" => FAKE_VERSION.to_string(),
        b"zINSTREAM" => verdict("stream", &read_chunks(&mut stream)?, scan_reply),
        b"zFILDES" => {
            let (fd, data) = read_passed_file(&stream)?;
            verdict(&format!("fd[{fd}]"), &data, scan_reply)
        }
        _ => "UNKNOWN COMMAND".to_string(),
    };
    stream.write_all(reply.as_bytes())?;
    stream.write_all(b"\0")
}

// =============================================================================
// Scripted backend
// =============================================================================

/// What a [`FakeBackend`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Clean,
    Infected,
    /// Refuse every call as if clamd were down.
    Down,
    /// Reply without a status field.
    MissingStatus,
}

/// Shared call counters for a [`FakeBackend`].
#[derive(Debug, Clone, Default)]
pub struct Contacts {
    pings: Arc<AtomicUsize>,
    versions: Arc<AtomicUsize>,
    scans: Arc<AtomicUsize>,
}

impl Contacts {
    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn versions(&self) -> usize {
        self.versions.load(Ordering::SeqCst)
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.pings() + self.versions() + self.scans()
    }
}

pub struct FakeBackend {
    behaviour: Behaviour,
    contacts: Contacts,
}

impl FakeBackend {
    pub fn new(behaviour: Behaviour) -> (Self, Contacts) {
        let contacts = Contacts::default();
        (
            Self {
                behaviour,
                contacts: contacts.clone(),
            },
            contacts,
        )
    }

    fn refused() -> TransportError {
        TransportError::Connect {
            path: PathBuf::from("/run/clamav/clamd.ctl"),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }
    }
}

impl Backend for FakeBackend {
    fn transport(&self) -> TransportMode {
        TransportMode::Socket
    }

    fn ping(&self) -> Result<(), TransportError> {
        self.contacts.pings.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Down => Err(Self::refused()),
            _ => Ok(()),
        }
    }

    fn version(&self) -> Result<String, TransportError> {
        self.contacts.versions.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Down => Err(Self::refused()),
            _ => Ok(FAKE_VERSION.to_string()),
        }
    }

    fn scan(&self, path: &Path) -> Result<ScanResponse, TransportError> {
        self.contacts.scans.fetch_add(1, Ordering::SeqCst);
        let name = path.display();
        match self.behaviour {
            Behaviour::Clean => Ok(ScanResponse::from_reply(&format!("{name}: OK"))),
            Behaviour::Infected => Ok(ScanResponse::from_reply(&format!(
                "{name}: Eicar-Test-Signature FOUND"
            ))),
            Behaviour::Down => Err(Self::refused()),
            Behaviour::MissingStatus => Ok(ScanResponse::from_reply(&format!("{name}:"))),
        }
    }
}
