// SPDX-FileCopyrightText: 2025-2026 TII (SSRC) and the Ghaf contributors
// SPDX-License-Identifier: Apache-2.0

//! clamd socket transport.
//!
//! Uses the null-terminated command form (`zCOMMAND\0`). clamd closes the
//! connection after each reply, so every call opens a fresh stream.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use sendfd::SendWithFd;

use super::{Backend, ScanResponse, ERROR_SUFFIX};
use crate::config::{ClamdConfig, SocketScanMode, TransportMode};
use crate::error::TransportError;

/// INSTREAM chunk size (well below clamd `StreamMaxLength`)
const INSTREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Buffer size for reading replies
const REPLY_BUFFER_SIZE: usize = 4096;

/// Replies longer than this are truncated
const MAX_REPLY_LEN: usize = 64 * 1024;

/// `ClamAV` daemon reached through its Unix socket.
#[derive(Debug, Clone)]
pub struct ClamdSocket {
    path: PathBuf,
    timeout: Duration,
    mode: SocketScanMode,
}

impl ClamdSocket {
    #[must_use]
    pub const fn new(path: PathBuf, timeout: Duration, mode: SocketScanMode) -> Self {
        Self {
            path,
            timeout,
            mode,
        }
    }

    #[must_use]
    pub fn from_config(config: &ClamdConfig) -> Self {
        Self::new(
            config.local_socket.clone(),
            config.timeout(),
            config.socket_scan_mode,
        )
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<UnixStream, TransportError> {
        let stream = UnixStream::connect(&self.path).map_err(|source| TransportError::Connect {
            path: self.path.clone(),
            source,
        })?;
        // Zero disables the timeout
        let timeout = Some(self.timeout).filter(|t| !t.is_zero());
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        Ok(stream)
    }

    fn command(&self, command: &[u8]) -> Result<String, TransportError> {
        let mut stream = self.connect()?;
        stream.write_all(command)?;
        Ok(read_reply(&mut stream)?)
    }

    fn send_stream_for_scan(&self, file: &mut File) -> Result<String, TransportError> {
        let mut stream = self.connect()?;
        stream.write_all(b"zINSTREAM\0")?;

        // Chunks: size (big-endian u32) + data
        let mut buf = vec![0u8; INSTREAM_CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let len = u32::try_from(n).unwrap_or(u32::MAX);
            stream.write_all(&len.to_be_bytes())?;
            stream.write_all(&buf[..n])?;
            total += n as u64;
        }

        // End marker (4 zero bytes)
        stream.write_all(&[0, 0, 0, 0])?;
        debug!("INSTREAM sent {total} bytes");

        Ok(read_reply(&mut stream)?)
    }

    fn send_fd_for_scan(&self, file: &File) -> Result<String, TransportError> {
        let mut stream = self.connect()?;
        stream.write_all(b"zFILDES\0")?;
        stream.send_with_fd(&[0], &[file.as_raw_fd()])?;
        Ok(read_reply(&mut stream)?)
    }
}

/// Read a reply until the null terminator or end of stream.
fn read_reply(stream: &mut impl Read) -> std::io::Result<String> {
    let mut reply = Vec::new();
    let mut buf = [0u8; REPLY_BUFFER_SIZE];

    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        reply.extend_from_slice(&buf[..n]);
        if buf[..n].contains(&b'\0') || reply.len() >= MAX_REPLY_LEN {
            break;
        }
    }

    let end = reply.iter().position(|&b| b == b'\0').unwrap_or(reply.len());
    Ok(String::from_utf8_lossy(&reply[..end]).trim().to_string())
}

impl Backend for ClamdSocket {
    fn transport(&self) -> TransportMode {
        TransportMode::Socket
    }

    fn ping(&self) -> Result<(), TransportError> {
        let reply = self.command(b"zPING\0")?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(TransportError::Protocol(format!("ping returned {reply:?}")))
        }
    }

    fn version(&self) -> Result<String, TransportError> {
        let reply = self.command(b"zVERSION\0")?;
        if reply.is_empty() {
            return Err(TransportError::Protocol("empty version reply".to_string()));
        }
        Ok(reply)
    }

    fn scan(&self, path: &Path) -> Result<ScanResponse, TransportError> {
        debug!("clamd scanning {} ({:?})", path.display(), self.mode);

        let mut file = File::open(path).map_err(|source| TransportError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let reply = match self.mode {
            SocketScanMode::Instream => self.send_stream_for_scan(&mut file)?,
            SocketScanMode::Fildes => self.send_fd_for_scan(&file)?,
        };

        if reply.ends_with(ERROR_SUFFIX) {
            return Err(TransportError::Daemon(reply));
        }
        Ok(ScanResponse::from_reply(&reply))
    }
}
