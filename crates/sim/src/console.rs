//! In-memory console transport.
//!
//! A byte pipe standing in for the console UART: the device side exposes
//! blocking `Read`/`Write`, the host side sends command lines and collects
//! output lines. Dropping the host closes the pipe, which the device sees
//! as EOF.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Creates a connected host/device console pair.
pub fn duplex() -> (HostConsole, DeviceConsole) {
    let (host_tx, device_rx) = unbounded::<u8>();
    let (device_tx, host_rx) = unbounded::<Vec<u8>>();
    (
        HostConsole {
            tx: host_tx,
            rx: host_rx,
            pending: String::new(),
        },
        DeviceConsole {
            rx: device_rx,
            tx: device_tx,
        },
    )
}

/// The firmware-facing end: blocking byte reads, chunked writes.
pub struct DeviceConsole {
    rx: Receiver<u8>,
    tx: Sender<Vec<u8>>,
}

impl DeviceConsole {
    /// Splits into independent read/write halves (the reader thread owns
    /// one, the comm writer the other).
    pub fn split(self) -> (DeviceReader, DeviceWriter) {
        (DeviceReader { rx: self.rx }, DeviceWriter { tx: self.tx })
    }
}

pub struct DeviceReader {
    rx: Receiver<u8>,
}

impl Read for DeviceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Block for the first byte; EOF when the host hung up.
        let first = match self.rx.recv() {
            Ok(byte) => byte,
            Err(_) => return Ok(0),
        };
        buf[0] = first;
        let mut n = 1;
        while n < buf.len() {
            match self.rx.try_recv() {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(n)
    }
}

pub struct DeviceWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for DeviceWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // A hung-up host just swallows output.
        let _ = self.tx.send(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// The test-facing end of the console.
pub struct HostConsole {
    tx: Sender<u8>,
    rx: Receiver<Vec<u8>>,
    pending: String,
}

impl HostConsole {
    /// Sends raw bytes to the device.
    pub fn send_bytes(&self, bytes: &[u8]) {
        for &b in bytes {
            if self.tx.send(b).is_err() {
                return;
            }
        }
    }

    /// Sends one command line (LF-terminated).
    pub fn send_line(&self, line: &str) {
        self.send_bytes(line.as_bytes());
        self.send_bytes(b"\n");
    }

    /// Receives the next output line, waiting up to `timeout`.
    pub fn recv_line(&mut self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(nl) = self.pending.find('\n') {
                let line = self.pending[..nl].to_string();
                self.pending.drain(..=nl);
                return Some(line);
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.rx.recv_timeout(remaining) {
                Ok(chunk) => self.pending.push_str(&String::from_utf8_lossy(&chunk)),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    /// Receives lines until one contains `needle`; returns it.
    pub fn recv_line_containing(&mut self, needle: &str, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let line = self.recv_line(remaining)?;
            if line.contains(needle) {
                return Some(line);
            }
        }
    }

    /// Drains every line already received without blocking.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv_line(Duration::from_millis(0)) {
            lines.push(line);
        }
        lines
    }
}
