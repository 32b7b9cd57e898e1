//! Host-side harness with console trace capture.
//!
//! Wraps a [`HostConsole`] and records every line crossing it, so a failed
//! integration run can dump the whole conversation for analysis.

use crate::console::HostConsole;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum TraceDirection {
    HostToDevice,
    DeviceToHost,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TraceEntry {
    pub seq: u64,
    pub direction: TraceDirection,
    pub line: String,
}

/// A traced console driver for integration tests.
pub struct Harness {
    console: HostConsole,
    trace: Vec<TraceEntry>,
    seq: u64,
}

impl Harness {
    pub fn new(console: HostConsole) -> Self {
        Self {
            console,
            trace: Vec::new(),
            seq: 0,
        }
    }

    fn record(&mut self, direction: TraceDirection, line: &str) {
        self.trace.push(TraceEntry {
            seq: self.seq,
            direction,
            line: line.to_string(),
        });
        self.seq += 1;
    }

    /// Sends a command line.
    pub fn send(&mut self, line: &str) {
        self.record(TraceDirection::HostToDevice, line);
        self.console.send_line(line);
    }

    /// Sends raw bytes (not traced line-by-line).
    pub fn send_bytes(&mut self, bytes: &[u8]) {
        self.record(
            TraceDirection::HostToDevice,
            &format!("<{} raw bytes>", bytes.len()),
        );
        self.console.send_bytes(bytes);
    }

    /// Receives the next output line.
    pub fn recv(&mut self, timeout: Duration) -> Option<String> {
        let line = self.console.recv_line(timeout)?;
        self.record(TraceDirection::DeviceToHost, &line);
        Some(line)
    }

    /// Receives lines until one contains `needle`, recording everything.
    pub fn recv_containing(&mut self, needle: &str, timeout: Duration) -> Option<String> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(std::time::Instant::now())?;
            let line = self.recv(remaining)?;
            if line.contains(needle) {
                return Some(line);
            }
        }
    }

    /// Like [`recv_containing`](Self::recv_containing) but panics with the
    /// full trace on timeout, which is what integration tests want.
    pub fn expect_containing(&mut self, needle: &str, timeout: Duration) -> String {
        match self.recv_containing(needle, timeout) {
            Some(line) => line,
            None => panic!(
                "timed out waiting for a line containing {needle:?}; trace:\n{}",
                self.dump_trace()
            ),
        }
    }

    /// The recorded conversation as pretty JSON.
    pub fn dump_trace(&self) -> String {
        serde_json::to_string_pretty(&self.trace).unwrap_or_default()
    }

    /// All recorded entries.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }
}
