//! Structured console I/O.
//!
//! All host-visible output goes through [`Comm`], which prefixes every line
//! according to the current machine mode and serialises concurrent writers.
//! The reader side assembles command lines byte by byte, processes the
//! cancel token `!` out of band, and feeds accepted commands into a
//! single-slot queue consumed by the main loop.

use crate::system::SystemState;
use crossbeam_channel::Sender;
use edm_proto::line::{LineAssembler, LineEvent};
use edm_proto::mode::{ACK_LINE, BLOB_PREFIX};
use edm_proto::{adler32, encode_into, Mode};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Transmit buffer size; a single line is silently truncated beyond this.
pub const TX_BUFFER_SIZE: usize = 256;

/// Serialised, mode-prefixed console writer.
pub struct Comm {
    system: Arc<SystemState>,
    tx: Mutex<Box<dyn Write + Send>>,
}

impl Comm {
    pub fn new(system: Arc<SystemState>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            system,
            tx: Mutex::new(writer),
        }
    }

    fn emit_line(&self, prefix: &str, msg: &str) {
        let mut line = String::with_capacity(prefix.len() + msg.len());
        line.push_str(prefix);
        line.push_str(msg);

        // Silently truncate over-long lines, respecting char boundaries.
        let mut cut = line.len().min(TX_BUFFER_SIZE);
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }

        let mut w = self.tx.lock();
        let _ = w.write_all(line[..cut].as_bytes());
        let _ = w.write_all(b"\n");
        let _ = w.flush();
    }

    /// Generic informational print.
    pub fn print(&self, msg: &str) {
        self.emit_line(self.system.mode().print_prefix(), msg);
    }

    /// Secondary informational print.
    pub fn print_info(&self, msg: &str) {
        self.emit_line(self.system.mode().info_prefix(), msg);
    }

    /// Error print.
    pub fn print_err(&self, msg: &str) {
        self.emit_line(self.system.mode().err_prefix(), msg);
    }

    /// Command-accepted acknowledgement.
    pub fn print_ack(&self) {
        let mut w = self.tx.lock();
        let _ = w.write_all(ACK_LINE.as_bytes());
        let _ = w.write_all(b"\n");
        let _ = w.flush();
    }

    /// Prints binary data as one `>blob <base64url> <adler32-hex8>` line.
    pub fn print_blob(&self, payload: &[u8]) {
        let mut line = String::with_capacity(
            BLOB_PREFIX.len() + edm_proto::base64::encoded_len(payload.len()) + 10,
        );
        line.push_str(BLOB_PREFIX);
        encode_into(payload, |b| line.push(b as char));
        line.push(' ');
        line.push_str(&format!("{:08x}", adler32(payload)));

        let mut w = self.tx.lock();
        let _ = w.write_all(line.as_bytes());
        let _ = w.write_all(b"\n");
        let _ = w.flush();
    }
}

/// Spawns the high-priority reader: byte-level line assembly, out-of-band
/// cancel, non-IDLE drop, single-slot enqueue. Exits on console EOF.
pub fn spawn_reader(
    system: Arc<SystemState>,
    mut input: Box<dyn Read + Send>,
    commands: Sender<String>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console-rx".into())
        .spawn(move || {
            let mut assembler = LineAssembler::new();
            let mut buf = [0u8; 64];
            loop {
                let n = match input.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                for &byte in &buf[..n] {
                    match assembler.feed(byte) {
                        None => {}
                        Some(LineEvent::Overflow) => {
                            warn!("console line exceeded {} bytes, dropped", edm_proto::MAX_LINE);
                        }
                        Some(LineEvent::Line(line)) => {
                            let trimmed = line.trim_start();
                            if trimmed.is_empty() {
                                continue;
                            }
                            // The cancel token is processed immediately and
                            // never enqueued.
                            if trimmed == "!" {
                                system.request_cancel();
                                continue;
                            }
                            if system.mode() != Mode::Idle {
                                debug!(command = trimmed, "dropped command while busy");
                                continue;
                            }
                            if commands.send(trimmed.to_string()).is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).to_string()
        }
    }

    fn comm_pair() -> (Arc<SystemState>, Arc<Comm>, SharedBuf) {
        let system = Arc::new(SystemState::new());
        let buf = SharedBuf::default();
        let comm = Arc::new(Comm::new(system.clone(), Box::new(buf.clone())));
        (system, comm, buf)
    }

    #[test]
    fn prefixes_follow_mode() {
        let (system, comm, buf) = comm_pair();
        comm.print("boot");
        system.set_mode(Mode::ExecInteractive);
        comm.print("working");
        comm.print_info("detail");
        comm.print_err("oops");
        comm.print_ack();
        assert_eq!(buf.contents(), "I boot\n> working\n>inf detail\n>err oops\n>ack\n");
    }

    #[test]
    fn long_line_truncated_to_buffer_size() {
        let (_system, comm, buf) = comm_pair();
        let msg = "x".repeat(400);
        comm.print(&msg);
        let line = buf.contents();
        assert_eq!(line.len(), TX_BUFFER_SIZE + 1, "256 bytes plus newline");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn blob_line_reference() {
        let (_system, comm, buf) = comm_pair();
        comm.print_blob(&[1, 2, 3, 4]);
        assert_eq!(buf.contents(), ">blob AQIDBA 0018000b\n");
    }

    #[test]
    fn reader_routes_cancel_and_commands() {
        let system = Arc::new(SystemState::new());
        let (tx, rx) = bounded(1);
        let input: &[u8] = b"  G0 X1\n!\nhelp\n";
        let _reader = spawn_reader(system.clone(), Box::new(input), tx).unwrap();

        // Leading whitespace trimmed; '!' set the flag without enqueueing.
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "G0 X1");
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), "help");
        assert!(system.cancel_requested());
    }

    #[test]
    fn reader_drops_commands_while_busy() {
        let system = Arc::new(SystemState::new());
        system.set_mode(Mode::ExecInteractive);
        let (tx, rx) = bounded(1);
        let input: &[u8] = b"stat motor\n";
        let reader = spawn_reader(system.clone(), Box::new(input), tx).unwrap();
        reader.join().unwrap();
        assert!(rx.try_recv().is_err());
    }
}
