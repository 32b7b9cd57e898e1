#![deny(clippy::all)]
#![deny(warnings)]
#![cfg_attr(not(feature = "std"), no_std)]

//! # EDM Host Protocol
//!
//! Primitives for the controller's line-oriented console protocol:
//!
//! - **[`mode`]**: machine-state line prefixes (`I `, `> `, `>err `, ...).
//! - **[`line`]**: the byte-level command-line assembler (printable
//!   accumulation, backspace, CR/LF termination, 255-byte cap).
//! - **[`checksum`]**: a `const fn` Adler-32 used to seal binary blobs.
//! - **[`base64`]**: unpadded URL-safe base64 for blob payloads.
//!
//! Every output line of the firmware is built from these pieces; the host
//! parses the prefix to route the rest of the line. Blob lines carry binary
//! payloads as `>blob <base64url> <adler32-hex8>`.

pub mod base64;
pub mod checksum;
pub mod line;
pub mod mode;

pub use base64::encode_into;
pub use checksum::adler32;
pub use line::{LineAssembler, LineEvent, MAX_LINE};
pub use mode::Mode;
