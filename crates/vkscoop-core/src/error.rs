//! Error types shared across the vkscoop crates.
//!
//! Only recoverable failures travel through [`ScoopError`]. Violations of
//! the capture contract (unsupported inputs, missing bound state) abort the
//! process with a diagnostic instead; a capture file built from undefined
//! state would be worse than no file.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoopError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shader disassembly failed: {0}")]
    Disassembly(String),

    #[error("buffer read-back failed: {0}")]
    Readback(String),

    #[error("driver call {call} failed: {code}")]
    Driver { call: &'static str, code: i32 },
}
