//! Errors raised outside the hot emulation loop (construction, loading).
//!
//! Execution itself never returns this type: a running `Machine` reports
//! why it stopped via [`crate::enums::StopReason`], the way the teacher's
//! processor keeps running and hands back an `ExitCode` rather than
//! propagating a `Result` out of every instruction.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("image too large for a 64K address space: {0} bytes")]
    ImageTooLarge(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
