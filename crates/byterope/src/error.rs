//! Error type shared by the rope operations.

use crate::encoding::Encoding;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RopeError {
    #[error("byte range {start}..{end} out of bounds for {len} bytes")]
    OutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("cannot combine ropes encoded as {left} and {right}")]
    EncodingMismatch { left: Encoding, right: Encoding },
    #[error("result length exceeds the maximum rope size")]
    SizeOverflow,
    #[error("operation requires a stable snapshot of natively backed bytes")]
    VolatileContent,
}

impl RopeError {
    pub(crate) fn out_of_bounds(start: usize, len_requested: usize, len: usize) -> Self {
        RopeError::OutOfBounds {
            start,
            end: start.saturating_add(len_requested),
            len,
        }
    }
}
