use std::fmt;
use thiserror::Error;

/// Errors from constructing or closing a batching buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// A batching buffer cannot be unbuffered: with nothing to
    /// accumulate there is nothing to batch.
    #[error("invalid capacity: batching buffer does not support unbuffered behaviour")]
    InvalidCapacity,

    /// The write endpoint was already closed by an earlier `close()` call.
    #[error("write endpoint closed more than once")]
    DoubleClose,
}

/// Error returned by [`BatchingBuffer::submit`](crate::BatchingBuffer::submit)
/// when the write endpoint is closed. Carries the rejected value back to the
/// caller; it was never appended to the buffer.
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot submit: write endpoint is closed")]
pub struct SubmitError<T>(pub T);

impl<T> SubmitError<T> {
    /// Recover the value that was rejected.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SubmitError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubmitError(..)")
    }
}
