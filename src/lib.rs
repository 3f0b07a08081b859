mod batching;
mod capacity;
mod error;

pub use batching::BatchingBuffer;
pub use capacity::Capacity;
pub use error::{BufferError, SubmitError};
