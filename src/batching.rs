use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use crate::capacity::Capacity;
use crate::error::{BufferError, SubmitError};

/// A value on its way into the buffer, paired with the channel the
/// coordination loop answers on. `Err` hands the value back unappended.
struct Submission<T> {
    value: T,
    ack: oneshot::Sender<Result<(), T>>,
}

/// Concurrent batching buffer: values go in one at a time and come out
/// grouped into batches, where a batch is everything accumulated since
/// the previous read.
///
/// A dedicated coordination task is the only owner of the accumulation
/// buffer; writers, readers and length queries all talk to it over
/// channels, so no lock is ever taken. The handle is cheap to clone and
/// every clone drives the same buffer.
///
/// With `Capacity::Bounded(n)` the loop stops accepting writes once the
/// buffer holds `n` values and resumes after a reader drains the batch,
/// so no delivered batch ever exceeds `n`. Writers are delayed, never
/// rejected, while the endpoint is open.
pub struct BatchingBuffer<T> {
    submit_tx: mpsc::Sender<Submission<T>>,
    read_tx: mpsc::Sender<oneshot::Sender<Vec<T>>>,
    len_tx: mpsc::Sender<oneshot::Sender<usize>>,
    close_tx: mpsc::Sender<()>,
    capacity: Capacity,
    closed: Arc<AtomicBool>,
}

impl<T> Clone for BatchingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            submit_tx: self.submit_tx.clone(),
            read_tx: self.read_tx.clone(),
            len_tx: self.len_tx.clone(),
            close_tx: self.close_tx.clone(),
            capacity: self.capacity,
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T: Send + 'static> BatchingBuffer<T> {
    /// Create a batching buffer and spawn its coordination task.
    ///
    /// Fails with [`BufferError::InvalidCapacity`] for `Bounded(0)`:
    /// an unbuffered batching buffer has nothing to batch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(capacity: Capacity) -> Result<Self, BufferError> {
        if capacity == Capacity::Bounded(0) {
            return Err(BufferError::InvalidCapacity);
        }

        let (submit_tx, submit_rx) = mpsc::channel(1);
        let (read_tx, read_rx) = mpsc::channel(1);
        let (len_tx, len_rx) = mpsc::channel(1);
        let (close_tx, close_rx) = mpsc::channel(1);

        tokio::spawn(coordinate(capacity, submit_rx, read_rx, len_rx, close_rx));

        Ok(Self {
            submit_tx,
            read_tx,
            len_tx,
            close_tx,
            capacity,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Append a value to the tail of the current batch.
    ///
    /// Suspends until the coordination loop accepts the value. While the
    /// write endpoint is open a value is always accepted eventually; a
    /// full bounded buffer only delays acceptance until a reader drains
    /// the batch. After [`close`](Self::close) the submission fails and
    /// the value is handed back in the error.
    pub async fn submit(&self, value: T) -> Result<(), SubmitError<T>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SubmitError(value));
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        let submission = Submission {
            value,
            ack: ack_tx,
        };
        if let Err(send_err) = self.submit_tx.send(submission).await {
            // Loop already shut down.
            return Err(SubmitError(send_err.0.value));
        }

        match ack_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(value)) => Err(SubmitError(value)),
            // The loop answers every queued submission before it exits.
            Err(_) => unreachable!("coordination loop dropped a pending submission"),
        }
    }

    /// Take the entire current batch, leaving the buffer empty.
    ///
    /// Suspends until at least one value is buffered. A delivered batch
    /// is never empty and preserves submission order. Returns `None`
    /// once the write endpoint is closed and every buffered value has
    /// been delivered.
    pub async fn receive(&self) -> Option<Vec<T>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.read_tx.send(reply_tx).await.ok()?;
        reply_rx.await.ok()
    }

    /// Number of buffered-but-undelivered values at some instant during
    /// the call. Returns 0 once the buffer is closed and drained.
    pub async fn len(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.len_tx.send(reply_tx).await.is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }

    /// The capacity configured at construction. Never blocks.
    pub fn cap(&self) -> Capacity {
        self.capacity
    }

    /// Close the write endpoint. Buffered values are still delivered as
    /// normal batches; once drained, [`receive`](Self::receive) reports
    /// end-of-stream.
    ///
    /// Closing twice is a programming error and fails with
    /// [`BufferError::DoubleClose`].
    pub async fn close(&self) -> Result<(), BufferError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BufferError::DoubleClose);
        }
        // Send failure means the loop is already gone; the endpoint is
        // closed either way.
        let _ = self.close_tx.send(()).await;
        Ok(())
    }

    /// Consume this handle into a stream of batches, ending at
    /// end-of-stream.
    pub fn into_stream(self) -> impl Stream<Item = Vec<T>> {
        async_stream::stream! {
            while let Some(batch) = self.receive().await {
                yield batch;
            }
        }
    }
}

/// The coordination loop: sole owner and sole mutator of the buffer.
///
/// Each iteration commits to exactly one ready edge, with explicit
/// readiness guards in place of a fixed priority (`tokio::select!`
/// polls branches in random order, so no edge starves):
/// - writes are accepted while the endpoint is open and the buffer is
///   under capacity;
/// - a read request is answered while the buffer is non-empty;
/// - length queries are always answered.
///
/// The loop ends when the write endpoint is closed and the buffer is
/// drained, or when every handle is gone. Dropping the request
/// receivers is what moves the read and length endpoints to their
/// closed state.
async fn coordinate<T>(
    capacity: Capacity,
    mut submit_rx: mpsc::Receiver<Submission<T>>,
    mut read_rx: mpsc::Receiver<oneshot::Sender<Vec<T>>>,
    mut len_rx: mpsc::Receiver<oneshot::Sender<usize>>,
    mut close_rx: mpsc::Receiver<()>,
) {
    let mut buffer: Vec<T> = Vec::new();
    let mut input_open = true;

    while input_open || !buffer.is_empty() {
        let writer_ready = input_open && !capacity.is_reached(buffer.len());
        let reader_ready = !buffer.is_empty();

        // A `None` on any request channel means every handle was
        // dropped: nobody is left to write or read, so stop.
        tokio::select! {
            submission = submit_rx.recv(), if writer_ready => {
                match submission {
                    Some(Submission { value, ack }) => {
                        buffer.push(value);
                        let _ = ack.send(Ok(()));
                    }
                    None => return,
                }
            }
            request = read_rx.recv(), if reader_ready => {
                match request {
                    Some(reply) => {
                        let batch = std::mem::take(&mut buffer);
                        tracing::trace!(batch_len = batch.len(), "delivering batch");
                        if let Err(batch) = reply.send(batch) {
                            // Reader abandoned the request before taking
                            // delivery; the batch stays on offer.
                            buffer = batch;
                        }
                    }
                    None => return,
                }
            }
            request = len_rx.recv() => {
                match request {
                    Some(reply) => {
                        let _ = reply.send(buffer.len());
                    }
                    None => return,
                }
            }
            signal = close_rx.recv(), if input_open => {
                match signal {
                    Some(()) => {
                        tracing::debug!(pending = buffer.len(), "write endpoint closed");
                        input_open = false;
                    }
                    None => return,
                }
            }
        }
    }

    // Closed and drained. Submissions that raced with close are still
    // queued; hand each value back to its writer before the queue dies.
    submit_rx.close();
    while let Some(Submission { value, ack }) = submit_rx.recv().await {
        let _ = ack.send(Err(value));
    }
    tracing::debug!("coordination loop finished");
}
