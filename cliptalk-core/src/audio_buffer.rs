//! Per-utterance audio channel
//!
//! One synthesis worker writes encoded audio chunks into an [`AudioBuffer`]
//! while one HTTP response drains it. Either side may disappear: the writer
//! ends the stream with a normal shutdown, a listener skipping ahead cancels
//! it with an immediate shutdown.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Result of a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Next chunk of encoded audio
    Chunk(Bytes),
    /// Terminal marker: the buffer was shut down (or the read was cancelled)
    /// and nothing further will be yielded to this read
    EndOfStream,
}

/// Result of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
    Written,
    /// The buffer is shut down; the chunk was dropped
    Closed,
}

impl WriteOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, WriteOutcome::Closed)
    }
}

/// Lifecycle of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Open,
    /// Shut down normally; queued chunks still drain
    ShutDown,
    /// Shut down immediately; queued chunks were discarded
    Cancelled,
}

struct Inner {
    chunks: VecDeque<Bytes>,
    state: BufferState,
}

struct Shared {
    id: u64,
    media_type: String,
    capacity: Option<usize>,
    inner: Mutex<Inner>,
    readable: Notify,
    writable: Notify,
}

/// Shared handle to one utterance's audio
#[derive(Clone)]
pub struct AudioBuffer {
    shared: Arc<Shared>,
}

impl AudioBuffer {
    /// Create an unbounded buffer carrying audio of the given media type
    pub fn new(media_type: impl Into<String>) -> Self {
        Self::with_capacity(media_type, None)
    }

    /// Create a buffer holding at most `capacity` unread chunks
    pub fn bounded(media_type: impl Into<String>, capacity: usize) -> Self {
        Self::with_capacity(media_type, Some(capacity.max(1)))
    }

    pub fn with_capacity(media_type: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
                media_type: media_type.into(),
                capacity,
                inner: Mutex::new(Inner {
                    chunks: VecDeque::new(),
                    state: BufferState::Open,
                }),
                readable: Notify::new(),
                writable: Notify::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn media_type(&self) -> &str {
        &self.shared.media_type
    }

    pub fn state(&self) -> BufferState {
        self.shared.inner.lock().state
    }

    pub fn is_shut_down(&self) -> bool {
        self.state() != BufferState::Open
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == BufferState::Cancelled
    }

    /// Number of chunks written but not yet read
    pub fn buffered_chunks(&self) -> usize {
        self.shared.inner.lock().chunks.len()
    }

    /// Whether two handles refer to the same buffer
    pub fn same_as(&self, other: &AudioBuffer) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Append a chunk.
    ///
    /// Suspends only when the buffer is bounded and full. Reports
    /// [`WriteOutcome::Closed`] once the buffer has been shut down in either mode.
    pub async fn write(&self, chunk: Bytes) -> WriteOutcome {
        loop {
            let notified = self.shared.writable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.shared.inner.lock();
                if inner.state != BufferState::Open {
                    return WriteOutcome::Closed;
                }
                let has_room = self
                    .shared
                    .capacity
                    .map_or(true, |capacity| inner.chunks.len() < capacity);
                if has_room {
                    inner.chunks.push_back(chunk);
                    drop(inner);
                    self.shared.readable.notify_waiters();
                    return WriteOutcome::Written;
                }
            }

            notified.await;
        }
    }

    /// Wait for the next chunk or the terminal marker
    pub async fn read(&self) -> ReadOutcome {
        self.read_until(std::future::pending::<()>()).await
    }

    /// Like [`read`](Self::read), but gives up with the terminal marker as soon
    /// as `cancel` completes
    pub async fn read_until<F>(&self, cancel: F) -> ReadOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(cancel);

        loop {
            let notified = self.shared.readable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.shared.inner.lock();
                if let Some(chunk) = inner.chunks.pop_front() {
                    drop(inner);
                    self.shared.writable.notify_waiters();
                    return ReadOutcome::Chunk(chunk);
                }
                if inner.state != BufferState::Open {
                    return ReadOutcome::EndOfStream;
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = &mut cancel => return ReadOutcome::EndOfStream,
            }
        }
    }

    /// Move to a terminal state and release every blocked reader and writer.
    ///
    /// A normal shutdown lets buffered chunks drain; an immediate one discards
    /// them. Repeating a shutdown is a no-op, except that an immediate shutdown
    /// still discards whatever a previous normal shutdown left unread.
    pub fn shutdown(&self, immediate: bool) {
        {
            let mut inner = self.shared.inner.lock();
            match (inner.state, immediate) {
                (BufferState::Open, false) => inner.state = BufferState::ShutDown,
                (BufferState::Open, true) | (BufferState::ShutDown, true) => {
                    inner.state = BufferState::Cancelled;
                    inner.chunks.clear();
                }
                _ => return,
            }
        }
        self.shared.readable.notify_waiters();
        self.shared.writable.notify_waiters();
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("AudioBuffer")
            .field("id", &self.shared.id)
            .field("media_type", &self.shared.media_type)
            .field("state", &inner.state)
            .field("buffered", &inner.chunks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn chunk(data: &'static [u8]) -> Bytes {
        Bytes::from_static(data)
    }

    #[tokio::test]
    async fn test_write_then_read_in_order() {
        let buffer = AudioBuffer::new("audio/wav");
        assert_eq!(buffer.write(chunk(b"one")).await, WriteOutcome::Written);
        assert_eq!(buffer.write(chunk(b"two")).await, WriteOutcome::Written);
        buffer.shutdown(false);

        assert_eq!(buffer.read().await, ReadOutcome::Chunk(chunk(b"one")));
        assert_eq!(buffer.read().await, ReadOutcome::Chunk(chunk(b"two")));
        assert_eq!(buffer.read().await, ReadOutcome::EndOfStream);
        assert_eq!(buffer.read().await, ReadOutcome::EndOfStream);
    }

    #[tokio::test]
    async fn test_reader_wakes_on_write() {
        let buffer = AudioBuffer::new("audio/wav");
        let reader = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.read().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(buffer.write(chunk(b"late")).await, WriteOutcome::Written);

        let outcome = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
        assert_eq!(outcome, ReadOutcome::Chunk(chunk(b"late")));
    }

    #[tokio::test]
    async fn test_immediate_shutdown_releases_blocked_reader() {
        let buffer = AudioBuffer::new("audio/mpeg");
        let reader = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.read().await })
        };
        tokio::task::yield_now().await;
        buffer.shutdown(true);

        let outcome = timeout(Duration::from_secs(1), reader).await.unwrap().unwrap();
        assert_eq!(outcome, ReadOutcome::EndOfStream);
        assert!(buffer.is_cancelled());
    }

    #[tokio::test]
    async fn test_immediate_shutdown_discards_buffered_chunks() {
        let buffer = AudioBuffer::new("audio/wav");
        assert!(!buffer.write(chunk(b"a")).await.is_closed());
        assert!(!buffer.write(chunk(b"b")).await.is_closed());
        buffer.shutdown(true);

        assert_eq!(buffer.buffered_chunks(), 0);
        assert_eq!(buffer.read().await, ReadOutcome::EndOfStream);
    }

    #[tokio::test]
    async fn test_write_after_shutdown_reports_closed() {
        let buffer = AudioBuffer::new("audio/wav");
        buffer.shutdown(false);
        assert!(buffer.write(chunk(b"x")).await.is_closed());
        assert_eq!(buffer.read().await, ReadOutcome::EndOfStream);

        let cancelled = AudioBuffer::new("audio/wav");
        cancelled.shutdown(true);
        assert!(cancelled.write(chunk(b"x")).await.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let buffer = AudioBuffer::new("audio/wav");
        assert!(!buffer.write(chunk(b"a")).await.is_closed());
        buffer.shutdown(false);
        buffer.shutdown(false);
        assert_eq!(buffer.state(), BufferState::ShutDown);
        assert_eq!(buffer.buffered_chunks(), 1);

        buffer.shutdown(true);
        buffer.shutdown(false);
        assert_eq!(buffer.state(), BufferState::Cancelled);
        assert_eq!(buffer.buffered_chunks(), 0);
    }

    #[tokio::test]
    async fn test_read_until_cancel() {
        let buffer = AudioBuffer::new("audio/wav");
        let outcome = buffer
            .read_until(tokio::time::sleep(Duration::from_millis(10)))
            .await;
        assert_eq!(outcome, ReadOutcome::EndOfStream);
        // The buffer itself is untouched by a cancelled read
        assert_eq!(buffer.state(), BufferState::Open);
    }

    #[tokio::test]
    async fn test_bounded_write_waits_for_room() {
        let buffer = AudioBuffer::bounded("audio/wav", 1);
        assert!(!buffer.write(chunk(b"first")).await.is_closed());

        let writer = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.write(chunk(b"second")).await })
        };
        tokio::task::yield_now().await;
        assert!(!writer.is_finished());

        assert_eq!(buffer.read().await, ReadOutcome::Chunk(chunk(b"first")));
        let outcome = timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
    }

    #[tokio::test]
    async fn test_bounded_writer_released_by_shutdown() {
        let buffer = AudioBuffer::bounded("audio/wav", 1);
        assert!(!buffer.write(chunk(b"first")).await.is_closed());

        let writer = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.write(chunk(b"second")).await })
        };
        tokio::task::yield_now().await;
        buffer.shutdown(true);

        let outcome = timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
        assert_eq!(outcome, WriteOutcome::Closed);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = AudioBuffer::new("audio/wav");
        let b = AudioBuffer::new("audio/wav");
        assert_ne!(a.id(), b.id());
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
    }
}
