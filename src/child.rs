//! §4.3 `Child`: the user-visible, stream-scoped processing context.
//!
//! Reshapes the teacher's `proto::streams::streams::StreamRef` surface
//! (`send_data`, `poll_capacity`, `send_reset`, ...) into the push-style
//! write/flush/read/close contract this spec asks for, backed by
//! `futures::sync::oneshot` completions the way the teacher's own
//! `SendStream`/`ReleaseCapacity` handles return futures to callers.

use futures::sync::oneshot;
use futures::{Async, Future, Poll, Stream as FuturesStream};

use error::{Error, UserError};
use frame::Frame;
use proto::streams::{Key, Streams};
use proto::StreamId;

/// A stream-scoped handle into the shared `Streams` engine. Cheap to
/// clone (the clone shares the same `Key` and `Rc<RefCell<Inner>>`), the
/// way cloning the teacher's `StreamRef` shares its `Arc<Mutex<Inner>>`.
#[derive(Clone)]
pub struct Child {
    streams: Streams,
    key: Key,
}

/// Snapshot of a child's option accessors, bundled the way spec §4.3
/// asks for ("a sync-options accessor") rather than exposed as one
/// getter per field.
#[derive(Debug, Clone, Copy)]
pub struct ChildOptions {
    pub stream_id: Option<StreamId>,
    pub autoread: bool,
}

impl Child {
    pub(crate) fn new(streams: Streams, key: Key) -> Child {
        Child { streams, key }
    }

    /// Enqueues a frame for this stream. Held until the stream's id is
    /// assigned (on first flush) if it doesn't have one yet (spec §4.1).
    pub fn write(&self, frame: Frame) -> WriteFuture {
        WriteFuture(self.streams.write(self.key, frame))
    }

    /// Releases queued writes to the connection layer, assigning this
    /// stream's id on first release if it hasn't acquired one yet.
    pub fn flush(&self) {
        self.streams.flush(self.key);
    }

    /// §4.3 `read()`. Delivers the next deferred inbound frame, or parks
    /// the calling task until one arrives, the stream closes, or a
    /// stream-scoped error fires.
    pub fn read(&self) -> Poll<Option<Frame>, Error> {
        self.streams.poll_read(self.key)
    }

    /// Initiates shutdown (§4.6): synthesizes exactly one
    /// `RST_STREAM(CANCEL)` across however many callers invoke `close()`
    /// on this stream, and resolves only once the corresponding
    /// `StreamClosed` lifecycle event lands.
    pub fn close(&self) -> CloseFuture {
        CloseFuture(self.streams.close(self.key))
    }

    /// Resolves once this stream reaches `Closed`, regardless of cause.
    /// Unlike `close()`'s own completion, this future never fails.
    pub fn close_future(&self) -> CloseSignal {
        CloseSignal(self.streams.close_future(self.key))
    }

    pub fn is_writable(&self) -> bool {
        self.streams.is_writable(self.key)
    }

    pub fn is_active(&self) -> bool {
        self.streams.is_active(self.key)
    }

    /// The assigned wire id, or `NoStreamIdAvailable` if this is a
    /// locally-created stream that has not been flushed yet (spec §4.1).
    pub fn stream_id(&self) -> Result<StreamId, Error> {
        self.streams
            .stream_id(self.key)
            .ok_or_else(|| Error::from(UserError::NoStreamIdAvailable))
    }

    pub fn autoread(&self) -> bool {
        self.streams.autoread(self.key)
    }

    pub fn set_autoread(&self, value: bool) {
        self.streams.set_autoread(self.key, value);
    }

    pub fn options(&self) -> ChildOptions {
        ChildOptions { stream_id: self.streams.stream_id(self.key), autoread: self.autoread() }
    }

    /// Testable-property hook (spec §8 invariant 7): how many parent read
    /// bursts this child has received at least one frame in.
    pub fn read_complete_events(&self) -> u32 {
        self.streams.read_complete_events(self.key)
    }
}

impl FuturesStream for Child {
    type Item = Frame;
    type Error = Error;

    fn poll(&mut self) -> Poll<Option<Frame>, Error> {
        self.read()
    }
}

/// Resolves once a single `write()` call's frame has been flushed, or
/// fails if the stream closed before that happened.
pub struct WriteFuture(oneshot::Receiver<Result<(), Error>>);

impl Future for WriteFuture {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<(), Error> {
        match self.0.poll() {
            Ok(Async::Ready(Ok(()))) => Ok(Async::Ready(())),
            Ok(Async::Ready(Err(e))) => Err(e),
            Ok(Async::NotReady) => Ok(Async::NotReady),
            Err(_canceled) => Err(Error::from(UserError::IoOnClosedChannel)),
        }
    }
}

/// Resolves once a single `close()` call is satisfied by the stream's
/// terminal `StreamClosed` event; fails if that event carried a reset
/// reason (spec §4.6).
pub struct CloseFuture(oneshot::Receiver<Result<(), Error>>);

impl Future for CloseFuture {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<(), Error> {
        match self.0.poll() {
            Ok(Async::Ready(Ok(()))) => Ok(Async::Ready(())),
            Ok(Async::Ready(Err(e))) => Err(e),
            Ok(Async::NotReady) => Ok(Async::NotReady),
            Err(_canceled) => Ok(Async::Ready(())),
        }
    }
}

/// `Child::close_future()`: never fails, regardless of how the stream
/// actually closed.
pub struct CloseSignal(oneshot::Receiver<()>);

impl Future for CloseSignal {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<(), Error> {
        match self.0.poll() {
            Ok(Async::Ready(())) => Ok(Async::Ready(())),
            Ok(Async::NotReady) => Ok(Async::NotReady),
            Err(_canceled) => Ok(Async::Ready(())),
        }
    }
}
