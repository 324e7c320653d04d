//! §2/§6 `Multiplexer`: the event loop tying the inbound router, the
//! outbound collector, and the lifecycle coordinator together over one
//! `ConnectionIo`.
//!
//! Shaped on the teacher's `Server`/`Client` wrapping `proto::Connection`
//! and exposing it as a `futures::Stream` (see `server.rs`'s `impl
//! futures::Stream for Server`): each `poll()` drains everything C
//! currently has to offer, dispatches it, and yields only the frames
//! that are none of M's business -- PING/GOAWAY/SETTINGS/connection
//! WINDOW_UPDATE and PRIORITY (spec §3, §4.2) -- back to the caller,
//! which in the full stack would hand them to the connection-level
//! ping/settings/goaway handlers this crate's scope excludes (spec §1).

use std::collections::VecDeque;

use futures::sync::oneshot;
use futures::{Async, AsyncSink, Future, Poll, Stream as FuturesStream};

use child::Child;
use config::Options;
use connection_io::{ConnEvent, ConnectionIo};
use error::Error;
use frame::Frame;
use proto::streams::{CreateStreamFuture, Ingested, Key, Lifecycle, Streams};
use proto::Mode;

/// A user-supplied stream setup routine (spec §4.5): takes the freshly
/// created `Child` and returns a future that must resolve before the
/// stream may deliver inbound frames or release outbound ones.
pub type Initializer = Box<dyn Future<Item = (), Error = Error>>;

/// Drives one HTTP/2 connection's worth of stream multiplexing.
///
/// `F` is the inbound factory (spec §4.5): invoked once per peer-opened
/// stream with a fresh `Child`, producing that stream's setup
/// initializer.
pub struct Multiplexer<C, F> {
    conn: C,
    streams: Streams,
    inbound_initializer: F,

    /// PING/GOAWAY/SETTINGS/connection WINDOW_UPDATE and PRIORITY frames
    /// observed this burst, queued for `poll` to yield to the caller
    /// (spec §3's "forwarded unchanged upstream of M").
    passthrough: VecDeque<Frame>,

    /// `NoSuchStream` and similar per-frame routing errors (spec §4.2,
    /// §7): surfaced on the next `poll()` without tearing down the whole
    /// connection, since they are scoped to the one offending frame.
    errors: VecDeque<Error>,

    /// Set once `conn.poll_event()` reports end-of-stream; `poll()`
    /// reports `Ready(None)` once every live child has also torn down.
    conn_closed: bool,
}

impl<C, F> Multiplexer<C, F>
where
    C: ConnectionIo,
    F: FnMut(Child) -> Initializer,
{
    pub fn new(mode: Mode, conn: C, inbound_initializer: F, options: Options) -> Multiplexer<C, F> {
        Multiplexer {
            conn,
            streams: Streams::new(mode, options),
            inbound_initializer,
            passthrough: VecDeque::new(),
            errors: VecDeque::new(),
            conn_closed: false,
        }
    }

    /// A cheap, clonable handle onto the shared stream engine -- callers
    /// that need to hand out `Child`s from outside `create_stream` (e.g.
    /// a bootstrap layer wiring up an acceptor loop) can stash this.
    pub fn streams(&self) -> Streams {
        self.streams.clone()
    }

    /// §4.5 outbound factory path: allocates a child with no wire id yet,
    /// runs `initializer` against it, and returns both the child and a
    /// completion that resolves once that initializer succeeds or fails.
    pub fn create_stream<I>(&mut self, initializer: I) -> (Child, CreateStreamFuture)
    where
        I: FnOnce(Child) -> Initializer,
    {
        let key = self.streams.open_outbound();
        let child = Child::new(self.streams.clone(), key);
        let fut = initializer(child.clone());
        let (tx, rx) = oneshot::channel();
        self.streams.install_initializer(key, fut, Some(tx));
        (child, rx)
    }

    /// Runs the deterministic handler-teardown hook spec §9 asks for
    /// (the "spin the loop" idiom), returning how many stream slots were
    /// actually reclaimed. Exposed separately from `poll()` so tests can
    /// assert on it directly (spec §9's test hook note).
    pub fn run_pending_teardown(&mut self) -> usize {
        self.streams.run_pending_teardown()
    }

    fn ingest_frame(&mut self, frame: Frame) {
        match self.streams.ingest(frame) {
            Ok(Ingested::Routed) => {}
            Ok(Ingested::Passthrough(frame)) => {
                trace!("multiplexer: passthrough frame; id={:?}", frame.stream_id());
                self.passthrough.push_back(frame);
            }
            Ok(Ingested::Opened(key)) => self.spawn_inbound(key),
            Err(e) => {
                error!("multiplexer: inbound routing error; err={}", e);
                self.errors.push_back(e);
            }
        }
    }

    fn spawn_inbound(&mut self, key: Key) {
        let child = Child::new(self.streams.clone(), key);
        let fut = (self.inbound_initializer)(child);
        self.streams.install_initializer(key, fut, None);
    }

    fn dispatch_lifecycle(&mut self, event: Lifecycle) {
        match event {
            Lifecycle::StreamCreated { id, local_window, remote_window } => {
                debug!("multiplexer: stream_created; id={:?}", id);
                self.streams.on_stream_created(id, local_window, remote_window);
            }
            Lifecycle::StreamClosed { id, reason } => {
                debug!("multiplexer: stream_closed; id={:?}; reason={:?}", id, reason);
                self.streams.on_stream_closed(id, reason);
            }
            Lifecycle::WindowUpdated { id, inbound_window_size, outbound_window_size } => {
                self.streams.on_window_updated(id, inbound_window_size, outbound_window_size);
            }
            Lifecycle::WritabilityChanged(writable) => {
                trace!("multiplexer: parent writability changed; writable={}", writable);
                self.streams.on_writability_changed(writable);
            }
        }
    }

    /// Drains every inbound event currently available from `C`,
    /// dispatching frames through the inbound router and lifecycle
    /// events through the coordinator.
    fn drive_inbound(&mut self) -> Result<(), Error> {
        loop {
            match self.conn.poll_event()? {
                Async::Ready(Some(ConnEvent::Frame(frame))) => self.ingest_frame(frame),
                Async::Ready(Some(ConnEvent::Lifecycle(event))) => self.dispatch_lifecycle(event),
                Async::Ready(None) => {
                    self.conn_closed = true;
                    break;
                }
                Async::NotReady => break,
            }
        }
        Ok(())
    }

    /// §4.4 flush coalescing: release every frame `Streams` has
    /// accumulated since the last burst to `C` in one pass, then call
    /// `poll_complete` exactly once -- regardless of how many individual
    /// children called `flush()` along the way.
    fn release_outbound(&mut self) -> Result<(), Error> {
        while let Some(frame) = self.streams.pop_outbound() {
            match self.conn.start_send(frame)? {
                AsyncSink::Ready => {}
                AsyncSink::NotReady(frame) => {
                    self.streams.push_outbound_front(frame);
                    break;
                }
            }
        }
        let _ = self.conn.poll_complete()?;
        Ok(())
    }
}

impl<C, F> FuturesStream for Multiplexer<C, F>
where
    C: ConnectionIo,
    F: FnMut(Child) -> Initializer,
{
    type Item = Frame;
    type Error = Error;

    /// One event-loop iteration (spec §9's trampolining note): ingest,
    /// advance setup initializers, coalesce-flush outbound writes, run
    /// deferred teardown, then yield the next passthrough frame (if any)
    /// or surface the next per-frame routing error.
    fn poll(&mut self) -> Poll<Option<Frame>, Error> {
        self.drive_inbound()?;
        self.streams.poll_initializers();
        self.release_outbound()?;

        let reclaimed = self.streams.run_pending_teardown();
        if reclaimed > 0 {
            trace!("multiplexer: reclaimed {} stream slot(s)", reclaimed);
        }
        self.streams.end_of_burst();

        if let Some(err) = self.errors.pop_front() {
            return Err(err);
        }
        if let Some(frame) = self.passthrough.pop_front() {
            return Ok(Async::Ready(Some(frame)));
        }
        if self.conn_closed && self.streams.stream_count() == 0 {
            Ok(Async::Ready(None))
        } else {
            Ok(Async::NotReady)
        }
    }
}
