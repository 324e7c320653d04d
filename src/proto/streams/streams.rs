//! The shared multiplexing engine: §4.2 inbound router, §4.4 outbound
//! collector, §4.6 lifecycle coordinator, all closing over one `Inner`
//! the way the teacher's `proto::streams::streams::Streams<B, P>` closes
//! over its own `Inner<B>` -- except shared via `Rc<RefCell<_>>` rather
//! than `Arc<Mutex<_>>` (see DESIGN.md's single-thread divergence).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::sync::oneshot;
use futures::{task, Async, Future};

use config::Options;
use error::{Error, Reason, UserError};
use frame::{Frame, Reset, WindowUpdate};
use proto::{Allocator, Mode, StreamId, WindowSize};

use super::flow_control::{InboundWindow, Watermark};
use super::state::CloseCause;
use super::store::{Key, Store};
use super::stream::{PendingWrite, Role, Stream};

/// Lifecycle events the connection layer reports out of band from frames
/// (spec §6).
#[derive(Debug, Clone)]
pub enum Lifecycle {
    StreamCreated { id: StreamId, local_window: WindowSize, remote_window: WindowSize },
    StreamClosed { id: StreamId, reason: Option<Reason> },
    WindowUpdated {
        id: StreamId,
        inbound_window_size: Option<WindowSize>,
        outbound_window_size: Option<WindowSize>,
    },
    WritabilityChanged(bool),
}

/// What `Streams::ingest` did with a frame: the caller (`Multiplexer`)
/// only needs to act further when a new inbound stream was just opened,
/// since that is the one moment the user's inbound initializer has to be
/// invoked from outside this module.
pub enum Ingested {
    /// Handled entirely internally.
    Routed,
    /// Not addressed to any stream; forward unchanged (spec §3: id=0 or
    /// PRIORITY frames).
    Passthrough(Frame),
    /// A new inbound stream was created by this frame. The caller must
    /// construct a `Child` for `key` and install its initializer.
    Opened(Key),
}

pub type CreateStreamFuture = oneshot::Receiver<Result<(), Error>>;

#[derive(Clone)]
pub struct Streams {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    store: Store,
    allocator: Allocator,
    mode: Mode,
    options: Options,
    parent_writable: bool,
    outbound: VecDeque<Frame>,
    pending_teardown: VecDeque<Key>,
}

impl Streams {
    pub fn new(mode: Mode, options: Options) -> Streams {
        Streams {
            inner: Rc::new(RefCell::new(Inner {
                store: Store::new(),
                allocator: Allocator::new(mode),
                mode,
                options,
                parent_writable: true,
                outbound: VecDeque::new(),
                pending_teardown: VecDeque::new(),
            })),
        }
    }

    pub fn options(&self) -> Options {
        self.inner.borrow().options.clone()
    }

    // ---- §4.2 inbound router -------------------------------------------------

    pub fn ingest(&self, frame: Frame) -> Result<Ingested, Error> {
        let id = frame.stream_id();
        if id.is_zero() || is_priority(&frame) {
            return Ok(Ingested::Passthrough(frame));
        }

        let mut inner = self.inner.borrow_mut();
        if let Some(key) = inner.store.find_key(id) {
            route(&mut inner, key, frame)?;
            return Ok(Ingested::Routed);
        }

        if is_headers(&frame) && is_peer_initiated(inner.mode, id) {
            trace!("streams: opening inbound stream; id={:?}", id);
            let key = open_inbound(&mut inner, id);
            route(&mut inner, key, frame)?;
            return Ok(Ingested::Opened(key));
        }

        error!("streams: no such stream; id={:?}", id);
        Err(Error::NoSuchStream(id))
    }

    /// Installs a just-run initializer (either inbound or outbound) and
    /// transitions the stream into `SetupPending`. `completion`, when
    /// given, is the caller-visible `create_stream` future fired by
    /// `activate`/`fail_setup` once the initializer resolves (spec §4.5).
    pub fn install_initializer(
        &self,
        key: Key,
        fut: Box<dyn Future<Item = (), Error = Error>>,
        completion: Option<oneshot::Sender<Result<(), Error>>>,
    ) {
        let mut inner = self.inner.borrow_mut();
        let stream = inner.store.get_mut(key);
        stream.phase.begin_setup();
        stream.initializer = Some(fut);
        stream.setup_completion = completion;
    }

    /// Drives every stream's pending initializer one step. Called once
    /// per `Multiplexer::poll()` iteration regardless of whether any
    /// frames arrived this tick, since initializer completion is driven
    /// by the user's own future, not frame arrival.
    pub fn poll_initializers(&self) {
        let keys = self.inner.borrow().store.all_keys();
        for key in keys {
            let mut inner = self.inner.borrow_mut();
            let has_initializer = inner.store.get(key).initializer.is_some();
            if !has_initializer {
                continue;
            }
            let polled = {
                let stream = inner.store.get_mut(key);
                let mut fut = stream.initializer.take().expect("checked above");
                let polled = fut.poll();
                if let Ok(Async::NotReady) = polled {
                    stream.initializer = Some(fut);
                }
                polled
            };
            match polled {
                Ok(Async::NotReady) => {}
                Ok(Async::Ready(())) => activate(&mut inner, key),
                Err(e) => fail_setup(&mut inner, key, e),
            }
        }
    }

    // ---- §4.3/§4.4 child-facing write/flush/read/close -----------------------

    pub fn write(&self, key: Key, mut frame: Frame) -> oneshot::Receiver<Result<(), Error>> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.borrow_mut();
        let stream = inner.store.get_mut(key);
        if stream.phase.is_closed() {
            let _ = tx.send(Err(Error::from(UserError::IoOnClosedChannel)));
            return rx;
        }
        if let Some(id) = stream.id {
            frame.set_stream_id(id);
        }
        let cost = stream_cost(&frame);
        if cost > 0 {
            if let Some(ref mut wm) = stream.watermark {
                wm.charge(cost);
            }
        }
        stream.outbound_pending.push_back(PendingWrite { frame, completion: Some(tx) });
        rx
    }

    /// Releases every queued write for one stream into the connection
    /// outbound queue, assigning the stream's id lazily on first release
    /// (spec §4.1/§4.4).
    pub fn flush(&self, key: Key) {
        let mut inner = self.inner.borrow_mut();

        if inner.store.get(key).phase.is_setup_pending() {
            // Setup hasn't completed: no outbound frame may leave M yet
            // (spec §4.5 step 2), so the id stays unassigned too -- it is
            // only ever assigned at the moment a frame actually releases.
            return;
        }

        let needs_id = {
            let stream = inner.store.get(key);
            stream.id.is_none() && !stream.outbound_pending.is_empty()
        };
        if needs_id {
            let id = inner.allocator.assign();
            inner.store.get_mut(key).id = Some(id);
            inner.store.assign_id(key, id);
        }

        let Inner { ref mut store, ref mut outbound, .. } = *inner;
        let stream = store.get_mut(key);
        while let Some(pending) = stream.outbound_pending.pop_front() {
            let mut frame = pending.frame;
            if let Some(id) = stream.id {
                frame.set_stream_id(id);
            }
            let cost = stream_cost(&frame);
            if cost > 0 {
                if let Some(ref mut wm) = stream.watermark {
                    wm.release(cost);
                }
            }
            if frame.is_end_stream() {
                stream.phase.send_close();
            }
            outbound.push_back(frame);
            if let Some(tx) = pending.completion {
                let _ = tx.send(Ok(()));
            }
        }
    }

    /// §4.3 `read()`: delivers the next deferred frame if one is queued,
    /// otherwise parks the calling task and returns `NotReady`. Held back
    /// entirely while the stream is still `SetupPending` (spec invariant
    /// 1); a `Closed` stream with nothing left queued yields end-of-stream.
    pub fn poll_read(&self, key: Key) -> Result<Async<Option<Frame>>, Error> {
        let mut inner = self.inner.borrow_mut();
        let stream = inner.store.get_mut(key);

        if let Some(err) = stream.close_error.take() {
            return Err(err);
        }
        if stream.phase.is_setup_pending() {
            stream.recv_task = Some(task::current());
            return Ok(Async::NotReady);
        }
        if stream.phase.is_closing() {
            // Setup failed: queued inbound frames were already dropped
            // (spec §4.5 point 4), and no more are delivered until the
            // matching `StreamClosed` event fully closes the stream.
            stream.recv_task = Some(task::current());
            return Ok(Async::NotReady);
        }
        if let Some(frame) = stream.inbound_deferred.pop_front() {
            stream.read_pending = false;
            return Ok(Async::Ready(Some(frame)));
        }
        if stream.phase.is_closed() {
            return Ok(Async::Ready(None));
        }
        stream.read_pending = true;
        stream.recv_task = Some(task::current());
        Ok(Async::NotReady)
    }

    pub fn is_writable(&self, key: Key) -> bool {
        let inner = self.inner.borrow();
        let stream = inner.store.get(key);
        stream.is_writable(inner.parent_writable)
    }

    pub fn is_active(&self, key: Key) -> bool {
        self.inner.borrow().store.get(key).phase.is_active()
    }

    pub fn stream_id(&self, key: Key) -> Option<StreamId> {
        self.inner.borrow().store.get(key).id
    }

    pub fn autoread(&self, key: Key) -> bool {
        self.inner.borrow().store.get(key).autoread
    }

    pub fn set_autoread(&self, key: Key, value: bool) {
        self.inner.borrow_mut().store.get_mut(key).autoread = value;
    }

    /// Local `close()`: emits exactly one `RST_STREAM(CANCEL)` (spec
    /// testable property 4), or closes synchronously if the stream never
    /// acquired an id (it was never visible to the peer).
    pub fn close(&self, key: Key) -> oneshot::Receiver<Result<(), Error>> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.borrow_mut();
        let stream = inner.store.get_mut(key);

        if stream.phase.is_closed() {
            let _ = tx.send(Ok(()));
            return rx;
        }

        match stream.id {
            Some(id) => {
                if !stream.reset_sent {
                    debug!("streams: local close; sending RST_STREAM; id={:?}", id);
                    inner.outbound.push_back(Frame::from(Reset::new(id, Reason::Cancel)));
                    stream.reset_sent = true;
                }
                stream.close_promises.push(tx);
            }
            None => {
                close_without_id(stream);
                let _ = tx.send(Ok(()));
                inner.pending_teardown.push_back(key);
            }
        }
        rx
    }

    pub fn close_future(&self, key: Key) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.borrow_mut();
        let stream = inner.store.get_mut(key);
        if stream.phase.is_closed() {
            let _ = tx.send(());
        } else {
            stream.close_future_waiters.push(tx);
        }
        rx
    }

    // ---- §4.5 factory-facing stream creation ----------------------------------

    pub fn open_outbound(&self) -> Key {
        let mut inner = self.inner.borrow_mut();
        let high = inner.options.high_watermark;
        let low = inner.options.low_watermark;
        let target = inner.options.target_window_size;
        let mut stream = Stream::new(Role::Outbound);
        stream.watermark = Some(Watermark::new(high, low));
        stream.inbound_window =
            Some(InboundWindow::new(target));
        inner.store.insert_pending(stream)
    }

    // ---- §4.6 lifecycle coordinator --------------------------------------------

    pub fn on_stream_created(&self, id: StreamId, local_window: WindowSize, _remote_window: WindowSize) {
        // `remote_window` is the peer's real HTTP/2 flow-control budget for
        // our outbound DATA; §4.7 defines writability purely from buffered
        // bytes, so it is deliberately not modeled here.
        let mut inner = self.inner.borrow_mut();
        if let Some(key) = inner.store.find_key(id) {
            inner.store.get_mut(key).inbound_window =
                Some(InboundWindow::new(local_window));
            let no_pending_initializer = inner.store.get(key).initializer.is_none();
            if no_pending_initializer {
                activate(&mut inner, key);
            }
        }
    }

    pub fn on_stream_closed(&self, id: StreamId, reason: Option<Reason>) {
        let mut inner = self.inner.borrow_mut();
        let key = match inner.store.find_key(id) {
            Some(k) => k,
            None => return,
        };
        let stream = inner.store.get_mut(key);
        if stream.phase.is_closed() {
            return; // idempotent: already processed
        }
        debug!("streams: stream_closed; id={:?}; reason={:?}", id, reason);
        stream.phase.close();
        // No further inbound frames may be delivered past this point
        // (spec §3 invariant); drop whatever is still queued.
        stream.inbound_deferred.clear();

        let cause = match reason {
            Some(r) => CloseCause::Reset(r),
            None => CloseCause::EndOfStream,
        };
        let fail = match cause {
            CloseCause::Reset(r) => Error::Stream { id, reason: r },
            CloseCause::EndOfStream => Error::from(UserError::Eof),
        };
        for pending in stream.outbound_pending.drain(..) {
            if let Some(tx) = pending.completion {
                let _ = tx.send(Err(fail.clone()));
            }
        }
        for tx in stream.close_promises.drain(..) {
            let result = match cause {
                CloseCause::Reset(r) => Err(Error::Stream { id, reason: r }),
                CloseCause::EndOfStream => Ok(()),
            };
            let _ = tx.send(result);
        }
        for tx in stream.close_future_waiters.drain(..) {
            let _ = tx.send(());
        }
        if let CloseCause::Reset(_) = cause {
            stream.close_error = Some(fail);
        }
        if let Some(task) = stream.recv_task.take() {
            task.notify();
        }
        inner.pending_teardown.push_back(key);
    }

    pub fn on_window_updated(
        &self,
        id: StreamId,
        inbound_window_size: Option<WindowSize>,
        outbound_window_size: Option<WindowSize>,
    ) {
        // Open question (spec §9): both absent is a documented no-op.
        if inbound_window_size.is_none() && outbound_window_size.is_none() {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        let key = match inner.store.find_key(id) {
            Some(k) => k,
            None => return,
        };
        let stream = inner.store.get_mut(key);
        if stream.phase.is_closed() {
            return;
        }
        if let Some(iw) = inbound_window_size {
            let increment = stream.inbound_window.as_mut().and_then(|w| w.observe(iw));
            if let Some(increment) = increment {
                inner.outbound.push_back(Frame::from(WindowUpdate::new(id, increment)));
            }
        }
        // `outbound_window_size` mirrors the peer's real remote-window
        // report; not modeled, same rationale as `StreamCreated.remote_window`.
    }

    pub fn on_writability_changed(&self, writable: bool) {
        self.inner.borrow_mut().parent_writable = writable;
    }

    // ---- event-loop plumbing ----------------------------------------------

    pub fn pop_outbound(&self) -> Option<Frame> {
        self.inner.borrow_mut().outbound.pop_front()
    }

    pub fn push_outbound_front(&self, frame: Frame) {
        self.inner.borrow_mut().outbound.push_front(frame);
    }

    /// Removes every stream slot queued for teardown since the last call,
    /// breaking the child/store cyclic reference (spec §9) one event-loop
    /// tick after the `StreamClosed` event that closed it. Returns the
    /// count processed -- the deterministic test hook spec §9 asks for.
    pub fn run_pending_teardown(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut n = 0;
        while let Some(key) = inner.pending_teardown.pop_front() {
            inner.store.remove(key);
            n += 1;
        }
        n
    }

    pub fn stream_count(&self) -> usize {
        self.inner.borrow().store.len()
    }

    /// Closes out one parent read burst (spec §4.3/§5/§8 invariant 7):
    /// every stream that saw at least one frame this burst gets its
    /// `read_complete_events` counter bumped exactly once, then the flag
    /// resets for the next burst.
    pub fn end_of_burst(&self) {
        let mut inner = self.inner.borrow_mut();
        let keys = inner.store.keys();
        for key in keys {
            let stream = inner.store.get_mut(key);
            if stream.saw_frame_this_burst {
                stream.saw_frame_this_burst = false;
                stream.read_complete_events += 1;
            }
        }
    }

    /// Testable-property hook: current `read_complete_events` count for a
    /// stream, exposed so integration tests can assert invariant 7
    /// without a real handler-chain callback to intercept.
    pub fn read_complete_events(&self, key: Key) -> u32 {
        self.inner.borrow().store.get(key).read_complete_events
    }
}

fn stream_cost(frame: &Frame) -> WindowSize {
    frame.flow_controlled_len() as WindowSize
}

fn is_priority(frame: &Frame) -> bool {
    matches!(frame, Frame::Priority(_))
}

fn is_headers(frame: &Frame) -> bool {
    matches!(frame, Frame::Headers(_))
}

fn is_peer_initiated(mode: Mode, id: StreamId) -> bool {
    match mode {
        Mode::Client => id.is_server_initiated(),
        Mode::Server => id.is_client_initiated(),
    }
}

fn open_inbound(inner: &mut Inner, id: StreamId) -> Key {
    let high = inner.options.high_watermark;
    let low = inner.options.low_watermark;
    let target = inner.options.target_window_size;
    let mut stream = Stream::new(Role::Inbound);
    stream.id = Some(id);
    stream.watermark = Some(Watermark::new(high, low));
    stream.inbound_window = Some(InboundWindow::new(target));
    inner.store.insert(id, stream)
}

/// Appends an inbound frame to its stream's deferral queue. Whether it is
/// actually visible to the child yet is decided by `Child::poll_read`
/// (held back while `phase == SetupPending`), not here -- this function
/// only ever queues (spec invariant 1).
fn route(inner: &mut Inner, key: Key, frame: Frame) -> Result<(), Error> {
    let stream = inner.store.get_mut(key);
    if stream.phase.is_closed() {
        return Err(Error::NoSuchStream(stream.id.unwrap_or(StreamId::ZERO)));
    }
    let end_stream = frame.is_end_stream();
    stream.inbound_deferred.push_back(frame);
    if end_stream {
        stream.phase.recv_close();
    }
    stream.saw_frame_this_burst = true;
    // Autoread off means frames accumulate until the child explicitly
    // calls `read()` again; don't wake a parked reader in that case
    // (spec §4.3 delivery policy).
    if stream.autoread {
        if let Some(task) = stream.recv_task.take() {
            task.notify();
        }
    }
    Ok(())
}

fn activate(inner: &mut Inner, key: Key) {
    let stream = inner.store.get_mut(key);
    stream.phase.activate();
    if let Some(tx) = stream.setup_completion.take() {
        let _ = tx.send(Ok(()));
    }
    if let Some(task) = stream.recv_task.take() {
        task.notify();
    }
}

/// §4.5 initializer failure. Inbound streams already have an id the peer
/// knows about: reset the wire stream and wait for the corresponding
/// `StreamClosed`. Outbound streams that failed setup before their first
/// flush never reached the wire, so there is nothing to reset -- close
/// locally and move straight to teardown.
fn fail_setup(inner: &mut Inner, key: Key, err: Error) {
    error!("streams: setup initializer failed; err={}", err);
    let is_outbound_pre_flush = {
        let stream = inner.store.get(key);
        stream.role == Some(Role::Outbound) && stream.id.is_none()
    };

    if is_outbound_pre_flush {
        let stream = inner.store.get_mut(key);
        close_without_id(stream);
        for pending in stream.outbound_pending.drain(..) {
            if let Some(tx) = pending.completion {
                let _ = tx.send(Err(err.clone()));
            }
        }
        for tx in stream.close_promises.drain(..) {
            let _ = tx.send(Err(err.clone()));
        }
        if let Some(tx) = stream.setup_completion.take() {
            let _ = tx.send(Err(err.clone()));
        }
        inner.pending_teardown.push_back(key);
        return;
    }

    let stream = inner.store.get_mut(key);
    stream.phase.fail_setup();
    // Spec §4.5 point 4: drop whatever inbound frames were queued while
    // the (now-failed) initializer was running.
    stream.inbound_deferred.clear();
    for pending in stream.outbound_pending.drain(..) {
        if let Some(tx) = pending.completion {
            let _ = tx.send(Err(err.clone()));
        }
    }
    if let Some(tx) = stream.setup_completion.take() {
        let _ = tx.send(Err(err.clone()));
    }
    if let Some(id) = stream.id {
        if !stream.reset_sent {
            inner.outbound.push_back(Frame::from(Reset::new(id, Reason::Cancel)));
            stream.reset_sent = true;
        }
    }
    if let Some(task) = stream.recv_task.take() {
        task.notify();
    }
}

/// Tears down a stream that never acquired a wire id: no `StreamClosed`
/// event will ever arrive for it, so the usual terminal bookkeeping runs
/// synchronously instead of waiting on one.
fn close_without_id(stream: &mut Stream) {
    stream.phase.close();
    stream.inbound_deferred.clear();
    for pending in stream.outbound_pending.drain(..) {
        if let Some(tx) = pending.completion {
            let _ = tx.send(Err(Error::from(UserError::Eof)));
        }
    }
    for tx in stream.close_future_waiters.drain(..) {
        let _ = tx.send(());
    }
}
