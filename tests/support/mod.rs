//! Shared test scaffolding: an in-memory `ConnectionIo` mock and a
//! minimal synchronous task-context helper.
//!
//! Grounded on `proto::ping_pong`'s own `#[cfg(test)] mod test`
//! `Transport` mock (`Rc<RefCell<Inner>>` queues for from/to-socket
//! traffic), generalized here to also carry `Lifecycle` events since
//! this crate's `ConnectionIo` yields both frames and lifecycle signals
//! (spec §6), not frames alone.

extern crate futures;
extern crate h2mux;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use self::futures::executor::{self, Notify, NotifyHandle};
use self::futures::{Async, AsyncSink, Poll, StartSend};

use h2mux::{ConnEvent, ConnectionIo, Error, Frame};

/// A stubbed connection layer for tests: queues frames/lifecycle events
/// to feed a `Multiplexer`'s `poll_event`, and records whatever it
/// writes back via `start_send`.
#[derive(Clone, Default)]
pub struct MockIo(Rc<RefCell<Inner>>);

#[derive(Default)]
struct Inner {
    inbound: VecDeque<ConnEvent>,
    outbound: VecDeque<Frame>,
    closed: bool,
}

impl MockIo {
    pub fn new() -> MockIo {
        MockIo::default()
    }

    pub fn push_frame<F: Into<Frame>>(&self, frame: F) {
        self.0.borrow_mut().inbound.push_back(ConnEvent::Frame(frame.into()));
    }

    pub fn push_lifecycle(&self, event: h2mux::Lifecycle) {
        self.0.borrow_mut().inbound.push_back(ConnEvent::Lifecycle(event));
    }

    /// Marks the connection as having reached its own end-of-stream;
    /// `poll_event` reports `Ready(None)` once the inbound queue drains.
    pub fn close(&self) {
        self.0.borrow_mut().closed = true;
    }

    pub fn take_outbound(&self) -> Vec<Frame> {
        self.0.borrow_mut().outbound.drain(..).collect()
    }

    pub fn outbound_len(&self) -> usize {
        self.0.borrow().outbound.len()
    }
}

impl ConnectionIo for MockIo {
    fn poll_event(&mut self) -> Poll<Option<ConnEvent>, Error> {
        let mut inner = self.0.borrow_mut();
        if let Some(event) = inner.inbound.pop_front() {
            Ok(Async::Ready(Some(event)))
        } else if inner.closed {
            Ok(Async::Ready(None))
        } else {
            Ok(Async::NotReady)
        }
    }

    fn start_send(&mut self, frame: Frame) -> StartSend<Frame, Error> {
        self.0.borrow_mut().outbound.push_back(frame);
        Ok(AsyncSink::Ready)
    }

    fn poll_complete(&mut self) -> Poll<(), Error> {
        Ok(Async::Ready(()))
    }
}

struct NoopNotify;

impl Notify for NoopNotify {
    fn notify(&self, _id: usize) {}
}

fn noop_handle() -> NotifyHandle {
    NotifyHandle::from(Arc::new(NoopNotify))
}

/// Runs `f` once inside a real `futures` task context, the way every
/// real caller of this crate (an executor-driven connection loop) would
/// -- needed because `Child::read`/`Multiplexer::poll` park a
/// `task::current()` when nothing is ready yet, which panics if called
/// bare outside of a task.
pub fn in_task<F, T>(mut f: F) -> T
where
    F: FnMut() -> T,
{
    let mut spawned = executor::spawn(futures::future::poll_fn(move || {
        Ok::<_, ()>(Async::Ready(f()))
    }));
    match spawned.poll_future_notify(&noop_handle(), 0) {
        Ok(Async::Ready(v)) => v,
        _ => unreachable!("poll_fn future is always immediately ready"),
    }
}

/// `in_task` specialized for a single `Future::poll` call.
pub fn poll_in_task<F>(f: &mut F) -> Poll<F::Item, F::Error>
where
    F: futures::Future,
{
    in_task(|| f.poll())
}

/// `in_task` specialized for a single `Stream::poll` call.
pub fn poll_stream_in_task<S>(s: &mut S) -> Poll<Option<S::Item>, S::Error>
where
    S: futures::Stream,
{
    in_task(|| futures::Stream::poll(s))
}

/// Asserts a `Poll` is `NotReady`, printing the error (if any) via
/// `Debug` rather than requiring `PartialEq` on the success type --
/// several of this crate's `Frame`/`Error` types deliberately don't
/// derive it.
pub fn assert_not_ready<T, E>(p: Poll<T, E>)
where
    E: fmt::Debug,
{
    match p {
        Ok(Async::NotReady) => {}
        Ok(Async::Ready(_)) => panic!("expected NotReady, got Ready"),
        Err(e) => panic!("expected NotReady, got Err({:?})", e),
    }
}

/// Asserts a `Poll` is `Ready`, returning the item.
pub fn assert_ready<T, E>(p: Poll<T, E>) -> T
where
    E: fmt::Debug,
{
    match p {
        Ok(Async::Ready(v)) => v,
        Ok(Async::NotReady) => panic!("expected Ready, got NotReady"),
        Err(e) => panic!("expected Ready, got Err({:?})", e),
    }
}
