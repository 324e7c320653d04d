//! §4.0 `ConnectionIo`: the trait abstracting "the connection layer" (C).
//!
//! Narrowed from the teacher's `proto::Connection<T, P, B>`, which is a
//! concrete `Stream + Sink` over a `Codec<T, Prioritized<B>>`. Here the
//! codec, HPACK, and socket transport are out of scope (spec §1), so the
//! boundary is pushed out to a trait: production code plugs in the real
//! frame codec, tests plug in an in-memory mock (`tests/support::MockIo`)
//! built the way the teacher's `proto::ping_pong` test `Transport` is built.

use futures::{Poll, StartSend};

use error::Error;
use frame::Frame;
use proto::streams::Lifecycle;

/// One event read off the connection: either a frame addressed to a
/// stream (or the root stream), or an out-of-band lifecycle signal the
/// connection layer reports about a stream it is tracking (spec §6).
#[derive(Debug, Clone)]
pub enum ConnEvent {
    Frame(Frame),
    Lifecycle(Lifecycle),
}

/// The external collaborator a `Multiplexer` is generic over.
pub trait ConnectionIo {
    /// Polls for the next inbound frame or lifecycle event.
    fn poll_event(&mut self) -> Poll<Option<ConnEvent>, Error>;

    /// Queues an outbound frame, in the idiom of `futures::Sink::start_send`.
    fn start_send(&mut self, frame: Frame) -> StartSend<Frame, Error>;

    /// Flushes queued outbound frames, in the idiom of `futures::Sink::poll_complete`.
    fn poll_complete(&mut self) -> Poll<(), Error>;
}
