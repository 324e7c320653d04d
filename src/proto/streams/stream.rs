//! §3 `StreamState`: the attributes the spec assigns to a single stream,
//! collected into one struct the way the teacher collects them into its
//! (upstream, not carried into this pack) `proto::streams::stream::Stream`
//! -- referenced throughout `store.rs`/`streams.rs` by the fields this
//! module now supplies: `id`, flow/window counters, and queueing state.

use std::collections::VecDeque;

use futures::sync::oneshot;
use futures::{task, Future};

use error::Error;
use frame::Frame;
use proto::StreamId;

use super::flow_control::{InboundWindow, Watermark};
use super::state::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Inbound,
    Outbound,
}

pub type Completion = oneshot::Sender<Result<(), Error>>;

/// A single queued outbound write: the frame plus the caller's
/// completion slot, satisfied once the frame actually leaves M (or fails
/// if the stream closes first). Spec §3 `outbound_pending`.
pub struct PendingWrite {
    pub frame: Frame,
    pub completion: Option<Completion>,
}

#[derive(Default)]
pub struct Stream {
    pub id: Option<StreamId>,
    pub role: Option<Role>,
    pub phase: Phase,

    pub inbound_deferred: VecDeque<Frame>,
    pub outbound_pending: VecDeque<PendingWrite>,

    pub watermark: Option<Watermark>,
    pub inbound_window: Option<InboundWindow>,

    pub autoread: bool,
    pub read_pending: bool,

    /// Set by the lifecycle coordinator when a `StreamClosed` event
    /// carries a reset reason; consumed exactly once by the next
    /// `Child::poll_read` so the error reaches the child's inbound side
    /// (spec §4.6/§7) instead of a silent end-of-stream.
    pub close_error: Option<Error>,

    /// True once a `RST_STREAM(CANCEL)` has been queued for this stream
    /// via a local `close()` call -- ensures exactly one is ever sent
    /// (spec testable property 4).
    pub reset_sent: bool,

    pub close_promises: Vec<Completion>,

    /// Distinct from `close_promises`: satisfied with `Ok(())` exactly
    /// once the stream reaches `Closed`, regardless of the reason -- the
    /// child's `close_future()` "never fails" even though individual
    /// `close()` call promises may (spec §4.6).
    pub close_future_waiters: Vec<oneshot::Sender<()>>,

    /// Parked by `Child::poll_read` when `inbound_deferred` is empty;
    /// woken once a frame is queued or the stream closes, the way a
    /// `RecvStream::poll_data` caller is woken in the upstream crate.
    pub recv_task: Option<task::Task>,

    /// The user's setup initializer, driven to completion by the
    /// multiplexer's event loop (spec §4.5). `None` once resolved.
    pub initializer: Option<Box<Future<Item = (), Error = Error>>>,

    /// True for the current parent read burst once this stream has
    /// received at least one frame -- drives `channel_read_complete`
    /// fan-out (spec §4.3/§8 invariant 7).
    pub saw_frame_this_burst: bool,

    /// Incremented once per burst in which `saw_frame_this_burst` was
    /// set, by `Streams::end_of_burst`. Child-visible counter standing in
    /// for the handler-chain `channelReadComplete` callback the spec
    /// assumes but this crate has no handler-chain to fire it through.
    pub read_complete_events: u32,

    /// Fires with the outcome of `create_stream`'s setup initializer
    /// (spec §4.5/§6: `create_stream(initializer) -> (Child, completion)`).
    /// `None` for inbound streams, which have no caller-visible creation
    /// completion.
    pub setup_completion: Option<Completion>,
}

impl Stream {
    pub fn new(role: Role) -> Stream {
        Stream { role: Some(role), autoread: true, ..Default::default() }
    }

    pub fn is_writable(&self, parent_writable: bool) -> bool {
        // Pre-activation (no id yet) bypasses only the parent factor
        // (spec §4.7); the stream's own watermark still applies.
        let parent_factor = self.id.is_none() || parent_writable;
        parent_factor && self.watermark.map_or(true, |w| w.is_writable())
    }
}

impl Default for Role {
    fn default() -> Role {
        Role::Inbound
    }
}
