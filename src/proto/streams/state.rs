//! §3 `StreamState.phase`: the per-stream state machine.
//!
//! Shaped directly on the upstream crate's HTTP/2 `Open`/`HalfClosed*`/
//! `Closed` state diagram, but coarsened and extended to match this
//! spec's phase set: an inbound stream additionally passes through
//! `SetupPending` while its user initializer runs (§4.5), and a stream
//! whose setup failed sits in `Closing` until the connection layer
//! confirms the reset with a `StreamClosed` lifecycle event (§4.5, §4.6).

use error::Reason;

/// ```not_rust
///                     recv HEADERS (inbound only)
///   idle  ------------------------------------------>  setup-pending
///     \                                                      |
///      \ send HEADERS (outbound)                             | initializer done
///       v                                                    v
///     active  <--------------------------------------------/
///     /    \
///    / recv ES   \ send ES
///   v              v
///  half-closed-remote   half-closed-local
///    \                  /
///     \ send ES/RST    / recv ES/RST
///      v              v
///              closed
///
///  (any phase) -- initializer failure --> closing -- StreamClosed --> closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SetupPending,
    Active,
    HalfClosedLocal,
    HalfClosedRemote,
    Closing,
    Closed,
}

impl Phase {
    pub fn is_setup_pending(&self) -> bool {
        *self == Phase::SetupPending
    }

    pub fn is_active(&self) -> bool {
        *self == Phase::Active
    }

    pub fn is_closed(&self) -> bool {
        *self == Phase::Closed
    }

    /// True once setup has failed and the stream is waiting on the
    /// matching `StreamClosed` event to fully close (§4.5).
    pub fn is_closing(&self) -> bool {
        *self == Phase::Closing
    }

    /// True once the remote half of the stream will send no more frames.
    pub fn is_recv_closed(&self) -> bool {
        matches!(self, Phase::HalfClosedRemote | Phase::Closing | Phase::Closed)
    }

    /// True once the local half of the stream will send no more frames.
    pub fn is_send_closed(&self) -> bool {
        matches!(self, Phase::HalfClosedLocal | Phase::Closing | Phase::Closed)
    }

    /// A user initializer was installed for this stream (inbound or
    /// outbound); holds inbound delivery and outbound release until it
    /// resolves (§4.5).
    pub fn begin_setup(&mut self) {
        if *self == Phase::Idle {
            *self = Phase::SetupPending;
        }
    }

    /// Enter `Active`, e.g. because the initializer completed or because
    /// this is a locally-opened stream that skips setup deferral
    /// entirely.
    pub fn activate(&mut self) {
        if *self == Phase::Idle || *self == Phase::SetupPending {
            *self = Phase::Active;
        }
    }

    /// HEADERS/DATA with END_STREAM observed on the receive side.
    pub fn recv_close(&mut self) {
        *self = match *self {
            Phase::Active => Phase::HalfClosedRemote,
            Phase::HalfClosedLocal => Phase::Closed,
            other => other,
        };
    }

    /// HEADERS/DATA with END_STREAM issued on the send side.
    pub fn send_close(&mut self) {
        *self = match *self {
            Phase::Active => Phase::HalfClosedLocal,
            Phase::HalfClosedRemote => Phase::Closed,
            other => other,
        };
    }

    /// A `StreamClosed` lifecycle event arrived: always terminal,
    /// regardless of prior phase (idempotent per §4.6).
    pub fn close(&mut self) {
        *self = Phase::Closed;
    }

    /// The inbound setup initializer failed: stream is reset but not yet
    /// fully torn down until `StreamClosed` confirms it (§4.5).
    pub fn fail_setup(&mut self) {
        *self = Phase::Closing;
    }
}

impl Default for Phase {
    fn default() -> Phase {
        Phase::Idle
    }
}

/// Synthesized cause recorded when a stream closes, used to decide what
/// (if anything) to fire into the child's inbound pipeline (spec §7).
#[derive(Debug, Clone, Copy)]
pub enum CloseCause {
    /// Clean end-of-stream; no error delivered.
    EndOfStream,
    /// A `StreamClosed(id, reason)` event arrived with an explicit reason.
    Reset(Reason),
}
