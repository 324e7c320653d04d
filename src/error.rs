//! Layered error types.
//!
//! Mirrors the split the upstream protocol implementation draws between
//! connection-scoped protocol errors, stream-scoped protocol errors, and
//! local user mistakes: see `Error`, `Reason` and `UserError` below.

use std::fmt;

use proto::StreamId;

/// Reason a stream or connection was reset / closed.
///
/// Corresponds to the small set of RST_STREAM / GOAWAY error codes the
/// multiplexer itself ever has occasion to synthesize or observe. Framing
/// of the full RFC 7540 §7 registry is a connection-layer concern and out
/// of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    NoError,
    Cancel,
    RefusedStream,
    ProtocolError,
    FlowControlError,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Reason::NoError => "no_error",
            Reason::Cancel => "cancel",
            Reason::RefusedStream => "refused_stream",
            Reason::ProtocolError => "protocol_error",
            Reason::FlowControlError => "flow_control_error",
        };
        f.write_str(s)
    }
}

/// A local policy violation: the caller did something the API contract
/// forbids. These are returned on the caller's completion and never fired
/// into a child's inbound pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserError {
    /// A write or read was attempted on a stream that is no longer open.
    IoOnClosedChannel,
    /// `stream_id()` was read on a locally-created stream before its first
    /// flushed write assigned one.
    NoStreamIdAvailable,
    /// Unflushed writes were discarded by a non-error close.
    Eof,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            UserError::IoOnClosedChannel => "operation on closed channel",
            UserError::NoStreamIdAvailable => "no stream id available yet",
            UserError::Eof => "unflushed writes discarded on close",
        };
        f.write_str(s)
    }
}

/// Top-level error type surfaced by the multiplexer.
#[derive(Debug, Clone)]
pub enum Error {
    /// A frame referenced a stream id that is neither open nor known to
    /// have ever been opened.
    NoSuchStream(StreamId),
    /// A stream-scoped protocol event: a remote reset, or a synthesized
    /// reset following setup failure.
    Stream { id: StreamId, reason: Reason },
    /// A connection-scoped error (e.g. observed via GOAWAY bookkeeping in
    /// the connection layer, surfaced here only informationally).
    Connection(Reason),
    /// A local API misuse.
    User(UserError),
}

impl Error {
    pub fn no_such_stream(id: StreamId) -> Error {
        Error::NoSuchStream(id)
    }

    pub fn stream_closed(id: StreamId, reason: Reason) -> Error {
        Error::Stream { id, reason }
    }

    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Error::Stream { .. })
    }
}

impl From<UserError> for Error {
    fn from(src: UserError) -> Error {
        Error::User(src)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::NoSuchStream(id) => write!(f, "no such stream: {:?}", id),
            Error::Stream { id, reason } => write!(f, "stream {:?} closed: {}", id, reason),
            Error::Connection(reason) => write!(f, "connection error: {}", reason),
            Error::User(ref e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}
