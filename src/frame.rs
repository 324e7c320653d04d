//! Typed, already-framed HTTP/2 messages.
//!
//! Byte-level parsing and serialization live in the (out-of-scope) frame
//! codec; this module only describes the shapes the multiplexer consumes
//! and produces. Field sets are pared down to what stream demultiplexing
//! actually inspects -- e.g. `Headers` carries a `HeaderMap` rather than
//! the full pseudo-header / CONTINUATION machinery the wire codec deals
//! with.

use bytes::Bytes;
use http::HeaderMap;

use error::Reason;
use proto::StreamId;

/// An in-memory HTTP/2 frame, already decoded and HPACK-resolved.
#[derive(Debug, Clone)]
pub enum Frame {
    Headers(Headers),
    Data(Data),
    Reset(Reset),
    Priority(Priority),
    Ping(Ping),
    GoAway(GoAway),
    WindowUpdate(WindowUpdate),
    Settings,
}

impl Frame {
    pub fn stream_id(&self) -> StreamId {
        match *self {
            Frame::Headers(ref f) => f.stream_id,
            Frame::Data(ref f) => f.stream_id,
            Frame::Reset(ref f) => f.stream_id,
            Frame::Priority(ref f) => f.stream_id,
            Frame::Ping(_) => StreamId::ZERO,
            Frame::GoAway(_) => StreamId::ZERO,
            Frame::WindowUpdate(ref f) => f.stream_id,
            Frame::Settings => StreamId::ZERO,
        }
    }

    /// Payload bytes charged against flow-control accounting; only DATA
    /// frames carry a non-zero cost (spec §4.4/§4.7).
    pub fn flow_controlled_len(&self) -> usize {
        match *self {
            Frame::Data(ref f) => f.payload.len(),
            _ => 0,
        }
    }

    /// Stamps a locally-created stream's lazily-assigned id onto a frame
    /// that was queued before one existed (spec §4.1).
    pub fn set_stream_id(&mut self, id: StreamId) {
        match *self {
            Frame::Headers(ref mut f) => f.stream_id = id,
            Frame::Data(ref mut f) => f.stream_id = id,
            Frame::Reset(ref mut f) => f.stream_id = id,
            Frame::Priority(ref mut f) => f.stream_id = id,
            Frame::WindowUpdate(ref mut f) => f.stream_id = id,
            Frame::Ping(_) | Frame::GoAway(_) | Frame::Settings => {}
        }
    }

    pub fn is_end_stream(&self) -> bool {
        match *self {
            Frame::Headers(ref f) => f.end_stream,
            Frame::Data(ref f) => f.end_stream,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Headers {
    pub stream_id: StreamId,
    pub fields: HeaderMap,
    pub end_stream: bool,
    /// Distinguishes a trailers block from the initial headers; trailers
    /// cannot open a stream (spec §4.2 tie-break notes).
    pub is_trailers: bool,
}

impl Headers {
    pub fn new(stream_id: StreamId, fields: HeaderMap, end_stream: bool) -> Headers {
        Headers { stream_id, fields, end_stream, is_trailers: false }
    }

    pub fn trailers(stream_id: StreamId, fields: HeaderMap) -> Headers {
        Headers { stream_id, fields, end_stream: true, is_trailers: true }
    }
}

#[derive(Debug, Clone)]
pub struct Data {
    pub stream_id: StreamId,
    pub payload: Bytes,
    pub end_stream: bool,
}

impl Data {
    pub fn new(stream_id: StreamId, payload: Bytes, end_stream: bool) -> Data {
        Data { stream_id, payload, end_stream }
    }
}

#[derive(Debug, Clone)]
pub struct Reset {
    pub stream_id: StreamId,
    pub reason: Reason,
}

impl Reset {
    pub fn new(stream_id: StreamId, reason: Reason) -> Reset {
        Reset { stream_id, reason }
    }
}

/// PRIORITY frames are passed through unchanged on any stream id and
/// never create or touch a stream (spec §3).
#[derive(Debug, Clone)]
pub struct Priority {
    pub stream_id: StreamId,
}

#[derive(Debug, Clone)]
pub struct Ping {
    pub payload: [u8; 8],
    pub ack: bool,
}

#[derive(Debug, Clone)]
pub struct GoAway {
    pub last_stream_id: StreamId,
    pub reason: Reason,
}

#[derive(Debug, Clone)]
pub struct WindowUpdate {
    pub stream_id: StreamId,
    pub increment: u32,
}

impl WindowUpdate {
    pub fn new(stream_id: StreamId, increment: u32) -> WindowUpdate {
        WindowUpdate { stream_id, increment }
    }
}

impl From<Headers> for Frame {
    fn from(src: Headers) -> Frame {
        Frame::Headers(src)
    }
}

impl From<Data> for Frame {
    fn from(src: Data) -> Frame {
        Frame::Data(src)
    }
}

impl From<Reset> for Frame {
    fn from(src: Reset) -> Frame {
        Frame::Reset(src)
    }
}

impl From<WindowUpdate> for Frame {
    fn from(src: WindowUpdate) -> Frame {
        Frame::WindowUpdate(src)
    }
}
