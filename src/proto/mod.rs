//! Core stream multiplexing machinery: the allocator, the per-stream
//! state machine, flow-control accounting and the shared stream store.

mod stream_id;
pub mod streams;

pub use self::stream_id::{Allocator, Mode, StreamId};

/// A signed token count: outbound bytes buffered but not yet released to
/// the connection layer, or inbound window bytes remaining. Signed because
/// `SETTINGS_INITIAL_WINDOW_SIZE` changes can push it negative (RFC 7540
/// §6.9.2), same rationale as the teacher's `WindowSize` bookkeeping.
pub type WindowSize = i64;

pub const DEFAULT_INITIAL_WINDOW_SIZE: WindowSize = 65_535;
pub const DEFAULT_HIGH_WATERMARK: WindowSize = 64 * 1024;
pub const DEFAULT_LOW_WATERMARK: WindowSize = 32 * 1024;
