//! Multiplexer configuration.
//!
//! Deliberately a small, enumerated option bag -- spec §9 asks that this
//! not grow into a dynamic key/value store, the way the teacher's
//! `proto::streams::Config` stays a plain struct rather than a generic
//! settings map.

use proto::{
    Mode, DEFAULT_HIGH_WATERMARK, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_LOW_WATERMARK, WindowSize,
};

/// Tunables for a single `Multiplexer` instance.
#[derive(Debug, Clone)]
pub struct Options {
    pub(crate) mode: Mode,

    /// Buffered outbound DATA bytes above which a stream flips unwritable.
    pub(crate) high_watermark: WindowSize,

    /// Buffered outbound DATA bytes at/under which a stream flips writable
    /// again, after having crossed `high_watermark`.
    pub(crate) low_watermark: WindowSize,

    /// Inbound window threshold (spec §4.6): a WINDOW_UPDATE is emitted
    /// once the remaining inbound window drops to half of this value.
    pub(crate) target_window_size: WindowSize,

    /// Initial flow-control window size applied to new streams of either
    /// role; inherited from the teacher's per-connection `Config`.
    pub(crate) initial_window_size: WindowSize,

    /// Caps concurrently active remote-initiated streams; `None` means
    /// unbounded. Inherited from the teacher's `max_remote_initiated`.
    pub(crate) max_concurrent_streams: Option<usize>,
}

impl Options {
    pub fn builder(mode: Mode) -> Builder {
        Builder { options: Options::defaults(mode) }
    }

    fn defaults(mode: Mode) -> Options {
        Options {
            mode,
            high_watermark: DEFAULT_HIGH_WATERMARK,
            low_watermark: DEFAULT_LOW_WATERMARK,
            target_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_concurrent_streams: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// Builds an [`Options`] value one field at a time, defaulting anything
/// left unset -- same shape as the teacher's handshake `Builder`.
#[derive(Debug, Clone)]
pub struct Builder {
    options: Options,
}

impl Builder {
    pub fn high_watermark(&mut self, v: WindowSize) -> &mut Self {
        self.options.high_watermark = v;
        self
    }

    pub fn low_watermark(&mut self, v: WindowSize) -> &mut Self {
        self.options.low_watermark = v;
        self
    }

    pub fn target_window_size(&mut self, v: WindowSize) -> &mut Self {
        self.options.target_window_size = v;
        self
    }

    pub fn initial_window_size(&mut self, v: WindowSize) -> &mut Self {
        self.options.initial_window_size = v;
        self
    }

    pub fn max_concurrent_streams(&mut self, v: usize) -> &mut Self {
        self.options.max_concurrent_streams = Some(v);
        self
    }

    pub fn build(&self) -> Options {
        self.options.clone()
    }
}
