//! An HTTP/2 stream multiplexer.
//!
//! This crate demultiplexes a single HTTP/2 connection's framed traffic
//! into independently-managed per-stream processing contexts
//! ([`Child`]), and remultiplexes their outbound writes back onto the
//! connection while respecting concurrent-stream semantics, per-stream
//! flow control, and ordered shutdown.
//!
//! Frame parsing, HPACK, TLS/ALPN and the raw transport are out of
//! scope: [`Multiplexer`] is generic over a [`ConnectionIo`] that
//! abstracts all of that away. Plug in the real codec in production;
//! tests plug in an in-memory mock.
//!
//! # Getting started
//!
//! Construct a [`Multiplexer`] through [`client::new`] or [`server::new`]
//! with an `inbound_initializer` closure run once per peer-opened
//! stream, then drive it as a [`futures::Stream`] the way the caller
//! drives any HTTP/2 connection future -- each item it yields is a frame
//! that isn't M's concern (PING, GOAWAY, SETTINGS, connection-level
//! WINDOW_UPDATE, PRIORITY) and belongs to the surrounding connection
//! layer.
//!
//! Use [`Multiplexer::create_stream`] to open a locally-initiated
//! stream; its wire id is assigned lazily, at the moment its first
//! write is flushed (RFC 7540 §5.1.1 ordering).

#[macro_use]
extern crate log;

extern crate bytes;
extern crate futures;
extern crate http;
extern crate slab;

pub mod child;
pub mod client;
pub mod config;
pub mod connection_io;
pub mod error;
pub mod frame;
mod multiplexer;
mod proto;
pub mod server;

pub use child::{Child, ChildOptions};
pub use config::{Builder as OptionsBuilder, Options};
pub use connection_io::{ConnEvent, ConnectionIo};
pub use error::{Error, Reason, UserError};
pub use frame::Frame;
pub use multiplexer::{Initializer, Multiplexer};
pub use proto::streams::{CloseCause, CreateStreamFuture, Lifecycle};
pub use proto::{Mode, StreamId};
