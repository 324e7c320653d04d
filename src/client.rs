//! Client-mode entry point: fixes `Mode::Client` for `Multiplexer`
//! construction, the way the teacher's `client` module fixes the client
//! handshake role before handing the caller a `Connection`.
//!
//! Client-initiated streams are assigned odd ids; streams this crate
//! opens inbound (the peer-initiated parity, e.g. a server push in a
//! fuller HTTP/2 stack) get even ones (RFC 7540 §5.1.1).

use child::Child;
use config::{Builder, Options};
use connection_io::ConnectionIo;
use multiplexer::{Initializer, Multiplexer};
use proto::Mode;

/// Starts building client-mode `Options`.
pub fn options() -> Builder {
    Options::builder(Mode::Client)
}

/// Wraps `conn` in a client-mode `Multiplexer`.
pub fn new<C, F>(conn: C, inbound_initializer: F, options: Options) -> Multiplexer<C, F>
where
    C: ConnectionIo,
    F: FnMut(Child) -> Initializer,
{
    Multiplexer::new(Mode::Client, conn, inbound_initializer, options)
}
