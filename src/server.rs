//! Server-mode entry point: fixes `Mode::Server` for `Multiplexer`
//! construction, the way the teacher's `server` module fixes the server
//! handshake role before handing the caller a `Connection`.
//!
//! Server-initiated streams are assigned even ids; streams opened
//! inbound (the client-initiated parity) get odd ones (RFC 7540 §5.1.1).

use child::Child;
use config::{Builder, Options};
use connection_io::ConnectionIo;
use multiplexer::{Initializer, Multiplexer};
use proto::Mode;

/// Starts building server-mode `Options`.
pub fn options() -> Builder {
    Options::builder(Mode::Server)
}

/// Wraps `conn` in a server-mode `Multiplexer`.
pub fn new<C, F>(conn: C, inbound_initializer: F, options: Options) -> Multiplexer<C, F>
where
    C: ConnectionIo,
    F: FnMut(Child) -> Initializer,
{
    Multiplexer::new(Mode::Server, conn, inbound_initializer, options)
}
