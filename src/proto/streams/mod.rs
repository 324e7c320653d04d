//! Per-stream state machine, storage, flow-control accounting, and the
//! shared engine (`Streams`) that ties them together: §4.2 inbound
//! router, §4.4 outbound collector, §4.6 lifecycle coordinator.

mod flow_control;
mod state;
mod store;
mod stream;
mod streams;

pub use self::state::{CloseCause, Phase};
pub use self::store::Key;
pub use self::stream::Role;
pub use self::streams::{CreateStreamFuture, Ingested, Lifecycle, Streams};
