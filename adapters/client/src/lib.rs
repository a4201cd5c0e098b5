#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Snapshot sources backed by the outside world.
//!
//! [`HttpSource`] polls the simulation server, [`ReplaySource`] steps through
//! a simulation dump on disk. Both implement
//! [`sweepview_system_poller::SnapshotSource`].

mod envelope;
mod http;
mod replay;

pub use envelope::decode_envelope;
pub use http::{HttpSource, ResponseShape, DEFAULT_ENDPOINT, DEFAULT_REQUEST_BODY, DEFAULT_TIMEOUT};
pub use replay::ReplaySource;
