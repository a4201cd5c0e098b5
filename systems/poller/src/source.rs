use std::time::Duration;

use thiserror::Error;

/// Raw snapshot obtained from the simulation server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Grid text, one row per line.
    pub body: String,
    /// Robot count announced alongside the grid, if any.
    pub robots: Option<u32>,
    /// Server-declared `(rows, columns)`, if any.
    pub dimensions: Option<(u32, u32)>,
}

impl Snapshot {
    /// Creates a snapshot carrying only grid text.
    #[must_use]
    pub fn raw(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            robots: None,
            dimensions: None,
        }
    }

    /// Attaches a per-snapshot robot count.
    #[must_use]
    pub fn with_robots(mut self, robots: u32) -> Self {
        self.robots = Some(robots);
        self
    }

    /// Attaches server-declared grid dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, rows: u32, columns: u32) -> Self {
        self.dimensions = Some((rows, columns));
        self
    }
}

/// Failure to obtain a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server did not answer in time.
    #[error("request timed out after {after:?}")]
    Timeout {
        /// Time budget that elapsed.
        after: Duration,
    },
    /// The server could not be reached.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// Endpoint that was contacted.
        endpoint: String,
        /// Transport-level description of the failure.
        reason: String,
    },
    /// The server answered with a non-success status.
    #[error("server responded with status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
    },
    /// The response body could not be decoded.
    #[error("malformed response: {reason}")]
    Decode {
        /// Description of the decoding failure.
        reason: String,
    },
    /// The source has nothing left to serve.
    #[error("snapshot source exhausted")]
    Exhausted,
}

/// Producer of snapshots, queried once per poll tick.
pub trait SnapshotSource {
    /// Fetches the next snapshot. Blocks until it arrives or fails.
    fn fetch(&mut self) -> Result<Snapshot, TransportError>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn fetch(&mut self) -> Result<Snapshot, TransportError> {
        (**self).fetch()
    }
}
