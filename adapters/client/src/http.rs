use std::{error::Error as _, fmt, io, str::FromStr, time::Duration};

use serde::Deserialize;
use sweepview_system_poller::{Snapshot, SnapshotSource, TransportError};
use tracing::trace;
use ureq::{Agent, AgentBuilder};

use crate::decode_envelope;

/// Endpoint polled when no configuration is provided.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8585";
/// Opaque request body posted on every poll.
pub const DEFAULT_REQUEST_BODY: &str = "dummy data";
/// Time budget for one request, connection included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Shape of the server's response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    /// The body is the grid text itself.
    Raw,
    /// The body is a JSON envelope carrying the grid and its metadata.
    #[default]
    Enveloped,
}

impl FromStr for ResponseShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "raw" => Ok(Self::Raw),
            "enveloped" => Ok(Self::Enveloped),
            other => Err(format!(
                "unknown response shape `{other}`, expected `raw` or `enveloped`"
            )),
        }
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Enveloped => f.write_str("enveloped"),
        }
    }
}

/// Snapshot source posting to the simulation server over HTTP.
#[derive(Debug)]
pub struct HttpSource {
    agent: Agent,
    endpoint: String,
    request_body: String,
    shape: ResponseShape,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a source polling `endpoint` and decoding `shape` responses.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, shape: ResponseShape) -> Self {
        Self {
            agent: build_agent(DEFAULT_TIMEOUT),
            endpoint: endpoint.into(),
            request_body: DEFAULT_REQUEST_BODY.to_owned(),
            shape,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the opaque body posted on every poll.
    #[must_use]
    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = body.into();
        self
    }

    /// Overrides the per-request time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self.timeout = timeout;
        self
    }

    /// Endpoint the source polls.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, error: ureq::Transport) -> TransportError {
        if is_timeout(&error) {
            TransportError::Timeout {
                after: self.timeout,
            }
        } else {
            TransportError::Connection {
                endpoint: self.endpoint.clone(),
                reason: error.to_string(),
            }
        }
    }
}

impl SnapshotSource for HttpSource {
    fn fetch(&mut self) -> Result<Snapshot, TransportError> {
        trace!(endpoint = %self.endpoint, "requesting snapshot");
        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&self.request_body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(TransportError::Status { code }),
            Err(ureq::Error::Transport(error)) => return Err(self.transport_error(error)),
        };

        let body = response.into_string().map_err(|error| match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout {
                after: self.timeout,
            },
            _ => TransportError::Decode {
                reason: error.to_string(),
            },
        })?;

        match self.shape {
            ResponseShape::Raw => Ok(Snapshot::raw(body)),
            ResponseShape::Enveloped => decode_envelope(&body),
        }
    }
}

fn build_agent(timeout: Duration) -> Agent {
    AgentBuilder::new().timeout(timeout).build()
}

fn is_timeout(error: &ureq::Transport) -> bool {
    let io_timeout = error
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        });
    io_timeout || error.to_string().contains("timed out")
}
