use sweepview_core::{GenerationId, ParseError, PlacementAnomaly};
use sweepview_scene::ReconcileError;
use tracing::{error, info, warn};

use crate::{PollState, TransportError};

/// Result of a single poll tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// A new generation went live.
    Committed {
        /// Generation that went live.
        generation: GenerationId,
        /// Row count of the committed grid.
        rows: u32,
        /// Column count of the committed grid.
        columns: u32,
        /// Number of entities realised for the generation.
        materialized: usize,
        /// Number of entities of the previous generation torn down.
        destroyed: usize,
        /// Cells that only received a floor tile.
        anomalies: Vec<PlacementAnomaly>,
        /// Instructions that could not be realised.
        failures: Vec<ReconcileError>,
    },
    /// The snapshot could not be fetched; the live generation was retained.
    FetchFailed(TransportError),
    /// The snapshot was discarded; the live generation was retained.
    Discarded(ParseError),
}

impl TickOutcome {
    /// Terminal state the tick reached before returning to idle.
    #[must_use]
    pub const fn state(&self) -> PollState {
        match self {
            Self::FetchFailed(_) => PollState::FetchFailed,
            Self::Committed { .. } | Self::Discarded(_) => PollState::Applying,
        }
    }
}

/// Report handed to observers after every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// One-based tick counter.
    pub tick: u64,
    /// What the tick achieved.
    pub outcome: TickOutcome,
}

/// Collaborator notified of every tick outcome.
pub trait Observer {
    /// Receives the report of a completed tick.
    fn on_tick(&mut self, report: &TickReport);
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_tick(&mut self, report: &TickReport) {
        (**self).on_tick(report);
    }
}

impl<A: Observer, B: Observer> Observer for (A, B) {
    fn on_tick(&mut self, report: &TickReport) {
        self.0.on_tick(report);
        self.1.on_tick(report);
    }
}

/// Observer that logs every outcome through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_tick(&mut self, report: &TickReport) {
        let tick = report.tick;
        match &report.outcome {
            TickOutcome::Committed {
                generation,
                rows,
                columns,
                materialized,
                anomalies,
                failures,
                ..
            } => {
                for anomaly in anomalies {
                    warn!(tick, %generation, "{anomaly}");
                }
                for failure in failures {
                    error!(tick, %generation, error = %failure, "placement failed");
                }
                info!(tick, %generation, rows, columns, materialized, "snapshot applied");
            }
            TickOutcome::FetchFailed(error) => {
                warn!(tick, error = %error, "fetch failed, keeping previous scene");
            }
            TickOutcome::Discarded(error) => {
                warn!(tick, error = %error, "snapshot discarded, keeping previous scene");
            }
        }
    }
}

/// Observer that counts outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks observed.
    pub ticks: u64,
    /// Ticks that committed a generation.
    pub commits: u64,
    /// Ticks lost to transport failures.
    pub transport_errors: u64,
    /// Ticks whose snapshot failed to parse.
    pub parse_errors: u64,
    /// Cells reported as anomalies across all commits.
    pub anomalies: u64,
    /// Instructions that failed to materialise across all commits.
    pub reconcile_failures: u64,
    /// Most recently committed generation.
    pub last_generation: Option<GenerationId>,
}

impl Observer for TickStats {
    fn on_tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        match &report.outcome {
            TickOutcome::Committed {
                generation,
                anomalies,
                failures,
                ..
            } => {
                self.commits += 1;
                self.anomalies += anomalies.len() as u64;
                self.reconcile_failures += failures.len() as u64;
                self.last_generation = Some(*generation);
            }
            TickOutcome::FetchFailed(_) => self.transport_errors += 1,
            TickOutcome::Discarded(_) => self.parse_errors += 1,
        }
    }
}
