#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Snapshot poller driving the fetch, parse, plan and commit cycle.
//!
//! Each tick runs to completion before the next begins. Fetching is the only
//! blocking step and never touches the live generation. Transport and parse
//! failures discard the tick and leave the previously committed scene in
//! place. Cancellation is honoured only between ticks.

mod observer;
mod source;

use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::{Duration, Instant},
};

use sweepview_core::{Grid, ParseError};
use sweepview_rendering::RenderingBackend;
use sweepview_scene::Reconciler;
use sweepview_system_parser::{verify_dimensions, Parser};
use sweepview_system_planner::Planner;
use tracing::{debug, info, trace, warn};

pub use observer::{Observer, TickOutcome, TickReport, TickStats, TracingObserver};
pub use source::{Snapshot, SnapshotSource, TransportError};

/// Delay between tick starts used when no configuration is provided.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Phase of the poll cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// Waiting for the snapshot source.
    Fetching,
    /// Parsing, planning and committing a fetched snapshot.
    Applying,
    /// The fetch failed and the tick is being discarded.
    FetchFailed,
}

/// Configuration parameters required to construct the poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    interval: Duration,
    robots_per_spawn: u32,
    max_ticks: Option<u64>,
    strict_dimensions: bool,
}

impl Config {
    /// Creates a configuration polling at `interval` and placing
    /// `robots_per_spawn` robots on every spawn cell unless the snapshot
    /// announces its own count.
    #[must_use]
    pub const fn new(interval: Duration, robots_per_spawn: u32) -> Self {
        Self {
            interval,
            robots_per_spawn,
            max_ticks: None,
            strict_dimensions: false,
        }
    }

    /// Stops [`Poller::run`] after the provided number of ticks.
    #[must_use]
    pub const fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Discards snapshots whose parsed size disagrees with the dimensions
    /// the source announced. When off, the mismatch is logged and the grid
    /// is committed as parsed.
    #[must_use]
    pub const fn with_strict_dimensions(mut self, strict: bool) -> Self {
        self.strict_dimensions = strict;
        self
    }

    /// Delay between tick starts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, 1)
    }
}

/// Cooperative cancellation flag shared between the poll loop and its owner.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes any waiting loop.
    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        signal.notify_all();
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for up to `timeout`, returning early when cancelled.
    ///
    /// Returns `true` when cancellation was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = signal
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Poll loop feeding snapshots through the parser, planner and reconciler.
#[derive(Debug)]
pub struct Poller<S, B> {
    config: Config,
    source: S,
    parser: Parser,
    planner: Planner,
    reconciler: Reconciler<B>,
    state: PollState,
    ticks: u64,
}

impl<S, B> Poller<S, B>
where
    S: SnapshotSource,
    B: RenderingBackend,
{
    /// Creates a poller from its collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        source: S,
        parser: Parser,
        planner: Planner,
        reconciler: Reconciler<B>,
    ) -> Self {
        Self {
            config,
            source,
            parser,
            planner,
            reconciler,
            state: PollState::Idle,
            ticks: 0,
        }
    }

    /// Current phase of the cycle. Always [`PollState::Idle`] between ticks.
    #[must_use]
    pub const fn state(&self) -> PollState {
        self.state
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Reconciler owning the live generation.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler<B> {
        &self.reconciler
    }

    /// Mutable access to the reconciler between ticks.
    pub fn reconciler_mut(&mut self) -> &mut Reconciler<B> {
        &mut self.reconciler
    }

    /// Runs one complete fetch and apply cycle.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let tick = self.ticks;

        self.transition(PollState::Fetching);
        let outcome = match self.source.fetch() {
            Ok(snapshot) => {
                self.transition(PollState::Applying);
                self.apply(&snapshot)
            }
            Err(error) => {
                self.transition(PollState::FetchFailed);
                TickOutcome::FetchFailed(error)
            }
        };
        self.transition(PollState::Idle);

        TickReport { tick, outcome }
    }

    /// Runs ticks at the configured interval until cancelled or until the
    /// configured tick limit is reached. Returns the number of ticks run.
    pub fn run<O: Observer>(&mut self, cancel: &CancelToken, observer: O) -> u64 {
        self.run_with(cancel, observer, |_, _| {})
    }

    /// Like [`Poller::run`], additionally handing the reconciler to
    /// `between_ticks` after every tick has been observed.
    pub fn run_with<O, F>(
        &mut self,
        cancel: &CancelToken,
        mut observer: O,
        mut between_ticks: F,
    ) -> u64
    where
        O: Observer,
        F: FnMut(&mut Reconciler<B>, &TickReport),
    {
        let limit = self.config.max_ticks;
        let exhausted = |completed: u64| limit.is_some_and(|limit| completed >= limit);
        let mut completed = 0;
        info!(interval = ?self.config.interval, "snapshot poller started");
        while !cancel.is_cancelled() && !exhausted(completed) {
            let started = Instant::now();
            let report = self.tick();
            observer.on_tick(&report);
            between_ticks(&mut self.reconciler, &report);
            completed += 1;
            if exhausted(completed) {
                break;
            }

            let remaining = self.config.interval.saturating_sub(started.elapsed());
            if !remaining.is_zero() && cancel.wait(remaining) {
                break;
            }
        }
        info!(ticks = completed, "snapshot poller stopped");
        completed
    }

    fn apply(&mut self, snapshot: &Snapshot) -> TickOutcome {
        let grid = match self.parse(snapshot) {
            Ok(grid) => grid,
            Err(error) => return TickOutcome::Discarded(error),
        };

        let robots = snapshot.robots.unwrap_or(self.config.robots_per_spawn);
        let plan = self.planner.plan(&grid, robots);
        debug!(
            instructions = plan.instructions.len(),
            anomalies = plan.anomalies.len(),
            lattice_cells = plan.lattice_cells.len(),
            "planned snapshot"
        );
        let report = self.reconciler.commit(&plan.instructions);

        TickOutcome::Committed {
            generation: report.generation,
            rows: grid.rows(),
            columns: grid.columns(),
            materialized: report.materialized,
            destroyed: report.destroyed,
            anomalies: plan.anomalies,
            failures: report.failures,
        }
    }

    fn parse(&self, snapshot: &Snapshot) -> Result<Grid, ParseError> {
        let grid = self.parser.parse(&snapshot.body)?;
        let Some((rows, columns)) = snapshot.dimensions else {
            return Ok(grid);
        };
        match verify_dimensions(&grid, rows, columns) {
            Err(error) if !self.config.strict_dimensions => {
                warn!(%error, "announced dimensions disagree with the grid, committing as parsed");
                Ok(grid)
            }
            verified => verified.map(|()| grid),
        }
    }

    fn transition(&mut self, next: PollState) {
        trace!(tick = self.ticks, from = ?self.state, to = ?next, "poll state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_token_wakes_waiters_immediately() {
        let token = CancelToken::new();
        let remote = token.clone();
        remote.cancel();

        let started = Instant::now();
        assert!(token.wait(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn uncancelled_wait_times_out() {
        let token = CancelToken::new();

        assert!(!token.wait(Duration::from_millis(5)));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn outcome_state_reflects_the_failed_phase() {
        let fetch = TickOutcome::FetchFailed(TransportError::Exhausted);
        let parse = TickOutcome::Discarded(ParseError::EmptyInput);

        assert_eq!(fetch.state(), PollState::FetchFailed);
        assert_eq!(parse.state(), PollState::Applying);
    }
}
