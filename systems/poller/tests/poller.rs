use std::{collections::VecDeque, time::Duration};

use glam::Vec3;
use sweepview_core::{CellCoord, EntityType, GenerationId, ParseError};
use sweepview_rendering::{VisualHandle, VisualRegistry};
use sweepview_rendering_headless::HeadlessBackend;
use sweepview_scene::Reconciler;
use sweepview_system_parser::Parser;
use sweepview_system_planner::Planner;
use sweepview_system_poller::{
    CancelToken, Config, Observer, PollState, Poller, Snapshot, SnapshotSource, TickOutcome,
    TickReport, TickStats, TransportError,
};

struct ScriptedSource {
    script: VecDeque<Result<Snapshot, TransportError>>,
}

impl ScriptedSource {
    fn new(script: impl IntoIterator<Item = Result<Snapshot, TransportError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl SnapshotSource for ScriptedSource {
    fn fetch(&mut self) -> Result<Snapshot, TransportError> {
        self.script.pop_front().unwrap_or(Err(TransportError::Exhausted))
    }
}

fn poller_with(
    config: Config,
    backend: HeadlessBackend,
    script: impl IntoIterator<Item = Result<Snapshot, TransportError>>,
) -> Poller<ScriptedSource, HeadlessBackend> {
    Poller::new(
        config,
        ScriptedSource::new(script),
        Parser::default(),
        Planner::new(sweepview_system_planner::Config::default()),
        Reconciler::new(backend),
    )
}

fn poller(
    script: impl IntoIterator<Item = Result<Snapshot, TransportError>>,
) -> Poller<ScriptedSource, HeadlessBackend> {
    poller_with(Config::new(Duration::ZERO, 2), backend(), script)
}

fn backend() -> HeadlessBackend {
    HeadlessBackend::new(VisualRegistry::builtin()).expect("builtin registry is complete")
}

fn expect_committed(report: &TickReport) -> (usize, usize) {
    match &report.outcome {
        TickOutcome::Committed {
            materialized,
            destroyed,
            ..
        } => (*materialized, *destroyed),
        other => panic!("expected a commit, got {other:?}"),
    }
}

#[test]
fn two_by_two_snapshot_commits_expected_entities() {
    let mut poller = poller([Ok(Snapshot::raw("0 0\nX S"))]);

    let report = poller.tick();

    assert_eq!(expect_committed(&report), (7, 0));
    let live = poller.reconciler().live();
    assert_eq!(live.count(EntityType::Floor), 4);
    assert_eq!(live.count(EntityType::Obstacle), 1);
    assert_eq!(live.count(EntityType::Robot), 2);
    assert_eq!(live.count(EntityType::Trash), 0);
    for placed in live.entities() {
        match placed.instruction.entity {
            EntityType::Obstacle => assert_eq!(placed.instruction.cell, CellCoord::new(0, 1)),
            EntityType::Robot => assert_eq!(placed.instruction.cell, CellCoord::new(1, 1)),
            _ => {}
        }
    }
    assert_eq!(poller.state(), PollState::Idle);
}

#[test]
fn fetch_timeout_keeps_the_live_generation() {
    let mut poller = poller([
        Ok(Snapshot::raw("0 3\nX S")),
        Err(TransportError::Timeout {
            after: Duration::from_secs(2),
        }),
    ]);
    let mut stats = TickStats::default();

    let first = poller.tick();
    let committed = poller.reconciler().live().len();
    let generation = poller.reconciler().live().id();
    let second = poller.tick();

    for report in [&first, &second] {
        stats.on_tick(report);
    }
    assert_eq!(second.outcome.state(), PollState::FetchFailed);
    assert_eq!(poller.reconciler().live().len(), committed);
    assert_eq!(poller.reconciler().live().id(), generation);
    assert_eq!(poller.reconciler().backend().live_count(), committed);
    assert_eq!(stats.transport_errors, 1);
    assert_eq!(stats.commits, 1);
}

#[test]
fn out_of_range_stack_aborts_only_that_tick() {
    let mut poller = poller([
        Ok(Snapshot::raw("0 X")),
        Ok(Snapshot::raw("0 9")),
        Ok(Snapshot::raw("S P")),
    ]);

    let _ = expect_committed(&poller.tick());
    let before = poller.reconciler().live().clone();

    let discarded = poller.tick();
    assert_eq!(
        discarded.outcome,
        TickOutcome::Discarded(ParseError::OutOfRangeStack {
            cell: CellCoord::new(1, 0),
            value: 9,
        })
    );
    assert_eq!(poller.reconciler().live(), &before);

    let (materialized, destroyed) = expect_committed(&poller.tick());
    assert_eq!(destroyed, before.len());
    assert_eq!(materialized, 5);
    assert_eq!(poller.reconciler().live().id(), GenerationId::new(2));
}

#[test]
fn server_row_count_off_by_one_still_commits() {
    let snapshot = Snapshot::raw("'1' '0' 'P'\n'0' '0' '0'")
        .with_robots(5)
        .with_dimensions(3, 3);
    let mut poller = poller([Ok(snapshot)]);

    let report = poller.tick();

    match report.outcome {
        TickOutcome::Committed { rows, columns, .. } => assert_eq!((rows, columns), (2, 3)),
        other => panic!("expected a commit, got {other:?}"),
    }
    let live = poller.reconciler().live();
    assert_eq!(live.count(EntityType::Floor), 6);
    assert_eq!(live.count(EntityType::Trash), 1);
    assert_eq!(live.count(EntityType::Trashcan), 1);
}

#[test]
fn strict_dimensions_discard_mismatched_grids() {
    let config = Config::new(Duration::ZERO, 2).with_strict_dimensions(true);
    let mut poller = poller_with(
        config,
        backend(),
        [Ok(Snapshot::raw("0 0\n0 0").with_dimensions(3, 2))],
    );

    let report = poller.tick();

    assert!(matches!(
        report.outcome,
        TickOutcome::Discarded(ParseError::DimensionMismatch { .. })
    ));
    assert!(poller.reconciler().live().is_empty());
}

#[test]
fn announced_robot_count_overrides_configuration() {
    let mut poller = poller([
        Ok(Snapshot::raw("S 0").with_robots(5)),
        Ok(Snapshot::raw("S 0")),
    ]);

    let _ = poller.tick();
    assert_eq!(poller.reconciler().live().count(EntityType::Robot), 5);

    let _ = poller.tick();
    assert_eq!(poller.reconciler().live().count(EntityType::Robot), 2);
}

#[test]
fn announced_robot_count_is_capped_per_spawn_cell() {
    let mut poller = poller([Ok(Snapshot::raw("S 0\n0 S").with_robots(4_000_000_000))]);

    let report = poller.tick();

    assert_eq!(expect_committed(&report), (4 + 2 * 8, 0));
    assert_eq!(poller.reconciler().live().count(EntityType::Robot), 16);
}

#[test]
fn anomalies_and_reconcile_failures_are_reported_without_aborting() {
    let backend = backend().with_rejected_visual(VisualHandle::new("trashcan"));
    let mut poller = poller_with(
        Config::new(Duration::ZERO, 1).with_max_ticks(2),
        backend,
        [Ok(Snapshot::raw("? P\n0 X"))],
    );
    let mut stats = TickStats::default();

    let completed = poller.run(&CancelToken::new(), &mut stats);

    assert_eq!(completed, 2);
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.anomalies, 1);
    assert_eq!(stats.reconcile_failures, 1);
    assert_eq!(stats.transport_errors, 1);
    assert_eq!(poller.reconciler().live().count(EntityType::Obstacle), 1);
}

#[test]
fn run_honours_the_tick_limit() {
    let snapshots = (0..5).map(|_| Ok(Snapshot::raw("1 2\n3 4")));
    let mut poller = poller_with(
        Config::new(Duration::ZERO, 1).with_max_ticks(3),
        backend(),
        snapshots,
    );
    let mut stats = TickStats::default();

    let completed = poller.run(&CancelToken::new(), &mut stats);

    assert_eq!(completed, 3);
    assert_eq!(poller.ticks(), 3);
    assert_eq!(stats.commits, 3);
    assert_eq!(stats.last_generation, Some(GenerationId::new(3)));
    assert_eq!(poller.reconciler().live().count(EntityType::Trash), 10);
}

#[test]
fn cancelled_token_prevents_any_tick() {
    let mut poller = poller([Ok(Snapshot::raw("0"))]);
    let cancel = CancelToken::new();
    cancel.cancel();

    assert_eq!(poller.run(&cancel, TickStats::default()), 0);
    assert_eq!(poller.ticks(), 0);
    assert!(poller.reconciler().live().is_empty());
}

#[test]
fn cancellation_is_honoured_after_the_running_tick_commits() {
    let snapshots = (0..10).map(|_| Ok(Snapshot::raw("0 X")));
    let mut poller = poller_with(
        Config::new(Duration::from_secs(30), 1),
        backend(),
        snapshots,
    );
    let cancel = CancelToken::new();
    let trigger = cancel.clone();

    let completed = poller.run_with(&cancel, TickStats::default(), |reconciler, report| {
        assert_eq!(reconciler.live().len(), 3, "commit finished before cancellation");
        if report.tick == 1 {
            trigger.cancel();
        }
    });

    assert_eq!(completed, 1);
    assert_eq!(poller.reconciler().live().id(), GenerationId::new(1));
}

#[test]
fn fixtures_survive_repeated_polling() {
    let mut backend = backend();
    let camera = backend.spawn_fixture("camera", Vec3::new(0.0, 20.0, 0.0));
    let mut poller = poller_with(
        Config::new(Duration::ZERO, 1).with_max_ticks(4),
        backend,
        (0..4).map(|_| Ok(Snapshot::raw("X S P 2"))),
    );

    let _ = poller.run(&CancelToken::new(), TickStats::default());

    let backend = poller.reconciler().backend();
    assert!(backend.entity(camera).is_some());
    assert_eq!(
        backend.live_count(),
        poller.reconciler().live().len() + 1,
        "only the fixture lives outside the generation"
    );
}
