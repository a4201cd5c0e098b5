#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line viewer that polls a cleaning-robot simulation and keeps a
//! headless scene in step with its snapshots.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as _;
use glam::Vec3;
use sweepview_client::{HttpSource, ReplaySource, ResponseShape};
use sweepview_rendering::{CameraRig, VisualRegistry};
use sweepview_rendering_headless::{CellLayout, HeadlessBackend};
use sweepview_scene::Reconciler;
use sweepview_system_parser::Parser;
use sweepview_system_planner::Planner;
use sweepview_system_poller::{
    CancelToken, Poller, SnapshotSource, TickOutcome, TickStats, TracingObserver,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ViewerConfig, DEFAULT_CONFIG_PATH};

const LIGHT_POSITION: Vec3 = Vec3::new(0.0, 50.0, 0.0);

/// Polls a simulation server and mirrors each snapshot into the scene.
#[derive(Debug, clap::Parser)]
#[command(name = "sweepview", version, about, long_about = None)]
struct CliArgs {
    /// Configuration file. `sweepview.toml` is used when present.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Simulation server endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Shape of the server response (`raw` or `enveloped`).
    #[arg(long, value_name = "SHAPE")]
    response_shape: Option<ResponseShape>,

    /// Delay between poll ticks in milliseconds.
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Robots placed on every spawn cell when the snapshot does not say.
    #[arg(long)]
    robots: Option<u32>,

    /// Seed for trash scattering.
    #[arg(long)]
    seed: Option<u64>,

    /// Replay a simulation dump instead of polling the server.
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,

    /// Print a per-cell summary of the scene after every commit.
    #[arg(long)]
    dump: bool,
}

impl CliArgs {
    fn apply_overrides(&self, config: &mut ViewerConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.server.endpoint.clone_from(endpoint);
        }
        if let Some(shape) = self.response_shape {
            config.server.response_shape = shape;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.poll.interval_ms = interval_ms;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.poll.max_ticks = Some(max_ticks);
        }
        if let Some(robots) = self.robots {
            config.robots.per_spawn_cell = robots;
        }
        if let Some(seed) = self.seed {
            config.trash.seed = Some(seed);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sweepview=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    let registry = match &config.visuals.manifest {
        Some(path) => VisualRegistry::from_manifest_path(path)?,
        None => VisualRegistry::builtin(),
    };
    let mut backend = HeadlessBackend::new(registry).context("rendering backend unavailable")?;
    let mut rig = CameraRig::new(config.camera_config());
    let camera = backend.spawn_fixture("camera", rig.position());
    let _ = backend.spawn_fixture("light", LIGHT_POSITION);

    let source = snapshot_source(&args, &config)?;
    let mut poller = Poller::new(
        config.poller_config(),
        source,
        Parser::new(config.parser_config()),
        Planner::new(config.planner_config()),
        Reconciler::new(backend),
    );

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || interrupt.cancel())
        .context("failed to install the interrupt handler")?;

    let layout = CellLayout {
        origin: config.layout.origin(),
        cell_span: config.layout.cell_span,
    };
    let mut framed = None;
    let mut stats = TickStats::default();
    let ticks = poller.run_with(
        &cancel,
        (TracingObserver, &mut stats),
        |reconciler, report| {
            let TickOutcome::Committed { rows, columns, .. } = report.outcome else {
                return;
            };
            if framed != Some((rows, columns)) {
                rig.frame_grid(layout.origin, layout.cell_span, rows, columns);
                let _ = reconciler.backend_mut().set_position(camera, rig.position());
                debug!(rows, columns, zoom = rig.zoom(), "camera framed over grid");
                framed = Some((rows, columns));
            }
            if args.dump {
                println!("{}", reconciler.backend().render_frame(layout));
            }
        },
    );

    let generation = poller.reconciler().live().id();
    let destroyed = poller.reconciler_mut().clear();
    info!(
        ticks,
        commits = stats.commits,
        transport_errors = stats.transport_errors,
        parse_errors = stats.parse_errors,
        anomalies = stats.anomalies,
        reconcile_failures = stats.reconcile_failures,
        %generation,
        destroyed,
        "viewer stopped"
    );
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<ViewerConfig> {
    let (path, required) = match &args.config {
        Some(path) => (path.as_path(), true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    let mut config = ViewerConfig::load(path, required)?;
    args.apply_overrides(&mut config);
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    info!(
        path = %path.display(),
        endpoint = %config.server.endpoint,
        shape = %config.server.response_shape,
        interval_ms = config.poll.interval_ms,
        "configuration loaded"
    );
    Ok(config)
}

fn snapshot_source(args: &CliArgs, config: &ViewerConfig) -> Result<Box<dyn SnapshotSource>> {
    if let Some(path) = &args.replay {
        let replay = ReplaySource::from_path(path)?;
        info!(path = %path.display(), steps = replay.len(), "replaying simulation dump");
        return Ok(Box::new(replay));
    }

    let source = HttpSource::new(
        config.server.endpoint.as_str(),
        config.server.response_shape,
    )
    .with_request_body(config.server.request_body.as_str())
    .with_timeout(config.request_timeout());
    info!(endpoint = source.endpoint(), "polling simulation server");
    Ok(Box::new(source))
}
