//! Viewer configuration loaded from `sweepview.toml`.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use glam::Vec2;
use serde::Deserialize;
use sweepview_client::{ResponseShape, DEFAULT_ENDPOINT, DEFAULT_REQUEST_BODY};
use sweepview_rendering::CameraConfig;
use sweepview_system_parser::DEFAULT_QUOTE_CHARS;
use sweepview_system_planner as planner;
use sweepview_system_poller as poller;
use thiserror::Error;

/// Configuration file looked up when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "sweepview.toml";

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML for the schema.
    #[error("failed to parse configuration at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// A value is outside of its accepted range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ViewerConfig {
    pub(crate) server: ServerConfig,
    pub(crate) poll: PollConfig,
    pub(crate) layout: LayoutConfig,
    pub(crate) trash: TrashConfig,
    pub(crate) robots: RobotConfig,
    pub(crate) parser: ParserConfig,
    pub(crate) camera: CameraSection,
    pub(crate) visuals: VisualsConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) endpoint: String,
    pub(crate) request_body: String,
    pub(crate) response_shape: ResponseShape,
    pub(crate) timeout_ms: u64,
    pub(crate) strict_dimensions: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            request_body: DEFAULT_REQUEST_BODY.to_owned(),
            response_shape: ResponseShape::default(),
            timeout_ms: 2_000,
            strict_dimensions: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PollConfig {
    pub(crate) interval_ms: u64,
    pub(crate) max_ticks: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: poller::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            max_ticks: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LayoutConfig {
    pub(crate) origin_x: f32,
    pub(crate) origin_z: f32,
    pub(crate) cell_span: f32,
    pub(crate) occupant_elevation: f32,
    pub(crate) trash_elevation: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: planner::DEFAULT_ORIGIN.x,
            origin_z: planner::DEFAULT_ORIGIN.y,
            cell_span: planner::DEFAULT_CELL_SPAN,
            occupant_elevation: planner::DEFAULT_OCCUPANT_ELEVATION,
            trash_elevation: planner::DEFAULT_TRASH_ELEVATION,
        }
    }
}

impl LayoutConfig {
    pub(crate) fn origin(&self) -> Vec2 {
        Vec2::new(self.origin_x, self.origin_z)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TrashConfig {
    pub(crate) min_separation: f32,
    pub(crate) max_retries: u32,
    pub(crate) footprint: f32,
    pub(crate) seed: Option<u64>,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            min_separation: planner::DEFAULT_MIN_TRASH_SEPARATION,
            max_retries: planner::DEFAULT_MAX_SAMPLING_RETRIES,
            footprint: planner::DEFAULT_TRASH_FOOTPRINT,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RobotConfig {
    pub(crate) per_spawn_cell: u32,
    pub(crate) max_per_spawn_cell: u8,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            per_spawn_cell: 1,
            max_per_spawn_cell: planner::DEFAULT_MAX_ROBOTS_PER_SPAWN,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ParserConfig {
    pub(crate) quote_chars: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            quote_chars: DEFAULT_QUOTE_CHARS.iter().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CameraSection {
    pub(crate) min_zoom: f32,
    pub(crate) max_zoom: f32,
    pub(crate) zoom_step: f32,
    pub(crate) move_speed: f32,
    pub(crate) turn_speed_degrees: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            min_zoom: CameraConfig::DEFAULT_MIN_ZOOM,
            max_zoom: CameraConfig::DEFAULT_MAX_ZOOM,
            zoom_step: CameraConfig::DEFAULT_ZOOM_STEP,
            move_speed: CameraConfig::DEFAULT_MOVE_SPEED,
            turn_speed_degrees: CameraConfig::DEFAULT_TURN_SPEED_DEGREES,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct VisualsConfig {
    pub(crate) manifest: Option<PathBuf>,
}

impl ViewerConfig {
    /// Loads the configuration at `path`.
    ///
    /// A missing file yields the defaults unless `required` is set, which is
    /// the case when the path was given explicitly.
    pub(crate) fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pipeline cannot operate with.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.layout.cell_span.is_nan() || self.layout.cell_span <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "layout.cell_span must be positive, got {}",
                self.layout.cell_span
            )));
        }
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_ms must be positive".to_owned(),
            ));
        }
        if self.server.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.timeout_ms must be positive".to_owned(),
            ));
        }
        if self.trash.min_separation.is_nan() || self.trash.min_separation < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "trash.min_separation must not be negative, got {}",
                self.trash.min_separation
            )));
        }
        if !(0.0..=1.0).contains(&self.trash.footprint) {
            return Err(ConfigError::Invalid(format!(
                "trash.footprint must lie within [0, 1], got {}",
                self.trash.footprint
            )));
        }
        if self.robots.per_spawn_cell > u32::from(self.robots.max_per_spawn_cell) {
            return Err(ConfigError::Invalid(format!(
                "robots.per_spawn_cell ({}) exceeds robots.max_per_spawn_cell ({})",
                self.robots.per_spawn_cell, self.robots.max_per_spawn_cell
            )));
        }
        if self.camera.min_zoom > self.camera.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "camera.min_zoom ({}) exceeds camera.max_zoom ({})",
                self.camera.min_zoom, self.camera.max_zoom
            )));
        }
        Ok(())
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms)
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    pub(crate) fn poller_config(&self) -> poller::Config {
        let config = poller::Config::new(self.poll_interval(), self.robots.per_spawn_cell)
            .with_strict_dimensions(self.server.strict_dimensions);
        match self.poll.max_ticks {
            Some(max_ticks) => config.with_max_ticks(max_ticks),
            None => config,
        }
    }

    pub(crate) fn planner_config(&self) -> planner::Config {
        let config = planner::Config::default()
            .with_origin(self.layout.origin())
            .with_cell_span(self.layout.cell_span)
            .with_elevations(self.layout.occupant_elevation, self.layout.trash_elevation)
            .with_trash_footprint(self.trash.footprint)
            .with_min_trash_separation(self.trash.min_separation)
            .with_max_sampling_retries(self.trash.max_retries)
            .with_max_robots_per_spawn(self.robots.max_per_spawn_cell);
        match self.trash.seed {
            Some(seed) => config.with_rng_seed(seed),
            None => config,
        }
    }

    pub(crate) fn parser_config(&self) -> sweepview_system_parser::Config {
        sweepview_system_parser::Config::new(self.parser.quote_chars.chars())
    }

    pub(crate) fn camera_config(&self) -> CameraConfig {
        CameraConfig::new(
            self.camera.min_zoom,
            self.camera.max_zoom,
            self.camera.zoom_step,
            self.camera.move_speed,
            self.camera.turn_speed_degrees,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ViewerConfig = toml::from_str("").expect("empty config parses");

        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.server.endpoint, "http://localhost:8585");
        assert_eq!(config.server.response_shape, ResponseShape::Enveloped);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.layout.origin(), Vec2::new(-51.0, 51.0));
        assert_eq!(config.parser.quote_chars, "'\"[],");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bundled_configuration_matches_defaults() {
        let config: ViewerConfig =
            toml::from_str(include_str!("../../../sweepview.toml")).expect("bundled config parses");

        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.trash, TrashConfig::default());
        assert_eq!(config.robots, RobotConfig::default());
        assert_eq!(config.camera, CameraSection::default());
        assert_eq!(
            config.visuals.manifest,
            Some(PathBuf::from("assets/visuals.toml"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sections_override_individual_fields() {
        let config: ViewerConfig = toml::from_str(
            r#"
            [server]
            response_shape = "raw"

            [poll]
            interval_ms = 500
            max_ticks = 12

            [layout]
            cell_span = 3.5

            [robots]
            per_spawn_cell = 2
            "#,
        )
        .expect("config parses");

        assert_eq!(config.server.response_shape, ResponseShape::Raw);
        assert_eq!(config.server.request_body, "dummy data");
        assert_eq!(config.poll.max_ticks, Some(12));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.planner_config().cell_span(), 3.5);
        assert_eq!(config.robots.per_spawn_cell, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ViewerConfig>("[poll]\nintervall_ms = 10\n").is_err());
        assert!(toml::from_str::<ViewerConfig>("[network]\nport = 1\n").is_err());
    }

    #[test]
    fn invalid_ranges_fail_validation() {
        let mut config = ViewerConfig::default();
        config.layout.cell_span = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ViewerConfig::default();
        config.poll.interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ViewerConfig::default();
        config.camera.min_zoom = 50.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ViewerConfig::default();
        config.robots.per_spawn_cell = 9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn robot_cap_and_dimension_check_reach_the_pipeline() {
        let config: ViewerConfig = toml::from_str(
            r#"
            [server]
            strict_dimensions = true

            [robots]
            per_spawn_cell = 12
            max_per_spawn_cell = 16
            "#,
        )
        .expect("config parses");

        assert!(config.validate().is_ok());
        assert_eq!(config.planner_config().max_robots_per_spawn(), 16);
        assert_eq!(
            config.poller_config(),
            poller::Config::new(Duration::from_millis(250), 12).with_strict_dimensions(true)
        );
        assert!(toml::from_str::<ViewerConfig>("[robots]\nmax_per_spawn_cell = 300\n").is_err());
    }

    #[test]
    fn zero_retries_with_positive_separation_is_allowed() {
        let mut config = ViewerConfig::default();
        config.trash.max_retries = 0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_optional_file_falls_back_to_defaults() {
        let path = Path::new("/nonexistent/sweepview/sweepview.toml");

        assert_eq!(
            ViewerConfig::load(path, false).expect("defaults"),
            ViewerConfig::default()
        );
        assert!(matches!(
            ViewerConfig::load(path, true),
            Err(ConfigError::Read { .. })
        ));
    }
}
