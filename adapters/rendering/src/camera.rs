use glam::{Vec2, Vec3};

/// Tuning parameters for [`CameraRig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    min_zoom: f32,
    max_zoom: f32,
    zoom_step: f32,
    move_speed: f32,
    turn_speed: f32,
}

impl CameraConfig {
    /// Smallest orthographic size used when no configuration is provided.
    pub const DEFAULT_MIN_ZOOM: f32 = 2.0;
    /// Largest orthographic size used when no configuration is provided.
    pub const DEFAULT_MAX_ZOOM: f32 = 40.0;
    /// Orthographic size change applied per scroll notch.
    pub const DEFAULT_ZOOM_STEP: f32 = 2.0;
    /// Planar movement speed in world units per second.
    pub const DEFAULT_MOVE_SPEED: f32 = 10.0;
    /// Yaw speed in degrees per second.
    pub const DEFAULT_TURN_SPEED_DEGREES: f32 = 60.0;

    /// Creates a camera configuration.
    ///
    /// The zoom bounds are reordered when supplied inverted.
    #[must_use]
    pub fn new(
        min_zoom: f32,
        max_zoom: f32,
        zoom_step: f32,
        move_speed: f32,
        turn_speed_degrees: f32,
    ) -> Self {
        Self {
            min_zoom: min_zoom.min(max_zoom),
            max_zoom: max_zoom.max(min_zoom),
            zoom_step,
            move_speed,
            turn_speed: turn_speed_degrees.to_radians(),
        }
    }

    /// Smallest orthographic size the rig accepts.
    #[must_use]
    pub const fn min_zoom(&self) -> f32 {
        self.min_zoom
    }

    /// Largest orthographic size the rig accepts.
    #[must_use]
    pub const fn max_zoom(&self) -> f32 {
        self.max_zoom
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MIN_ZOOM,
            Self::DEFAULT_MAX_ZOOM,
            Self::DEFAULT_ZOOM_STEP,
            Self::DEFAULT_MOVE_SPEED,
            Self::DEFAULT_TURN_SPEED_DEGREES,
        )
    }
}

/// Navigation input sampled by a frontend for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraInput {
    /// Planar movement request; `x` strafes along world X, `y` moves along world Z.
    pub movement: Vec2,
    /// Yaw request, negative turns left.
    pub turn: f32,
    /// Scroll wheel delta, positive zooms in.
    pub scroll: f32,
}

/// Top-down orthographic camera state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraRig {
    config: CameraConfig,
    position: Vec3,
    yaw: f32,
    zoom: f32,
}

impl CameraRig {
    /// Creates a rig at the world origin with the widest allowed zoom.
    #[must_use]
    pub fn new(config: CameraConfig) -> Self {
        Self {
            position: Vec3::new(0.0, config.max_zoom, 0.0),
            yaw: 0.0,
            zoom: config.max_zoom,
            config,
        }
    }

    /// World-space camera position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Rotation around the vertical axis in radians.
    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Orthographic half-height of the view.
    #[must_use]
    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Centres the camera over a grid laid out from `origin` (`x`, `z`) with
    /// cells `cell_span` wide, and sizes the view to fit it.
    pub fn frame_grid(&mut self, origin: Vec2, cell_span: f32, rows: u32, columns: u32) {
        let extent = rows.max(columns) as f32 * 0.5 * cell_span;
        self.position = Vec3::new(
            origin.x + columns as f32 * 0.5 * cell_span,
            extent,
            origin.y - rows as f32 * 0.5 * cell_span + 1.0,
        );
        self.yaw = 0.0;
        self.zoom = self.clamp_zoom(extent);
    }

    /// Integrates one frame of navigation input.
    ///
    /// Movement is expressed in world axes. Each non-zero scroll sample moves
    /// the zoom by one step, saturating at the configured bounds.
    pub fn apply(&mut self, input: CameraInput, delta_seconds: f32) {
        let movement = input.movement.clamp_length_max(1.0) * self.config.move_speed * delta_seconds;
        self.position.x += movement.x;
        self.position.z += movement.y;
        self.yaw += input.turn.clamp(-1.0, 1.0) * self.config.turn_speed * delta_seconds;

        if input.scroll > 0.0 {
            self.zoom = self.clamp_zoom(self.zoom - self.config.zoom_step);
        } else if input.scroll < 0.0 {
            self.zoom = self.clamp_zoom(self.zoom + self.config.zoom_step);
        }
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.config.min_zoom, self.config.max_zoom)
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
