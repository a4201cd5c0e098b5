#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Placement planner that maps classified grid cells onto world-space
//! placement instructions.
//!
//! Every cell yields a floor tile. Occupants are stacked on top of it at
//! fixed elevations, robot spawns repeat the robot once per configured robot,
//! and trash stacks are scattered inside the cell footprint with a minimum
//! pairwise separation. Scattering uses bounded rejection sampling and falls
//! back to a deterministic lattice once the retry budget is spent.

use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sweepview_core::{
    CellCoord, CellKind, EntityType, Grid, PlacementAnomaly, PlacementInstruction,
};
use tracing::{debug, warn};

/// World-space position of the cell at row zero, column zero.
pub const DEFAULT_ORIGIN: Vec2 = Vec2::new(-51.0, 51.0);
/// Side length of one cell in world units.
pub const DEFAULT_CELL_SPAN: f32 = 2.0;
/// Height at which single occupants rest on the floor tile.
pub const DEFAULT_OCCUPANT_ELEVATION: f32 = 0.096;
/// Height at which trash units rest on the floor tile.
pub const DEFAULT_TRASH_ELEVATION: f32 = 0.096;
/// Fraction of the cell span trash may be scattered across.
pub const DEFAULT_TRASH_FOOTPRINT: f32 = 0.7;
/// Minimum distance between two trash units sharing a cell.
pub const DEFAULT_MIN_TRASH_SEPARATION: f32 = 0.3;
/// Extra draws allowed per trash unit before falling back to the lattice.
pub const DEFAULT_MAX_SAMPLING_RETRIES: u32 = 32;
/// Most robots a single spawn cell will stack.
pub const DEFAULT_MAX_ROBOTS_PER_SPAWN: u8 = 8;

const DEFAULT_RNG_SEED: u64 = 0x5eed_c0de_2024_0001;
// Keeps lattice pitch strictly above the separation threshold.
const LATTICE_SLACK: f32 = 1.001;

/// Configuration parameters required to construct the planner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    origin: Vec2,
    cell_span: f32,
    occupant_elevation: f32,
    trash_elevation: f32,
    trash_footprint: f32,
    min_trash_separation: f32,
    max_sampling_retries: u32,
    max_robots_per_spawn: u8,
    rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN,
            cell_span: DEFAULT_CELL_SPAN,
            occupant_elevation: DEFAULT_OCCUPANT_ELEVATION,
            trash_elevation: DEFAULT_TRASH_ELEVATION,
            trash_footprint: DEFAULT_TRASH_FOOTPRINT,
            min_trash_separation: DEFAULT_MIN_TRASH_SEPARATION,
            max_sampling_retries: DEFAULT_MAX_SAMPLING_RETRIES,
            max_robots_per_spawn: DEFAULT_MAX_ROBOTS_PER_SPAWN,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}

impl Config {
    /// Overrides the world-space origin, expressed as `(x, z)`.
    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Overrides the side length of one cell.
    #[must_use]
    pub fn with_cell_span(mut self, cell_span: f32) -> Self {
        self.cell_span = cell_span;
        self
    }

    /// Overrides the elevations used for single occupants and trash units.
    #[must_use]
    pub fn with_elevations(mut self, occupant: f32, trash: f32) -> Self {
        self.occupant_elevation = occupant;
        self.trash_elevation = trash;
        self
    }

    /// Overrides the fraction of the cell span trash is scattered across.
    #[must_use]
    pub fn with_trash_footprint(mut self, footprint: f32) -> Self {
        self.trash_footprint = footprint.max(0.0);
        self
    }

    /// Overrides the minimum distance between trash units in one cell.
    #[must_use]
    pub fn with_min_trash_separation(mut self, separation: f32) -> Self {
        self.min_trash_separation = separation.max(0.0);
        self
    }

    /// Overrides the number of extra draws allowed per trash unit.
    #[must_use]
    pub fn with_max_sampling_retries(mut self, retries: u32) -> Self {
        self.max_sampling_retries = retries;
        self
    }

    /// Overrides the number of robots a spawn cell stacks at most. Larger
    /// announced counts are clamped.
    #[must_use]
    pub fn with_max_robots_per_spawn(mut self, max: u8) -> Self {
        self.max_robots_per_spawn = max;
        self
    }

    /// Overrides the seed driving trash scattering.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// World-space origin expressed as `(x, z)`.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Most robots a single spawn cell will stack.
    #[must_use]
    pub const fn max_robots_per_spawn(&self) -> u8 {
        self.max_robots_per_spawn
    }

    /// Side length of one cell in world units.
    #[must_use]
    pub const fn cell_span(&self) -> f32 {
        self.cell_span
    }

    /// Minimum distance between trash units sharing a cell.
    #[must_use]
    pub const fn min_trash_separation(&self) -> f32 {
        self.min_trash_separation
    }

    /// Half-width of the square trash units are scattered across.
    #[must_use]
    pub fn trash_half_extent(&self) -> f32 {
        self.trash_footprint * self.cell_span * 0.5
    }

    /// Floor-level world position of a cell.
    ///
    /// Columns advance along +X and rows along -Z, matching the server's
    /// row-major text layout.
    #[must_use]
    pub fn cell_position(&self, cell: CellCoord) -> Vec3 {
        Vec3::new(
            self.origin.x + cell.column() as f32 * self.cell_span,
            0.0,
            self.origin.y - cell.row() as f32 * self.cell_span,
        )
    }
}

/// Output of a single planning pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plan {
    /// Instructions in row-major cell order, floor tile first within a cell.
    pub instructions: Vec<PlacementInstruction>,
    /// Cells whose tokens could not be mapped onto an occupant.
    pub anomalies: Vec<PlacementAnomaly>,
    /// Trash cells that exhausted the retry budget and used the lattice.
    pub lattice_cells: Vec<CellCoord>,
}

impl Plan {
    /// Counts the instructions targeting the provided entity type.
    #[must_use]
    pub fn count(&self, entity: EntityType) -> usize {
        self.instructions
            .iter()
            .filter(|instruction| instruction.entity == entity)
            .count()
    }
}

/// Planner holding the layout configuration and the scattering RNG.
#[derive(Debug)]
pub struct Planner {
    config: Config,
    rng: ChaCha8Rng,
}

impl Planner {
    /// Creates a new planner using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
        }
    }

    /// Configuration the planner was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Maps every cell of the grid onto placement instructions.
    ///
    /// `robots_per_spawn` is the robot count supplied for this cycle; every
    /// robot spawn cell places that many robots at its own position, up to
    /// the configured per-cell maximum.
    pub fn plan(&mut self, grid: &Grid, robots_per_spawn: u32) -> Plan {
        let robots = self.robots_per_spawn(robots_per_spawn);
        let mut plan = Plan {
            instructions: Vec::with_capacity(grid.len() * 2),
            ..Plan::default()
        };

        for cell in grid.iter() {
            let floor = self.config.cell_position(cell.coord);
            plan.instructions.push(PlacementInstruction::new(
                EntityType::Floor,
                cell.coord,
                0,
                floor,
            ));

            match cell.kind {
                CellKind::Empty => {}
                CellKind::Obstacle => {
                    self.place_occupant(&mut plan, EntityType::Obstacle, cell.coord, floor);
                }
                CellKind::TrashcanSpawn => {
                    self.place_occupant(&mut plan, EntityType::Trashcan, cell.coord, floor);
                }
                CellKind::RobotSpawn => {
                    let position = floor + Vec3::Y * self.config.occupant_elevation;
                    for index in 0..robots {
                        plan.instructions.push(PlacementInstruction::new(
                            EntityType::Robot,
                            cell.coord,
                            index,
                            position,
                        ));
                    }
                }
                CellKind::Trash(count) => {
                    let scatter = self.scatter(count.get());
                    if scatter.lattice {
                        debug!(
                            row = cell.coord.row(),
                            column = cell.coord.column(),
                            units = count.get(),
                            "trash scatter exhausted retries, using lattice"
                        );
                        plan.lattice_cells.push(cell.coord);
                    }
                    for (index, offset) in scatter.offsets.into_iter().enumerate() {
                        let position = floor
                            + Vec3::new(offset.x, self.config.trash_elevation, offset.y);
                        plan.instructions.push(PlacementInstruction::new(
                            EntityType::Trash,
                            cell.coord,
                            u8::try_from(index).unwrap_or(u8::MAX),
                            position,
                        ));
                    }
                }
                CellKind::Invalid(token) => {
                    warn!(
                        row = cell.coord.row(),
                        column = cell.coord.column(),
                        token = %token,
                        "unrecognised cell token, placing floor only"
                    );
                    plan.anomalies.push(PlacementAnomaly {
                        cell: cell.coord,
                        token: token.clone(),
                    });
                }
            }
        }

        plan
    }

    fn robots_per_spawn(&self, requested: u32) -> u8 {
        let max = self.config.max_robots_per_spawn;
        match u8::try_from(requested) {
            Ok(robots) if robots <= max => robots,
            _ => {
                warn!(requested, max, "robot count above per-cell maximum, clamping");
                max
            }
        }
    }

    fn place_occupant(&self, plan: &mut Plan, entity: EntityType, cell: CellCoord, floor: Vec3) {
        plan.instructions.push(PlacementInstruction::new(
            entity,
            cell,
            0,
            floor + Vec3::Y * self.config.occupant_elevation,
        ));
    }

    fn scatter(&mut self, count: u8) -> Scatter {
        let half = self.config.trash_half_extent();
        let separation = self.config.min_trash_separation;
        let attempts = self.config.max_sampling_retries.saturating_add(1);
        let mut accepted: Vec<Vec2> = Vec::with_capacity(usize::from(count));

        for _ in 0..count {
            let mut placed = false;
            for _ in 0..attempts {
                let candidate = self.draw_offset(half);
                if accepted
                    .iter()
                    .all(|other| candidate.distance(*other) > separation)
                {
                    accepted.push(candidate);
                    placed = true;
                    break;
                }
            }

            if !placed {
                return Scatter {
                    offsets: lattice_offsets(count, half, separation),
                    lattice: true,
                };
            }
        }

        Scatter {
            offsets: accepted,
            lattice: false,
        }
    }

    fn draw_offset(&mut self, half: f32) -> Vec2 {
        if half <= 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new(
            self.rng.gen_range(-half..=half),
            self.rng.gen_range(-half..=half),
        )
    }
}

struct Scatter {
    offsets: Vec<Vec2>,
    lattice: bool,
}

/// Deterministic square lattice centred on the cell.
///
/// The pitch never drops to the separation threshold, so lattice offsets are
/// always pairwise farther apart than `separation`.
fn lattice_offsets(count: u8, half: f32, separation: f32) -> Vec<Vec2> {
    let count = usize::from(count);
    if count == 0 {
        return Vec::new();
    }

    let columns = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(columns);
    let pitch = (2.0 * half / columns as f32).max(separation * LATTICE_SLACK);
    let column_centre = (columns - 1) as f32 * 0.5;
    let row_centre = (rows - 1) as f32 * 0.5;

    (0..count)
        .map(|index| {
            let column = (index % columns) as f32;
            let row = (index / columns) as f32;
            Vec2::new(
                (column - column_centre) * pitch,
                (row - row_centre) * pitch,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_centred_and_separated() {
        let offsets = lattice_offsets(4, 0.5, 0.2);

        assert_eq!(offsets.len(), 4);
        let centroid = offsets.iter().copied().sum::<Vec2>() / offsets.len() as f32;
        assert!(centroid.length() < 1e-5, "lattice must be centred");
        for (index, a) in offsets.iter().enumerate() {
            for b in &offsets[index + 1..] {
                assert!(a.distance(*b) > 0.2);
            }
        }
    }

    #[test]
    fn lattice_pitch_grows_past_separation() {
        let offsets = lattice_offsets(2, 0.05, 1.0);

        assert!(offsets[0].distance(offsets[1]) > 1.0);
    }

    #[test]
    fn zero_footprint_draws_the_cell_centre() {
        let mut planner = Planner::new(Config::default().with_trash_footprint(0.0));
        assert_eq!(planner.draw_offset(0.0), Vec2::ZERO);
    }
}
