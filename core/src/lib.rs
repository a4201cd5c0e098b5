#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the sweepview viewer.
//!
//! This crate defines the vocabulary that connects the snapshot pipeline.
//! The parser turns snapshot text into a [`Grid`] of classified [`CellKind`]
//! values, the planner maps every cell onto [`PlacementInstruction`] values,
//! and the scene reconciler realises those instructions as engine entities
//! identified by [`EntityHandle`] and grouped under a [`GenerationId`].

use std::fmt;

use glam::{Quat, Vec3};
use thiserror::Error;

/// Token marking a cell blocked by an obstacle.
pub const OBSTACLE_MARKER: &str = "X";
/// Token marking a robot spawn cell.
pub const ROBOT_MARKER: &str = "S";
/// Token marking a trashcan cell.
pub const TRASHCAN_MARKER: &str = "P";
/// Token marking a free floor cell.
pub const EMPTY_MARKER: &str = "0";

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Rows grow downward in snapshot text, columns grow to the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(row {}, column {})", self.row, self.column)
    }
}

/// Number of trash units stacked in a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackCount(u8);

impl StackCount {
    /// Smallest stack a numeric token can describe.
    pub const MIN: u8 = 1;
    /// Deepest stack the visual assets support.
    pub const MAX: u8 = 8;

    /// Creates a stack count, returning `None` outside `MIN..=MAX`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Retrieves the number of stacked units.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Classified occupant of a grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Free floor.
    Empty,
    /// Impassable obstacle.
    Obstacle,
    /// Cell where the simulation spawns its robots.
    RobotSpawn,
    /// Cell holding a trashcan.
    TrashcanSpawn,
    /// Cell holding one or more units of trash.
    Trash(StackCount),
    /// Token the classifier did not recognise. Holds the token verbatim.
    Invalid(String),
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str(EMPTY_MARKER),
            Self::Obstacle => f.write_str(OBSTACLE_MARKER),
            Self::RobotSpawn => f.write_str(ROBOT_MARKER),
            Self::TrashcanSpawn => f.write_str(TRASHCAN_MARKER),
            Self::Trash(count) => write!(f, "{}", count.get()),
            Self::Invalid(token) => f.write_str(token),
        }
    }
}

/// Borrowed view of a single classified grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell<'a> {
    /// Position of the cell within the grid.
    pub coord: CellCoord,
    /// Occupant classified from the snapshot token.
    pub kind: &'a CellKind,
}

/// Rectangular grid of classified cells stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Builds a grid from classified rows.
    ///
    /// Fails with [`ParseError::EmptyInput`] when there are no rows or the
    /// first row has no cells, and with [`ParseError::RaggedGrid`] when any
    /// row length differs from the first.
    pub fn from_rows(rows: Vec<Vec<CellKind>>) -> Result<Self, ParseError> {
        let Some(first) = rows.first() else {
            return Err(ParseError::EmptyInput);
        };
        if first.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let expected = first.len();
        for (index, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(ParseError::RaggedGrid {
                    row: saturating_u32(index),
                    expected: saturating_u32(expected),
                    found: saturating_u32(row.len()),
                });
            }
        }

        let row_count = saturating_u32(rows.len());
        let cells: Vec<CellKind> = rows.into_iter().flatten().collect();
        Ok(Self {
            columns: saturating_u32(expected),
            rows: row_count,
            cells,
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the grid holds no cells. Parsed grids never do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the kind stored at the provided cell, if it lies inside the grid.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> Option<&CellKind> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        self.cells.get(row * width + column)
    }

    /// Iterates over every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Cell<'_>> + '_ {
        let width = self.columns.max(1) as usize;
        self.cells.iter().enumerate().map(move |(index, kind)| Cell {
            coord: CellCoord::new(
                saturating_u32(index % width),
                saturating_u32(index / width),
            ),
            kind,
        })
    }

    /// Counts the occupants recorded in the grid.
    #[must_use]
    pub fn tally(&self) -> GridTally {
        let mut tally = GridTally::default();
        for kind in &self.cells {
            match kind {
                CellKind::Empty => {}
                CellKind::Obstacle => tally.obstacles += 1,
                CellKind::RobotSpawn => tally.robot_spawns += 1,
                CellKind::TrashcanSpawn => tally.trashcans += 1,
                CellKind::Trash(count) => tally.trash_units += u32::from(count.get()),
                CellKind::Invalid(_) => tally.invalid += 1,
            }
        }
        tally
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.columns.max(1) as usize;
        for (row_index, row) in self.cells.chunks(width).enumerate() {
            if row_index > 0 {
                f.write_str("\n")?;
            }
            for (column_index, kind) in row.iter().enumerate() {
                if column_index > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{kind}")?;
            }
        }
        Ok(())
    }
}

/// Occupant totals derived from a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridTally {
    /// Number of obstacle cells.
    pub obstacles: u32,
    /// Number of robot spawn cells.
    pub robot_spawns: u32,
    /// Number of trashcan cells.
    pub trashcans: u32,
    /// Sum of the stacked trash units across all trash cells.
    pub trash_units: u32,
    /// Number of cells holding unrecognised tokens.
    pub invalid: u32,
}

/// Kinds of entities the planner asks the engine to place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    /// Background floor tile laid under every cell.
    Floor,
    /// Obstacle block.
    Obstacle,
    /// Cleaning robot.
    Robot,
    /// Trashcan.
    Trashcan,
    /// Single unit of trash.
    Trash,
}

impl EntityType {
    /// Every entity type in a stable order.
    pub const ALL: [EntityType; 5] = [
        EntityType::Floor,
        EntityType::Obstacle,
        EntityType::Robot,
        EntityType::Trashcan,
        EntityType::Trash,
    ];

    /// Stable name used in manifests and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Floor => "Floor",
            Self::Obstacle => "Obstacle",
            Self::Robot => "Robot",
            Self::Trashcan => "Trashcan",
            Self::Trash => "Trash",
        }
    }

    /// Resolves the occupant entity a cell kind places on top of its floor tile.
    ///
    /// Returns `None` for kinds that place nothing beyond the floor.
    #[must_use]
    pub const fn occupant_of(kind: &CellKind) -> Option<Self> {
        match kind {
            CellKind::Empty | CellKind::Invalid(_) => None,
            CellKind::Obstacle => Some(Self::Obstacle),
            CellKind::RobotSpawn => Some(Self::Robot),
            CellKind::TrashcanSpawn => Some(Self::Trashcan),
            CellKind::Trash(_) => Some(Self::Trash),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request to materialise one entity in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementInstruction {
    /// Type of entity to materialise.
    pub entity: EntityType,
    /// Grid cell the instruction originates from.
    pub cell: CellCoord,
    /// Index of the item within its cell's stack, zero for single occupants.
    pub stack_index: u8,
    /// World-space position of the entity.
    pub position: Vec3,
    /// World-space orientation of the entity. Always identity.
    pub orientation: Quat,
}

impl PlacementInstruction {
    /// Creates an instruction with identity orientation.
    #[must_use]
    pub const fn new(entity: EntityType, cell: CellCoord, stack_index: u8, position: Vec3) -> Self {
        Self {
            entity,
            cell,
            stack_index,
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Monotonic identifier of a committed scene generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId(u64);

impl GenerationId {
    /// Identifier of the empty scene that exists before the first commit.
    pub const INITIAL: GenerationId = GenerationId(0);

    /// Creates a generation identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Identifier of the generation that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Opaque handle to an entity materialised by the rendering engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Creates a handle wrapping the engine-provided value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Reasons a snapshot could not be turned into a grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The snapshot contained no rows.
    #[error("snapshot contains no rows")]
    EmptyInput,
    /// A row's token count differs from the first row's.
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedGrid {
        /// Zero-based index of the offending row.
        row: u32,
        /// Token count of the first row.
        expected: u32,
        /// Token count of the offending row.
        found: u32,
    },
    /// A numeric token exceeds the deepest supported trash stack.
    #[error("stack of {value} at {cell} exceeds the supported depth of {}", StackCount::MAX)]
    OutOfRangeStack {
        /// Cell holding the offending token.
        cell: CellCoord,
        /// Parsed stack value, saturated at `u64::MAX`.
        value: u64,
    },
    /// The server-declared dimensions disagree with the parsed grid.
    #[error(
        "server declared {expected_rows}x{expected_columns} but snapshot is {rows}x{columns}"
    )]
    DimensionMismatch {
        /// Row count declared by the server.
        expected_rows: u32,
        /// Column count declared by the server.
        expected_columns: u32,
        /// Row count found in the snapshot.
        rows: u32,
        /// Column count found in the snapshot.
        columns: u32,
    },
}

/// Cell the planner could not map onto an occupant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementAnomaly {
    /// Cell holding the unrecognised token.
    pub cell: CellCoord,
    /// Token as it appeared in the snapshot.
    pub token: String,
}

impl fmt::Display for PlacementAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised token '{}' at {}", self.token, self.cell)
    }
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
