#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory rendering adapter for sweepview.
//!
//! The backend keeps every materialised entity in a map and never draws
//! anything. It stands in for a real engine when running without a display
//! and gives tests a recording collaborator. Fixture objects such as the
//! camera and the light are spawned directly on the backend and are never
//! handed to the scene reconciler.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Write as _,
};

use anyhow::{bail, Result};
use glam::{Quat, Vec2, Vec3};
use sweepview_core::{CellCoord, EntityHandle, EntityType};
use sweepview_rendering::{MaterializeError, RenderingBackend, VisualHandle, VisualRegistry};
use tracing::debug;

/// Entity held by the headless backend.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessEntity {
    /// Visual the entity was instantiated from.
    pub visual: VisualHandle,
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
    /// Whether the entity was spawned outside of scene reconciliation.
    pub fixture: bool,
}

/// Grid layout used to map entity positions back onto cells in frame dumps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellLayout {
    /// World-space position of the cell at row zero, column zero, as `(x, z)`.
    pub origin: Vec2,
    /// Side length of one cell.
    pub cell_span: f32,
}

impl CellLayout {
    fn cell_of(&self, position: Vec3) -> Option<CellCoord> {
        if self.cell_span <= 0.0 {
            return None;
        }
        let column = ((position.x - self.origin.x) / self.cell_span).round();
        let row = ((self.origin.y - position.z) / self.cell_span).round();
        if column < 0.0 || row < 0.0 || column > u32::MAX as f32 || row > u32::MAX as f32 {
            return None;
        }
        Some(CellCoord::new(column as u32, row as u32))
    }
}

/// Rendering backend that records entities in memory.
#[derive(Debug)]
pub struct HeadlessBackend {
    registry: VisualRegistry,
    entities: BTreeMap<EntityHandle, HeadlessEntity>,
    next_handle: u64,
    entity_limit: Option<usize>,
    rejected: HashSet<VisualHandle>,
}

impl HeadlessBackend {
    /// Creates a backend resolving visuals through the provided registry.
    ///
    /// Fails when the registry lacks a visual for any entity type.
    pub fn new(registry: VisualRegistry) -> Result<Self> {
        if !registry.is_complete() {
            bail!("visual registry does not cover every entity type");
        }
        Ok(Self {
            registry,
            entities: BTreeMap::new(),
            next_handle: 1,
            entity_limit: None,
            rejected: HashSet::new(),
        })
    }

    /// Caps the number of live entities, fixtures included.
    #[must_use]
    pub fn with_entity_limit(mut self, limit: usize) -> Self {
        self.entity_limit = Some(limit);
        self
    }

    /// Makes every materialisation of the provided visual fail.
    #[must_use]
    pub fn with_rejected_visual(mut self, visual: VisualHandle) -> Self {
        let _ = self.rejected.insert(visual);
        self
    }

    /// Spawns an entity that is not tracked by any scene generation.
    pub fn spawn_fixture(&mut self, name: &str, position: Vec3) -> EntityHandle {
        let handle = self.allocate(HeadlessEntity {
            visual: VisualHandle::new(name),
            position,
            orientation: Quat::IDENTITY,
            fixture: true,
        });
        debug!(fixture = name, handle = handle.get(), "spawned fixture");
        handle
    }

    /// Moves an existing entity. Returns `false` when the handle is not live.
    pub fn set_position(&mut self, handle: EntityHandle, position: Vec3) -> bool {
        match self.entities.get_mut(&handle) {
            Some(entity) => {
                entity.position = position;
                true
            }
            None => false,
        }
    }

    /// Looks up a live entity.
    #[must_use]
    pub fn entity(&self, handle: EntityHandle) -> Option<&HeadlessEntity> {
        self.entities.get(&handle)
    }

    /// Number of live entities, fixtures included.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of live fixtures.
    #[must_use]
    pub fn fixture_count(&self) -> usize {
        self.entities.values().filter(|entity| entity.fixture).count()
    }

    /// Number of live non-fixture entities instantiated from a visual.
    #[must_use]
    pub fn count_visual(&self, visual: &VisualHandle) -> usize {
        self.entities
            .values()
            .filter(|entity| !entity.fixture && &entity.visual == visual)
            .count()
    }

    /// Renders the live non-fixture entities as one line per occupied cell.
    ///
    /// Each line lists the visuals found in the cell in handle order. Entities
    /// that fall outside the layout are grouped under a trailing `off-grid`
    /// line.
    #[must_use]
    pub fn render_frame(&self, layout: CellLayout) -> String {
        let mut cells: BTreeMap<(u32, u32), Vec<&str>> = BTreeMap::new();
        let mut off_grid = Vec::new();
        for entity in self.entities.values().filter(|entity| !entity.fixture) {
            match layout.cell_of(entity.position) {
                Some(cell) => cells
                    .entry((cell.row(), cell.column()))
                    .or_default()
                    .push(entity.visual.key()),
                None => off_grid.push(entity.visual.key()),
            }
        }

        let mut frame = String::new();
        for ((row, column), visuals) in &cells {
            let _ = writeln!(frame, "{}: {}", CellCoord::new(*column, *row), visuals.join(" "));
        }
        if !off_grid.is_empty() {
            let _ = writeln!(frame, "off-grid: {}", off_grid.join(" "));
        }
        frame
    }

    fn allocate(&mut self, entity: HeadlessEntity) -> EntityHandle {
        let handle = EntityHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        let _ = self.entities.insert(handle, entity);
        handle
    }
}

impl RenderingBackend for HeadlessBackend {
    fn resolve_visual(&self, entity: EntityType, stack_index: u8) -> Option<VisualHandle> {
        self.registry.resolve(entity, stack_index).cloned()
    }

    fn materialize(
        &mut self,
        visual: &VisualHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<EntityHandle, MaterializeError> {
        if self.rejected.contains(visual) {
            return Err(MaterializeError::UnknownVisual {
                visual: visual.clone(),
            });
        }
        if let Some(limit) = self.entity_limit {
            if self.entities.len() >= limit {
                return Err(MaterializeError::CapacityExhausted { limit });
            }
        }

        Ok(self.allocate(HeadlessEntity {
            visual: visual.clone(),
            position,
            orientation,
            fixture: false,
        }))
    }

    fn destroy(&mut self, handle: EntityHandle) -> bool {
        self.entities.remove(&handle).is_some()
    }
}
