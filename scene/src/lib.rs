#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scene reconciler that owns the live generation of placed entities.
//!
//! Entities are tracked in an arena tagged with the [`GenerationId`] that
//! created them. A commit tears down exactly the entities of the previous
//! generation before materialising the next one, so objects spawned outside
//! reconciliation (camera rigs, lights, overlays) are never touched.
//! Readers observe generations through a [`SceneWatch`], which only ever
//! exposes fully committed generations.

use std::sync::{Arc, PoisonError, RwLock};

use sweepview_core::{CellCoord, EntityHandle, EntityType, GenerationId, PlacementInstruction};
use sweepview_rendering::{MaterializeError, RenderingBackend};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Entity realised for one placement instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedEntity {
    /// Engine handle of the entity.
    pub handle: EntityHandle,
    /// Instruction the entity was created from.
    pub instruction: PlacementInstruction,
}

/// Complete set of entities realised from one committed instruction set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGeneration {
    id: GenerationId,
    entities: Vec<PlacedEntity>,
}

impl SceneGeneration {
    /// Identifier of the generation.
    #[must_use]
    pub const fn id(&self) -> GenerationId {
        self.id
    }

    /// Entities owned by the generation in instruction order.
    #[must_use]
    pub fn entities(&self) -> &[PlacedEntity] {
        &self.entities
    }

    /// Number of entities owned by the generation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Reports whether the generation owns no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Counts the entities of the provided type.
    #[must_use]
    pub fn count(&self, entity: EntityType) -> usize {
        self.entities
            .iter()
            .filter(|placed| placed.instruction.entity == entity)
            .count()
    }
}

/// Failure to realise a single placement instruction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The rendering collaborator has no visual for the instruction.
    #[error("no visual registered for {entity} (stack index {stack_index}) at {cell}")]
    UnresolvedVisual {
        /// Entity type requested by the instruction.
        entity: EntityType,
        /// Cell the instruction originated from.
        cell: CellCoord,
        /// Stack index requested by the instruction.
        stack_index: u8,
    },
    /// The rendering collaborator refused to materialise the entity.
    #[error("failed to materialise {entity} at {cell}")]
    Materialize {
        /// Entity type requested by the instruction.
        entity: EntityType,
        /// Cell the instruction originated from.
        cell: CellCoord,
        /// Error reported by the engine.
        #[source]
        source: MaterializeError,
    },
}

/// Outcome of a commit.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitReport {
    /// Identifier of the newly live generation.
    pub generation: GenerationId,
    /// Number of entities materialised for the new generation.
    pub materialized: usize,
    /// Number of entities of the previous generation torn down.
    pub destroyed: usize,
    /// Instructions that could not be realised. They are absent from the
    /// new generation.
    pub failures: Vec<ReconcileError>,
}

/// Shared read-only view of the live generation.
#[derive(Clone, Debug, Default)]
pub struct SceneWatch {
    current: Arc<RwLock<Arc<SceneGeneration>>>,
}

impl SceneWatch {
    /// Snapshot of the most recently committed generation.
    #[must_use]
    pub fn current(&self) -> Arc<SceneGeneration> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    fn publish(&self, generation: Arc<SceneGeneration>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = generation;
    }
}

/// Sole owner of the entities placed for the live generation.
#[derive(Debug)]
pub struct Reconciler<B> {
    backend: B,
    live: Arc<SceneGeneration>,
    watch: SceneWatch,
}

impl<B: RenderingBackend> Reconciler<B> {
    /// Creates a reconciler driving the provided backend, starting from an
    /// empty scene.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            live: Arc::new(SceneGeneration::default()),
            watch: SceneWatch::default(),
        }
    }

    /// Generation currently realised in the engine.
    #[must_use]
    pub fn live(&self) -> &SceneGeneration {
        &self.live
    }

    /// Handle that observes committed generations from other threads.
    #[must_use]
    pub fn watch(&self) -> SceneWatch {
        self.watch.clone()
    }

    /// Backend driven by the reconciler.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend for entities outside reconciliation.
    ///
    /// Handles owned by the live generation must not be destroyed through it.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Replaces the live generation with one realised from `instructions`.
    ///
    /// Every entity of the previous generation is destroyed before any entity
    /// of the new one is created. Instructions that cannot be realised are
    /// reported in [`CommitReport::failures`] and skipped.
    pub fn commit(&mut self, instructions: &[PlacementInstruction]) -> CommitReport {
        let generation = self.live.id().next();
        let destroyed = self.teardown();

        let mut entities = Vec::with_capacity(instructions.len());
        let mut failures = Vec::new();
        for instruction in instructions {
            match self.realise(instruction) {
                Ok(handle) => entities.push(PlacedEntity {
                    handle,
                    instruction: *instruction,
                }),
                Err(error) => {
                    warn!(%generation, error = %error, "skipping placement instruction");
                    failures.push(error);
                }
            }
        }

        let materialized = entities.len();
        self.live = Arc::new(SceneGeneration {
            id: generation,
            entities,
        });
        self.watch.publish(Arc::clone(&self.live));

        info!(
            %generation,
            materialized,
            destroyed,
            failures = failures.len(),
            "committed scene generation"
        );

        CommitReport {
            generation,
            materialized,
            destroyed,
            failures,
        }
    }

    /// Destroys the live generation's entities and leaves the scene empty.
    ///
    /// The generation identifier keeps advancing so watchers can tell the
    /// cleared scene apart from the one it replaced.
    pub fn clear(&mut self) -> usize {
        let generation = self.live.id().next();
        let destroyed = self.teardown();
        self.live = Arc::new(SceneGeneration {
            id: generation,
            entities: Vec::new(),
        });
        self.watch.publish(Arc::clone(&self.live));
        destroyed
    }

    fn teardown(&mut self) -> usize {
        let previous = self.live.id();
        let mut destroyed = 0;
        for placed in self.live.entities() {
            if self.backend.destroy(placed.handle) {
                destroyed += 1;
            } else {
                warn!(
                    generation = %previous,
                    handle = placed.handle.get(),
                    "entity vanished before teardown"
                );
            }
        }
        debug!(generation = %previous, destroyed, "tore down scene generation");
        destroyed
    }

    fn realise(&mut self, instruction: &PlacementInstruction) -> Result<EntityHandle, ReconcileError> {
        let visual = self
            .backend
            .resolve_visual(instruction.entity, instruction.stack_index)
            .ok_or(ReconcileError::UnresolvedVisual {
                entity: instruction.entity,
                cell: instruction.cell,
                stack_index: instruction.stack_index,
            })?;

        self.backend
            .materialize(&visual, instruction.position, instruction.orientation)
            .map_err(|source| ReconcileError::Materialize {
                entity: instruction.entity,
                cell: instruction.cell,
                source,
            })
    }
}
