#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for sweepview adapters.
//!
//! The scene reconciler drives any engine through [`RenderingBackend`]. Visual
//! selection is delegated to a [`VisualRegistry`] so backends only ever see
//! opaque [`VisualHandle`] values, and [`CameraRig`] holds the navigation
//! state a frontend polls once per frame.

mod camera;
mod visuals;

use std::fmt;

use glam::{Quat, Vec3};
use sweepview_core::{EntityHandle, EntityType};
use thiserror::Error;

pub use camera::{CameraConfig, CameraInput, CameraRig};
pub use visuals::VisualRegistry;

/// Opaque key identifying an engine asset or prefab.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(String);

impl VisualHandle {
    /// Creates a handle wrapping the provided asset key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Asset key wrapped by the handle.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reasons an engine refused to materialise an entity.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MaterializeError {
    /// The engine does not know how to instantiate the visual.
    #[error("visual `{visual}` cannot be instantiated")]
    UnknownVisual {
        /// Visual the engine rejected.
        visual: VisualHandle,
    },
    /// The engine ran out of room for new entities.
    #[error("entity capacity of {limit} exhausted")]
    CapacityExhausted {
        /// Maximum number of live entities the engine supports.
        limit: usize,
    },
}

/// Rendering engine capable of realising placement instructions.
///
/// Implementations own every entity they create. Callers identify entities
/// only through the [`EntityHandle`] returned by [`RenderingBackend::materialize`].
pub trait RenderingBackend {
    /// Selects the visual used for an entity type at a position within its
    /// cell's stack. Returns `None` when no visual is registered.
    fn resolve_visual(&self, entity: EntityType, stack_index: u8) -> Option<VisualHandle>;

    /// Instantiates a visual at the provided world transform.
    fn materialize(
        &mut self,
        visual: &VisualHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<EntityHandle, MaterializeError>;

    /// Removes an entity previously returned by [`RenderingBackend::materialize`].
    ///
    /// Returns `false` when the handle was not live.
    fn destroy(&mut self, handle: EntityHandle) -> bool;
}

impl<B: RenderingBackend + ?Sized> RenderingBackend for Box<B> {
    fn resolve_visual(&self, entity: EntityType, stack_index: u8) -> Option<VisualHandle> {
        (**self).resolve_visual(entity, stack_index)
    }

    fn materialize(
        &mut self,
        visual: &VisualHandle,
        position: Vec3,
        orientation: Quat,
    ) -> Result<EntityHandle, MaterializeError> {
        (**self).materialize(visual, position, orientation)
    }

    fn destroy(&mut self, handle: EntityHandle) -> bool {
        (**self).destroy(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_handle_displays_its_key() {
        let handle = VisualHandle::new("trash_bag");
        assert_eq!(handle.key(), "trash_bag");
        assert_eq!(handle.to_string(), "trash_bag");
    }

    #[test]
    fn materialize_errors_describe_the_failure() {
        let error = MaterializeError::UnknownVisual {
            visual: VisualHandle::new("ghost"),
        };
        assert_eq!(error.to_string(), "visual `ghost` cannot be instantiated");

        let error = MaterializeError::CapacityExhausted { limit: 4 };
        assert_eq!(error.to_string(), "entity capacity of 4 exhausted");
    }
}
