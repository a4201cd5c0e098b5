use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sweepview_core::{EntityType, StackCount};

use crate::VisualHandle;

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Lookup table from entity type and stack index to opaque visuals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualRegistry {
    entries: HashMap<EntityType, VisualEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct VisualEntry {
    default: VisualHandle,
    stacks: BTreeMap<u8, VisualHandle>,
}

impl VisualRegistry {
    /// Registry mapping every entity type to a visual named after it.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = EntityType::ALL
            .into_iter()
            .map(|entity| {
                (
                    entity,
                    VisualEntry {
                        default: VisualHandle::new(entity.name().to_ascii_lowercase()),
                        stacks: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Loads a registry from the manifest located at the provided path.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self> {
        let manifest_path = path.as_ref();
        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read visual manifest at {}",
                manifest_path.display()
            )
        })?;
        Self::from_manifest_str(&contents)
            .with_context(|| format!("invalid visual manifest at {}", manifest_path.display()))
    }

    /// Parses a registry from manifest contents.
    ///
    /// Every [`EntityType`] must have an entry; unknown entity names, unknown
    /// fields and stack overrides outside the supported depth are rejected.
    pub fn from_manifest_str(contents: &str) -> Result<Self> {
        let manifest: Manifest =
            toml::from_str(contents).context("failed to parse visual manifest toml contents")?;
        if manifest.version != SUPPORTED_MANIFEST_VERSION {
            bail!(
                "unsupported visual manifest version {}; expected {}",
                manifest.version,
                SUPPORTED_MANIFEST_VERSION
            );
        }

        let mut resolved = HashMap::new();
        for (name, entry) in manifest.visuals {
            let entity = parse_entity_type(&name)
                .with_context(|| format!("unknown entity type `{name}` in manifest"))?;
            let mut stacks = BTreeMap::new();
            for (index, key) in entry.stacks {
                let stack_index = parse_stack_index(&index)
                    .with_context(|| format!("invalid stack override `{index}` for {entity}"))?;
                let _ = stacks.insert(stack_index, VisualHandle::new(key));
            }
            let visual = VisualEntry {
                default: VisualHandle::new(entry.key),
                stacks,
            };
            if resolved.insert(entity, visual).is_some() {
                bail!("visual manifest contains duplicate entry for {entity}");
            }
        }

        for entity in EntityType::ALL {
            if !resolved.contains_key(&entity) {
                bail!("visual manifest missing entry for {entity}");
            }
        }

        Ok(Self { entries: resolved })
    }

    /// Selects the visual for an entity at a stack index.
    ///
    /// Falls back to the entity's default visual when no override exists for
    /// the index.
    #[must_use]
    pub fn resolve(&self, entity: EntityType, stack_index: u8) -> Option<&VisualHandle> {
        let entry = self.entries.get(&entity)?;
        Some(entry.stacks.get(&stack_index).unwrap_or(&entry.default))
    }

    /// Reports whether every entity type has a visual.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        EntityType::ALL
            .iter()
            .all(|entity| self.entries.contains_key(entity))
    }
}

impl Default for VisualRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    version: u32,
    visuals: HashMap<String, ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    key: String,
    #[serde(default)]
    stacks: HashMap<String, String>,
}

fn parse_entity_type(name: &str) -> Result<EntityType> {
    match EntityType::ALL.into_iter().find(|entity| entity.name() == name) {
        Some(entity) => Ok(entity),
        None => bail!("unknown entity type `{name}`"),
    }
}

fn parse_stack_index(raw: &str) -> Result<u8> {
    let index: u8 = raw
        .parse()
        .with_context(|| format!("stack index `{raw}` is not a number"))?;
    if index >= StackCount::MAX {
        bail!(
            "stack index {index} exceeds the deepest stack of {}",
            StackCount::MAX
        );
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_MANIFEST: &str = r#"
        version = 1

        [visuals.Floor]
        key = "tiles/floor"

        [visuals.Obstacle]
        key = "props/crate"

        [visuals.Robot]
        key = "agents/robot"

        [visuals.Trashcan]
        key = "props/bin"

        [visuals.Trash]
        key = "props/paper"
        stacks = { "2" = "props/can", "7" = "props/bag" }
    "#;

    #[test]
    fn builtin_registry_covers_every_entity_type() {
        let registry = VisualRegistry::builtin();

        assert!(registry.is_complete());
        assert_eq!(
            registry.resolve(EntityType::Trashcan, 0),
            Some(&VisualHandle::new("trashcan"))
        );
    }

    #[test]
    fn manifest_resolves_stack_overrides_and_falls_back() {
        let registry = VisualRegistry::from_manifest_str(FULL_MANIFEST).expect("manifest parses");

        assert_eq!(
            registry.resolve(EntityType::Trash, 2),
            Some(&VisualHandle::new("props/can"))
        );
        assert_eq!(
            registry.resolve(EntityType::Trash, 7),
            Some(&VisualHandle::new("props/bag"))
        );
        assert_eq!(
            registry.resolve(EntityType::Trash, 3),
            Some(&VisualHandle::new("props/paper"))
        );
        assert_eq!(
            registry.resolve(EntityType::Floor, 0),
            Some(&VisualHandle::new("tiles/floor"))
        );
    }

    #[test]
    fn manifest_requires_all_entity_types() {
        let manifest = r#"
            version = 1

            [visuals.Floor]
            key = "tiles/floor"
        "#;

        let result = VisualRegistry::from_manifest_str(manifest);
        assert!(result.is_err(), "manifest missing entity types should fail");
    }

    #[test]
    fn manifest_rejects_unknown_entity_types() {
        let manifest = format!("{FULL_MANIFEST}\n[visuals.Charger]\nkey = \"charger\"\n");

        let result = VisualRegistry::from_manifest_str(&manifest);
        assert!(result.is_err(), "unknown entity types must be rejected");
    }

    #[test]
    fn manifest_rejects_unknown_fields() {
        let manifest = FULL_MANIFEST.replace("key = \"tiles/floor\"", "key = \"a\"\ntint = 3");

        let result = VisualRegistry::from_manifest_str(&manifest);
        assert!(result.is_err(), "unknown fields must be rejected");
    }

    #[test]
    fn manifest_rejects_stack_overrides_beyond_supported_depth() {
        let manifest = FULL_MANIFEST.replace("\"7\" = ", "\"8\" = ");

        let result = VisualRegistry::from_manifest_str(&manifest);
        assert!(result.is_err(), "stack index 8 is past the deepest stack");
    }

    #[test]
    fn manifest_rejects_unsupported_versions() {
        let manifest = FULL_MANIFEST.replace("version = 1", "version = 2");

        assert!(VisualRegistry::from_manifest_str(&manifest).is_err());
    }
}
