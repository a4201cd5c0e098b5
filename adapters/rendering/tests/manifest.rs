use std::path::Path;

use sweepview_core::EntityType;
use sweepview_rendering::{VisualHandle, VisualRegistry};

#[test]
fn bundled_manifest_covers_every_entity_type() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/visuals.toml");

    let registry = VisualRegistry::from_manifest_path(&path).expect("bundled manifest loads");

    assert!(registry.is_complete());
    assert_eq!(
        registry.resolve(EntityType::Trash, 5),
        Some(&VisualHandle::new("props/trash_heap"))
    );
    assert_eq!(
        registry.resolve(EntityType::Trash, 3),
        Some(&VisualHandle::new("props/trash"))
    );
}

#[test]
fn missing_manifest_names_the_path() {
    let error = VisualRegistry::from_manifest_path("/nonexistent/visuals.toml")
        .expect_err("missing manifest fails");

    assert!(format!("{error:#}").contains("/nonexistent/visuals.toml"));
}
