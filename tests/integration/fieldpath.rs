use patch_and_transform::config::{PatchSpec, PatchType};
use patch_and_transform::{FieldPath, FieldPathError, PatchError, Patcher, Paved, Unstructured};
use serde_json::json;

#[test]
fn bracketed_keys_round_trip_through_display() {
    let path = FieldPath::parse("metadata.labels[app.kubernetes.io/name]").unwrap();
    assert_eq!(path.to_string(), "metadata.labels[app.kubernetes.io/name]");

    let paved = Paved::new(json!({
        "metadata": {"labels": {"app.kubernetes.io/name": "web"}}
    }));
    assert_eq!(paved.get_value_at(&path).unwrap(), &json!("web"));
}

#[test]
fn wildcards_expand_over_arrays_and_maps() {
    let paved = Paved::new(json!({
        "spec": {
            "containers": [{"name": "a"}, {"name": "b"}],
            "zones": {"west": {"ready": true}, "east": {"ready": false}}
        }
    }));

    let arrays: Vec<String> = paved
        .expand_wildcards("spec.containers[*].image")
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        arrays,
        vec!["spec.containers[0].image", "spec.containers[1].image"]
    );

    let maps: Vec<String> = paved
        .expand_wildcards("spec.zones[*].ready")
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(maps, vec!["spec.zones.east.ready", "spec.zones.west.ready"]);

    assert!(paved.expand_wildcards("spec.missing[*]").unwrap().is_empty());
    assert!(matches!(
        paved.expand_wildcards("spec.containers[0].name[*]"),
        Err(FieldPathError::UnexpectedWildcard { .. })
    ));
}

#[test]
fn wildcard_patch_into_nested_arrays() {
    let from = Unstructured::from_value(json!({"spec": {"tag": "v2"}})).unwrap();
    let mut to = Unstructured::from_value(json!({
        "spec": {"groups": [
            {"containers": [{"image": "a"}, {"image": "b"}]},
            {"containers": [{"image": "c"}]}
        ]}
    }))
    .unwrap();
    let patch = PatchSpec::new(PatchType::FromCompositeFieldPath)
        .from_field_path("spec.tag")
        .to_field_path("spec.groups[*].containers[*].tag");

    Patcher::default()
        .apply_from_field_path_patch(&patch, &from, &mut to)
        .unwrap();

    assert_eq!(
        to.to_value(),
        json!({
            "spec": {"groups": [
                {"containers": [{"image": "a", "tag": "v2"}, {"image": "b", "tag": "v2"}]},
                {"containers": [{"image": "c", "tag": "v2"}]}
            ]}
        })
    );
}

#[test]
fn invalid_destination_path_is_reported() {
    let from = Unstructured::from_value(json!({"spec": {"tag": "v2"}})).unwrap();
    let mut to = Unstructured::new();
    let patch = PatchSpec::new(PatchType::FromCompositeFieldPath)
        .from_field_path("spec.tag")
        .to_field_path("spec..tag");

    let err = Patcher::default()
        .apply_from_field_path_patch(&patch, &from, &mut to)
        .unwrap_err();
    assert!(matches!(
        err,
        PatchError::PatchToObject {
            source: FieldPathError::InvalidPath { .. }
        }
    ));
    assert_eq!(to, Unstructured::new());
}

#[test]
fn set_extends_arrays_with_nulls() {
    let mut paved = Paved::new(json!({"items": ["a"]}));
    paved.set_value("items[2]", json!("c")).unwrap();
    assert_eq!(paved.object(), &json!({"items": ["a", null, "c"]}));
}
