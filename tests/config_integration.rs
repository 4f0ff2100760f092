//! Integration tests for composition loading and application
//!
//! Tests the loaders across formats, patch set inlining, policies and
//! full application against a set of documents

use patch_and_transform::config::{
    apply_patches, load_from_path, load_from_str, ApplicationError, ConfigError, Documents,
    Format, PatchResult,
};
use patch_and_transform::{PatchError, Unstructured};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

const COMPOSITION: &str = r#"
[[patchSets]]
name = "metadata"

[[patchSets.patches]]
fromFieldPath = "metadata.labels"

[[patchSets.patches]]
fromFieldPath = "spec.parameters.region"
toFieldPath = "spec.forProvider.region"

[environment]

[[environment.patches]]
type = "FromCompositeFieldPath"
fromFieldPath = "spec.parameters.tier"
toFieldPath = "tier"

[[resources]]
name = "bucket"
base = { apiVersion = "s3.aws.example.org/v1beta1", kind = "Bucket", spec = { forProvider = { acl = "private" } } }

[[resources.patches]]
type = "PatchSet"
patchSetName = "metadata"

[[resources.patches]]
type = "FromEnvironmentFieldPath"
fromFieldPath = "tier"
toFieldPath = "metadata.annotations[example.org/tier]"

[[resources.patches]]
type = "FromCompositeFieldPath"
fromFieldPath = "spec.parameters.size"
toFieldPath = "spec.forProvider.storageClass"

[[resources.patches.transforms]]
type = "map"
map = { small = "STANDARD_IA", large = "STANDARD" }

[[resources.patches]]
type = "ToCompositeFieldPath"
fromFieldPath = "status.atProvider.arn"
toFieldPath = "status.bucketArn"

[[resources.patches]]
type = "CombineFromComposite"
toFieldPath = "metadata.name"

[resources.patches.combine]
strategy = "string"
variables = [{ fromFieldPath = "metadata.name" }, { fromFieldPath = "spec.parameters.region" }]
string = { fmt = "%s-%s" }
"#;

fn observed_composite() -> Unstructured {
    Unstructured::from_value(json!({
        "apiVersion": "example.org/v1",
        "kind": "XStorage",
        "metadata": {"name": "logs", "labels": {"team": "infra"}},
        "spec": {"parameters": {"region": "eu-west-1", "size": "small", "tier": "gold"}}
    }))
    .unwrap()
}

fn documents() -> Documents {
    Documents {
        observed_composite: observed_composite(),
        ..Documents::default()
    }
}

fn ids(results: &[(String, Result<PatchResult, ApplicationError>)]) -> Vec<&str> {
    results.iter().map(|(id, _)| id.as_str()).collect()
}

#[test]
fn test_apply_composition_first_pass() {
    let composition = load_from_str(COMPOSITION, Format::Toml).unwrap();
    let mut docs = documents();

    let results = apply_patches(&composition, &mut docs).unwrap();

    assert_eq!(
        ids(&results),
        vec![
            "environment.patches[0]",
            "bucket/patches[0]",
            "bucket/patches[1]",
            "bucket/patches[2]",
            "bucket/patches[3]",
            "bucket/patches[4]",
            "bucket/patches[5]",
        ]
    );

    // The resource has not been observed yet.
    assert_eq!(
        results[5].1.as_ref().unwrap(),
        &PatchResult::SkippedNotObserved {
            resource: "bucket".to_string()
        }
    );
    assert!(results
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != 5)
        .all(|(_, (_, result))| result.as_ref().unwrap().is_applied()));

    assert_eq!(docs.environment.to_value(), json!({"tier": "gold"}));
    assert_eq!(
        docs.desired_resources["bucket"].to_value(),
        json!({
            "apiVersion": "s3.aws.example.org/v1beta1",
            "kind": "Bucket",
            "metadata": {
                "name": "logs-eu-west-1",
                "labels": {"team": "infra"},
                "annotations": {"example.org/tier": "gold"}
            },
            "spec": {"forProvider": {
                "acl": "private",
                "region": "eu-west-1",
                "storageClass": "STANDARD_IA"
            }}
        })
    );
    assert_eq!(docs.desired_composite, Unstructured::new());
}

#[test]
fn test_apply_composition_after_observation() {
    let composition = load_from_str(COMPOSITION, Format::Toml).unwrap();
    let mut docs = documents();
    docs.observed_resources.insert(
        "bucket".to_string(),
        Unstructured::from_value(json!({
            "apiVersion": "s3.aws.example.org/v1beta1",
            "kind": "Bucket",
            "metadata": {"name": "logs-eu-west-1"},
            "status": {"atProvider": {"arn": "arn:aws:s3:::logs-eu-west-1"}}
        }))
        .unwrap(),
    );

    let results = apply_patches(&composition, &mut docs).unwrap();

    assert!(results
        .iter()
        .all(|(_, result)| result.as_ref().unwrap().is_applied()));
    assert_eq!(
        docs.desired_composite.to_value(),
        json!({"status": {"bucketArn": "arn:aws:s3:::logs-eu-west-1"}})
    );
}

#[test]
fn test_existing_desired_resource_keeps_name() {
    let composition = load_from_str(COMPOSITION, Format::Toml).unwrap();
    let mut docs = documents();
    docs.desired_resources.insert(
        "bucket".to_string(),
        Unstructured::from_value(json!({
            "apiVersion": "s3.aws.example.org/v1beta1",
            "kind": "Bucket",
            "metadata": {"name": "pinned", "namespace": "storage"},
            "spec": {"stale": true}
        }))
        .unwrap(),
    );

    apply_patches(&composition, &mut docs).unwrap();

    let bucket = &docs.desired_resources["bucket"];
    // The combine patch still overwrites the restored name.
    assert_eq!(bucket.name(), "logs-eu-west-1");
    assert_eq!(bucket.namespace(), "storage");
    assert!(bucket.object()["spec"].get("stale").is_none());
}

#[test]
fn test_transform_failure_is_isolated() {
    let composition = load_from_str(COMPOSITION, Format::Toml).unwrap();
    let mut docs = documents();
    let mut composite = docs.observed_composite.to_value();
    composite["spec"]["parameters"]["size"] = json!("medium");
    docs.observed_composite = Unstructured::from_value(composite).unwrap();

    let results = apply_patches(&composition, &mut docs).unwrap();

    match &results[4].1 {
        Err(ApplicationError::Patch { id, source }) => {
            assert_eq!(id, "bucket/patches[3]");
            assert!(matches!(source, PatchError::Transform(_)));
            assert_eq!(
                source.to_string(),
                "transform at index 0 returned error: key medium is not found in map"
            );
        }
        other => panic!("expected transform failure, got {other:?}"),
    }
    // Later patches still ran.
    assert_eq!(docs.desired_resources["bucket"].name(), "logs-eu-west-1");
    assert!(docs.desired_resources["bucket"].object()["spec"]["forProvider"]
        .get("storageClass")
        .is_none());
}

#[test]
fn test_nested_patch_set_is_fatal() {
    let json = r#"{
        "patchSets": [
            {"name": "outer", "patches": [{"type": "PatchSet", "patchSetName": "inner"}]},
            {"name": "inner", "patches": [{"fromFieldPath": "spec.a"}]}
        ],
        "resources": [{"name": "bucket", "patches": []}]
    }"#;
    let composition = load_from_str(json, Format::Json).unwrap();
    let mut docs = documents();

    let err = apply_patches(&composition, &mut docs).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot resolve patch sets: a patch in a PatchSet cannot be of type PatchSet (PatchSet outer, patch 0)"
    );
    assert!(docs.desired_resources.is_empty());
}

#[test]
fn test_load_from_path_formats() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("composition.yaml");
    fs::write(
        &yaml,
        r#"
resources:
  - name: bucket
    patches:
      - type: FromCompositeFieldPath
        fromFieldPath: spec.parameters.region
        toFieldPath: spec.forProvider.region
"#,
    )
    .unwrap();
    let toml = dir.path().join("composition.toml");
    fs::write(&toml, COMPOSITION).unwrap();

    assert_eq!(load_from_path(&yaml).unwrap().resources.len(), 1);
    assert_eq!(load_from_path(&toml).unwrap().patch_sets.len(), 1);
}

#[test]
fn test_load_from_path_errors_carry_path() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        load_from_path(&missing).unwrap_err(),
        ConfigError::Io { .. }
    ));

    let unknown = dir.path().join("composition.txt");
    fs::write(&unknown, "").unwrap();
    assert!(matches!(
        load_from_path(&unknown).unwrap_err(),
        ConfigError::UnsupportedFormat { .. }
    ));

    let invalid = dir.path().join("bad.json");
    fs::write(&invalid, r#"{"resources": [{"name": ""}]}"#).unwrap();
    let err = load_from_path(&invalid).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bad.json"), "{message}");
    assert!(message.contains("'resources.name'"), "{message}");
}

#[test]
fn test_optional_policy_is_default() {
    let composition = load_from_str(
        r#"{"resources": [{"name": "bucket", "patches": [
            {"fromFieldPath": "spec.missing", "toFieldPath": "spec.a"},
            {"fromFieldPath": "spec.missing", "toFieldPath": "spec.b",
             "policy": {"fromFieldPath": "Required"}}
        ]}]}"#,
        Format::Json,
    )
    .unwrap();
    let mut docs = documents();

    let results = apply_patches(&composition, &mut docs).unwrap();
    assert!(matches!(
        results[0].1,
        Ok(PatchResult::SkippedOptional { .. })
    ));
    assert!(results[1].1.is_err());
    assert_eq!(docs.desired_resources["bucket"].to_value(), Value::Object(Default::default()));
}
