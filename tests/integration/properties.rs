use patch_and_transform::config::{ComposedPatch, ComposedTemplate, PatchSet, PatchSpec, PatchType};
use patch_and_transform::{composed_templates, resolve_transforms, PatchSetError, Paved};
use proptest::prelude::*;
use serde_json::{json, Value};

fn path_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}"
}

fn direct_patch() -> impl Strategy<Value = PatchSpec> {
    (path_strategy(), proptest::option::of(path_strategy())).prop_map(|(from, to)| {
        let spec = PatchSpec::new(PatchType::FromCompositeFieldPath).from_field_path(from);
        match to {
            Some(to) => spec.to_field_path(to),
            None => spec,
        }
    })
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        ".{0,20}".prop_map(Value::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn template(patches: Vec<ComposedPatch>) -> ComposedTemplate {
    ComposedTemplate {
        name: "resource".to_string(),
        base: None,
        patches,
    }
}

proptest! {
    #[test]
    fn templates_without_references_are_unchanged(
        patches in prop::collection::vec(direct_patch(), 0..8),
    ) {
        let templates = vec![template(patches.into_iter().map(ComposedPatch::from).collect())];
        let resolved = composed_templates(&[], &templates).unwrap();
        prop_assert_eq!(resolved, templates);
    }

    #[test]
    fn reference_is_spliced_in_place(
        before in prop::collection::vec(direct_patch(), 0..5),
        after in prop::collection::vec(direct_patch(), 0..5),
        members in prop::collection::vec(direct_patch(), 0..5),
    ) {
        let set = PatchSet { name: "shared".to_string(), patches: members.clone() };
        let mut patches: Vec<ComposedPatch> =
            before.iter().cloned().map(ComposedPatch::from).collect();
        let k = patches.len();
        patches.push(ComposedPatch::patch_set("shared"));
        patches.extend(after.iter().cloned().map(ComposedPatch::from));
        let original_len = patches.len();

        let resolved = composed_templates(&[set], &[template(patches)]).unwrap();
        let resolved = &resolved[0].patches;

        prop_assert_eq!(resolved.len() + 1, original_len + members.len());
        let spliced: Vec<PatchSpec> = resolved[k..k + members.len()]
            .iter()
            .map(|patch| patch.spec.clone())
            .collect();
        prop_assert_eq!(&spliced[..], &members[..]);
        let tail: Vec<PatchSpec> = resolved[k + members.len()..]
            .iter()
            .map(|patch| patch.spec.clone())
            .collect();
        prop_assert_eq!(tail, after);
    }

    #[test]
    fn nested_patch_set_fails_at_any_position(
        members in prop::collection::vec(direct_patch(), 0..6),
        position in any::<prop::sample::Index>(),
    ) {
        let index = position.index(members.len() + 1);
        let mut patches = members;
        patches.insert(index, PatchSpec::new(PatchType::PatchSet));
        let set = PatchSet { name: "nested".to_string(), patches };

        let err = composed_templates(&[set], &[]).unwrap_err();
        prop_assert_eq!(
            err,
            PatchSetError::PatchSetType { patch_set: "nested".to_string(), index }
        );
    }

    #[test]
    fn empty_pipeline_is_identity(value in value_strategy()) {
        prop_assert_eq!(resolve_transforms(&[], value.clone()).unwrap(), value);
    }

    #[test]
    fn get_returns_what_set_wrote(path in path_strategy(), value in value_strategy()) {
        let mut paved = Paved::new(json!({}));
        paved.set_value(&path, value.clone()).unwrap();
        prop_assert_eq!(paved.get_value(&path).unwrap(), &value);
    }
}
