use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// The patch-and-transform input: reusable patch sets, environment patches
/// and one template per composed resource.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    #[serde(default)]
    pub patch_sets: Vec<PatchSet>,
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,
    #[serde(default)]
    pub resources: Vec<ComposedTemplate>,
}

impl Composition {
    pub fn environment_patches(&self) -> &[EnvironmentPatch] {
        self.environment
            .as_ref()
            .map(|env| env.patches.as_slice())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let mut set_names = HashSet::new();
        for set in &self.patch_sets {
            if set.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "patchSets.name",
                });
            } else if !set_names.insert(set.name.as_str()) {
                issues.push(ValidationIssue::InvalidCombo {
                    patch_id: None,
                    message: format!("duplicate patch set name '{}'", set.name),
                });
            }
            for (idx, patch) in set.patches.iter().enumerate() {
                let id = format!("patchSets[{}].patches[{idx}]", set.name);
                validate_patch(&id, patch, &mut issues);
            }
        }

        for (idx, patch) in self.environment_patches().iter().enumerate() {
            let id = format!("environment.patches[{idx}]");
            validate_patch(&id, &patch.spec, &mut issues);
        }

        let mut resource_names = HashSet::new();
        for template in &self.resources {
            if template.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "resources.name",
                });
            } else if !resource_names.insert(template.name.as_str()) {
                issues.push(ValidationIssue::InvalidCombo {
                    patch_id: None,
                    message: format!("duplicate resource name '{}'", template.name),
                });
            }
            if let Some(base) = &template.base {
                if !base.is_object() {
                    issues.push(ValidationIssue::InvalidCombo {
                        patch_id: None,
                        message: format!("resource '{}' base must be an object", template.name),
                    });
                }
            }
            for (idx, patch) in template.patches.iter().enumerate() {
                let id = template.patch_id(idx);
                if patch.spec.patch_type == PatchType::PatchSet {
                    if patch.patch_set_name.as_deref().unwrap_or("").trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(id),
                            field: "patchSetName",
                        });
                    }
                    continue;
                }
                validate_patch(&id, &patch.spec, &mut issues);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn validate_patch(id: &str, patch: &PatchSpec, issues: &mut Vec<ValidationIssue>) {
    let missing = |field| ValidationIssue::MissingField {
        patch_id: Some(id.to_string()),
        field,
    };

    if patch.patch_type == PatchType::PatchSet {
        // Only meaningful on composed-resource patches; elsewhere it is a no-op.
        return;
    }

    if patch.patch_type.is_combine() {
        match &patch.combine {
            None => issues.push(missing("combine")),
            Some(combine) => {
                if combine.variables.is_empty() {
                    issues.push(missing("combine.variables"));
                }
                for variable in &combine.variables {
                    if variable.from_field_path.trim().is_empty() {
                        issues.push(missing("combine.variables.fromFieldPath"));
                    }
                }
                if combine.strategy.trim().is_empty() {
                    issues.push(missing("combine.strategy"));
                }
            }
        }
        if patch.to_field_path.as_deref().unwrap_or("").trim().is_empty() {
            issues.push(missing("toFieldPath"));
        }
    } else if patch.from_field_path.as_deref().unwrap_or("").trim().is_empty() {
        issues.push(missing("fromFieldPath"));
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub patches: Vec<EnvironmentPatch>,
}

/// A named template for one composed resource.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ComposedTemplate {
    pub name: String,
    /// JSON object rendered onto the desired composed resource before patching.
    #[serde(default)]
    pub base: Option<Value>,
    #[serde(default)]
    pub patches: Vec<ComposedPatch>,
}

impl ComposedTemplate {
    pub fn patch_id(&self, idx: usize) -> String {
        format!("{}/patches[{idx}]", self.name)
    }
}

/// A named, reusable list of patches.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PatchSet {
    pub name: String,
    #[serde(default)]
    pub patches: Vec<PatchSpec>,
}

impl PatchSet {
    /// The set's patches in the shape used by composed-resource templates.
    pub fn composed_patches(&self) -> Vec<ComposedPatch> {
        self.patches
            .iter()
            .cloned()
            .map(|spec| ComposedPatch {
                spec,
                patch_set_name: None,
            })
            .collect()
    }
}

/// The fields shared by every patch.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatchSpec {
    #[serde(rename = "type", default)]
    pub patch_type: PatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine: Option<Combine>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PatchPolicy>,
}

impl PatchSpec {
    pub fn new(patch_type: PatchType) -> Self {
        Self {
            patch_type,
            ..Self::default()
        }
    }

    pub fn from_field_path(mut self, path: impl Into<String>) -> Self {
        self.from_field_path = Some(path.into());
        self
    }

    pub fn to_field_path(mut self, path: impl Into<String>) -> Self {
        self.to_field_path = Some(path.into());
        self
    }

    pub fn with_combine(mut self, combine: Combine) -> Self {
        self.combine = Some(combine);
        self
    }

    pub fn with_transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn with_policy(mut self, policy: PatchPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Whether a source path that does not resolve must fail the patch.
    pub fn from_field_path_required(&self) -> bool {
        matches!(
            self.policy.as_ref().and_then(|p| p.from_field_path),
            Some(FromFieldPathPolicy::Required)
        )
    }
}

/// A patch between the observed composite and the environment.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct EnvironmentPatch {
    #[serde(flatten)]
    pub spec: PatchSpec,
}

impl From<PatchSpec> for EnvironmentPatch {
    fn from(spec: PatchSpec) -> Self {
        Self { spec }
    }
}

/// A patch to or from a composed resource. May reference a patch set.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComposedPatch {
    #[serde(flatten)]
    pub spec: PatchSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_set_name: Option<String>,
}

impl ComposedPatch {
    pub fn patch_set(name: impl Into<String>) -> Self {
        Self {
            spec: PatchSpec::new(PatchType::PatchSet),
            patch_set_name: Some(name.into()),
        }
    }
}

impl From<PatchSpec> for ComposedPatch {
    fn from(spec: PatchSpec) -> Self {
        Self {
            spec,
            patch_set_name: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PatchType {
    #[default]
    FromCompositeFieldPath,
    CombineFromComposite,
    ToCompositeFieldPath,
    CombineToComposite,
    FromEnvironmentFieldPath,
    CombineFromEnvironment,
    ToEnvironmentFieldPath,
    CombineToEnvironment,
    PatchSet,
}

impl PatchType {
    pub const ALL: [PatchType; 9] = [
        PatchType::FromCompositeFieldPath,
        PatchType::CombineFromComposite,
        PatchType::ToCompositeFieldPath,
        PatchType::CombineToComposite,
        PatchType::FromEnvironmentFieldPath,
        PatchType::CombineFromEnvironment,
        PatchType::ToEnvironmentFieldPath,
        PatchType::CombineToEnvironment,
        PatchType::PatchSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatchType::FromCompositeFieldPath => "FromCompositeFieldPath",
            PatchType::CombineFromComposite => "CombineFromComposite",
            PatchType::ToCompositeFieldPath => "ToCompositeFieldPath",
            PatchType::CombineToComposite => "CombineToComposite",
            PatchType::FromEnvironmentFieldPath => "FromEnvironmentFieldPath",
            PatchType::CombineFromEnvironment => "CombineFromEnvironment",
            PatchType::ToEnvironmentFieldPath => "ToEnvironmentFieldPath",
            PatchType::CombineToEnvironment => "CombineToEnvironment",
            PatchType::PatchSet => "PatchSet",
        }
    }

    pub fn is_combine(&self) -> bool {
        matches!(
            self,
            PatchType::CombineFromComposite
                | PatchType::CombineToComposite
                | PatchType::CombineFromEnvironment
                | PatchType::CombineToEnvironment
        )
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PatchPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_field_path: Option<FromFieldPathPolicy>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum FromFieldPathPolicy {
    /// A missing source value skips the patch.
    #[default]
    Optional,
    /// A missing source value fails the patch.
    Required,
}

/// Combines several source values into one.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Combine {
    /// Name of a registered combine strategy, e.g. `string`.
    pub strategy: String,
    pub variables: Vec<CombineVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<StringCombine>,
}

impl Combine {
    pub fn string(format: impl Into<String>, paths: &[&str]) -> Self {
        Self {
            strategy: "string".to_string(),
            variables: paths
                .iter()
                .map(|path| CombineVariable {
                    from_field_path: path.to_string(),
                })
                .collect(),
            string: Some(StringCombine {
                format: format.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CombineVariable {
    pub from_field_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StringCombine {
    #[serde(rename = "fmt")]
    pub format: String,
}

/// One step of a transform pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Transform {
    Map { map: BTreeMap<String, Value> },
    Math { math: MathTransform },
    String { string: StringTransform },
    Convert { convert: ConvertTransform },
}

impl Transform {
    pub fn kind(&self) -> &'static str {
        match self {
            Transform::Map { .. } => "map",
            Transform::Math { .. } => "math",
            Transform::String { .. } => "string",
            Transform::Convert { .. } => "convert",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum MathTransform {
    Multiply {
        multiply: i64,
    },
    ClampMin {
        #[serde(rename = "clampMin")]
        clamp_min: i64,
    },
    ClampMax {
        #[serde(rename = "clampMax")]
        clamp_max: i64,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum StringTransform {
    Format { fmt: String },
    Convert { convert: StringConversion },
    TrimPrefix { trim: String },
    TrimSuffix { trim: String },
    Regexp { regexp: StringRegexp },
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum StringConversion {
    ToUpper,
    ToLower,
    ToBase64,
    FromBase64,
    ToJson,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StringRegexp {
    #[serde(rename = "match")]
    pub pattern: String,
    /// Capture group to return; the whole match when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTransform {
    pub to_type: ConvertType,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConvertType {
    String,
    Int64,
    Float64,
    Bool,
}

impl fmt::Display for ConvertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConvertType::String => "string",
            ConvertType::Int64 => "int64",
            ConvertType::Float64 => "float64",
            ConvertType::Bool => "bool",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "composition missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid composition: {message}"),
            },
        }
    }
}
