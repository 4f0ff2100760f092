use crate::config::schema::{Composition, ValidationError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Input formats accepted for compositions and documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Picks a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML{}: {source}", in_path(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("failed to parse JSON{}: {source}", in_path(.path))]
    Json {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse YAML{}: {source}", in_path(.path))]
    Yaml {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid composition{}: {source}", in_path(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },

    #[error("unsupported file format: {} (expected .toml, .json, .yaml or .yml)", path.display())]
    UnsupportedFormat { path: PathBuf },
}

fn in_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = Some(path.to_path_buf());
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml { path, source },
            ConfigError::Json { path: None, source } => ConfigError::Json { path, source },
            ConfigError::Yaml { path: None, source } => ConfigError::Yaml { path, source },
            ConfigError::Validation { path: None, source } => {
                ConfigError::Validation { path, source }
            }
            other => other,
        }
    }
}

fn parse<T: DeserializeOwned>(input: &str, format: Format) -> Result<T, ConfigError> {
    match format {
        Format::Toml => toml_edit::de::from_str(input)
            .map_err(|source| ConfigError::Toml { path: None, source }),
        Format::Json => serde_json::from_str(input)
            .map_err(|source| ConfigError::Json { path: None, source }),
        Format::Yaml => serde_yaml::from_str(input)
            .map_err(|source| ConfigError::Yaml { path: None, source }),
    }
}

fn read(path: &Path) -> Result<(String, Format), ConfigError> {
    let format = Format::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((contents, format))
}

/// Parses and validates a composition.
pub fn load_from_str(input: &str, format: Format) -> Result<Composition, ConfigError> {
    let composition: Composition = parse(input, format)?;
    composition
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    tracing::debug!(
        patch_sets = composition.patch_sets.len(),
        resources = composition.resources.len(),
        "loaded composition"
    );
    Ok(composition)
}

/// Loads a composition, picking the format from the file extension.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Composition, ConfigError> {
    let path = path.as_ref();
    let (contents, format) = read(path)?;
    load_from_str(&contents, format).map_err(|error| error.with_path(path))
}

/// Loads any structured document, e.g. an observed resource.
pub fn load_document(path: impl AsRef<Path>) -> Result<Value, ConfigError> {
    let path = path.as_ref();
    let (contents, format) = read(path)?;
    parse(&contents, format).map_err(|error| error.with_path(path))
}
