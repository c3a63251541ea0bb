//! Reading the generator configuration file.
//!
//! The configuration is a single JSON document with two scopes: the
//! `documentGenerator.webApiToOpenApi` section drives schema generation, and
//! everything else is handed to the client generator untouched.

mod section;
mod settings;

use std::path::{Path, PathBuf};

use serde_json::Value;

pub use self::settings::{ReferenceNullHandling, SchemaSettings, SchemaType};
use self::section::Section;
use crate::ui::PipelineLogger;

pub(crate) const DOCUMENT_GENERATOR_KEY: &str = "documentGenerator";
pub(crate) const WEB_API_SECTION: &str = "webApiToOpenApi";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read configuration file {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("configuration file {path} is not valid JSON")]
  Malformed {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("configuration root must be a JSON object")]
  NotAnObject,
  #[error("missing field `{0}` in configuration")]
  MissingField(String),
  #[error("invalid value for `{field}`: expected {expected}")]
  InvalidField { field: String, expected: &'static str },
  #[error("`{0}` must list at least one assembly")]
  NoAssemblies(String),
}

/// The parsed configuration file together with the directory it lives in.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
  path: PathBuf,
  base_dir: PathBuf,
  root: Value,
}

impl ConfigDocument {
  /// Reads and parses the configuration file. Relative paths are resolved
  /// against the current working directory.
  pub async fn load(path: &Path) -> Result<Self, ConfigError> {
    let path = std::path::absolute(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let content = tokio::fs::read_to_string(&path)
      .await
      .map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
      })?;
    let root = serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
      path: path.clone(),
      source,
    })?;
    Self::from_value(path, root)
  }

  pub fn from_value(path: PathBuf, root: Value) -> Result<Self, ConfigError> {
    if !root.is_object() {
      return Err(ConfigError::NotAnObject);
    }
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok(Self { path, base_dir, root })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Directory containing the configuration file; every relative path in the
  /// configuration is resolved against it.
  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }

  pub fn root(&self) -> &Value {
    &self.root
  }

  /// Projects the `webApiToOpenApi` section into schema generation settings.
  pub fn schema_settings(&self, logger: &PipelineLogger) -> Result<SchemaSettings, ConfigError> {
    let section = Section::locate(&self.root, &[DOCUMENT_GENERATOR_KEY, WEB_API_SECTION])?;

    let assembly_paths = section.required_str_array("assemblyPaths")?;
    if assembly_paths.is_empty() {
      return Err(ConfigError::NoAssemblies(section.field_path("assemblyPaths")));
    }

    let response_override = section.optional_value("defaultResponseReferenceTypeNullHandling");
    let (response_null_handling, rejected) = ReferenceNullHandling::from_override(response_override);
    if let Some(raw) = rejected {
      logger.warn(&format!(
        "Could not read defaultResponseReferenceTypeNullHandling ({raw}), using {}",
        ReferenceNullHandling::RESPONSE_FALLBACK
      ));
    } else if response_override.is_none() {
      logger.info(&format!(
        "defaultResponseReferenceTypeNullHandling not set, using {}",
        ReferenceNullHandling::RESPONSE_FALLBACK
      ));
    }

    let settings = SchemaSettings::builder()
      .schema_type(SchemaType::from_output_type(
        section.optional_value("outputType").and_then(Value::as_str),
      ))
      .title(section.required_str("infoTitle")?)
      .description(section.required_str("infoDescription")?)
      .version(section.required_str("infoVersion")?)
      .output(self.base_dir.join(section.required_str("output")?))
      .assembly_paths(assembly_paths.iter().map(|path| self.base_dir.join(path)).collect())
      .controller_names(section.optional_str_array("controllerNames")?.unwrap_or_default())
      .response_null_handling(response_null_handling)
      .build();

    Ok(settings)
  }

  /// The client generator configuration: a copy of the document without the
  /// schema generation section. The document itself is left untouched.
  pub fn remainder(&self) -> Value {
    let mut remainder = self.root.clone();
    if let Value::Object(map) = &mut remainder {
      map.shift_remove(DOCUMENT_GENERATOR_KEY);
    }
    remainder
  }
}

#[cfg(test)]
mod tests;
