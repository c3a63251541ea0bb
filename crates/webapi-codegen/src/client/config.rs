use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::ClientError;
use crate::config::DOCUMENT_GENERATOR_KEY;

pub(crate) const FROM_DOCUMENT_KEY: &str = "fromDocument";
pub(crate) const CODE_GENERATORS_KEY: &str = "codeGenerators";

/// Where the client generator reads its API document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
  Literal(String),
  File(PathBuf),
}

/// Configuration of the client generation stage, loaded from a file shaped
/// like the main configuration (`documentGenerator.fromDocument` plus
/// `codeGenerators`).
#[derive(Debug, Clone)]
pub struct ClientGenerationConfig {
  path: PathBuf,
  base_dir: PathBuf,
  source: DocumentSource,
  code_generators: Map<String, Value>,
}

impl ClientGenerationConfig {
  pub async fn load(path: &Path) -> Result<Self, ClientError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|source| ClientError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let root: Value = serde_json::from_str(&text).map_err(|source| ClientError::Malformed {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_value(path.to_path_buf(), &root)
  }

  pub fn from_value(path: PathBuf, root: &Value) -> Result<Self, ClientError> {
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let from_document = root
      .get(DOCUMENT_GENERATOR_KEY)
      .and_then(|generator| generator.get(FROM_DOCUMENT_KEY))
      .ok_or(ClientError::MissingSource)?;
    let source = if let Some(json) = from_document.get("json").and_then(Value::as_str) {
      DocumentSource::Literal(json.to_string())
    } else if let Some(url) = from_document.get("url").and_then(Value::as_str) {
      DocumentSource::File(base_dir.join(url))
    } else {
      return Err(ClientError::MissingSource);
    };

    let code_generators = match root.get(CODE_GENERATORS_KEY) {
      None | Some(Value::Null) => Map::new(),
      Some(Value::Object(generators)) => generators.clone(),
      Some(_) => {
        return Err(ClientError::InvalidGenerator {
          generator: CODE_GENERATORS_KEY.to_string(),
          message: "expected an object".to_string(),
        });
      }
    };

    Ok(Self {
      path,
      base_dir,
      source,
      code_generators,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Folder relative output paths are resolved against.
  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }

  pub fn source(&self) -> &DocumentSource {
    &self.source
  }

  /// Replaces the document source with an in-memory document.
  pub fn bind_document(&mut self, json: impl Into<String>) {
    self.source = DocumentSource::Literal(json.into());
  }

  pub fn code_generators(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.code_generators.iter().map(|(name, entry)| (name.as_str(), entry))
  }

  pub async fn document_text(&self) -> Result<String, ClientError> {
    match &self.source {
      DocumentSource::Literal(json) => Ok(json.clone()),
      DocumentSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| ClientError::Read {
        path: path.clone(),
        source,
      }),
    }
  }
}
