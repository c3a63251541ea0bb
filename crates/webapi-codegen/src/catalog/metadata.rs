use std::{fmt, path::Path};

use fmmap::tokio::{AsyncMmapFile, AsyncMmapFileExt};
use serde::Deserialize;

use super::CatalogError;

/// Exported metadata of one compiled assembly: identity, references and types.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyMetadata {
  pub name: String,
  #[serde(default)]
  pub version: Option<String>,
  #[serde(default)]
  pub references: Vec<AssemblyReference>,
  #[serde(default)]
  pub types: Vec<TypeDef>,
}

impl AssemblyMetadata {
  pub async fn read(path: &Path) -> Result<Self, CatalogError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
      return Err(CatalogError::NotFound(path.to_path_buf()));
    }

    let file = AsyncMmapFile::open(path).await.map_err(|source| CatalogError::Open {
      path: path.to_path_buf(),
      source,
    })?;

    serde_json::from_slice(file.as_slice()).map_err(|source| CatalogError::Malformed {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn identity(&self) -> AssemblyIdentity {
    AssemblyIdentity {
      name: self.name.clone(),
      version: self.version.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyIdentity {
  pub name: String,
  pub version: Option<String>,
}

impl fmt::Display for AssemblyIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.version {
      Some(version) => write!(f, "{}, Version={version}", self.name),
      None => f.write_str(&self.name),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssemblyReference {
  pub name: String,
  #[serde(default)]
  pub version: Option<String>,
}

impl AssemblyReference {
  pub(crate) fn accepts(&self, metadata: &AssemblyMetadata) -> bool {
    metadata.name == self.name
      && match &self.version {
        Some(version) => metadata.version.as_ref() == Some(version),
        None => true,
      }
  }
}

impl fmt::Display for AssemblyReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.version {
      Some(version) => write!(f, "{}, Version={version}", self.name),
      None => f.write_str(&self.name),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
  #[default]
  Class,
  Enum,
  Interface,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
  pub full_name: String,
  #[serde(default)]
  pub kind: TypeKind,
  #[serde(default, rename = "abstract")]
  pub is_abstract: bool,
  #[serde(default)]
  pub base_type: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub route: Option<String>,
  #[serde(default)]
  pub actions: Vec<ActionDef>,
  #[serde(default)]
  pub properties: Vec<PropertyDef>,
  #[serde(default)]
  pub values: Vec<String>,
}

impl TypeDef {
  /// Type name without its namespace.
  pub fn short_name(&self) -> &str {
    short_name(&self.full_name)
  }
}

pub(crate) fn short_name(full_name: &str) -> &str {
  full_name.rsplit(['.', '+']).next().unwrap_or(full_name)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDef {
  pub name: String,
  pub method: String,
  #[serde(default)]
  pub route: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub parameters: Vec<ParameterDef>,
  #[serde(default)]
  pub returns: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSource {
  Path,
  Query,
  Header,
  Body,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDef {
  pub name: String,
  #[serde(rename = "type")]
  pub type_name: String,
  #[serde(default)]
  pub source: Option<ParameterSource>,
  #[serde(default)]
  pub required: Option<bool>,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
  pub name: String,
  #[serde(rename = "type")]
  pub type_name: String,
  #[serde(default)]
  pub required: bool,
  #[serde(default, rename = "abstract")]
  pub is_abstract: bool,
  #[serde(default)]
  pub description: Option<String>,
}
