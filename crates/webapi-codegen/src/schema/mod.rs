//! Stage one: OpenAPI / Swagger document generation from discovered controllers.

mod generator;
mod type_expr;

use anyhow::Context as _;
use serde_json::Value;

pub use self::{
  generator::{DEFAULT_ROUTE_TEMPLATE, WebApiDocumentGenerator},
  type_expr::{Primitive, TypeExpr},
};
use crate::{catalog::TypeSet, config::SchemaSettings};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
  #[error("invalid type expression '{expression}': {message}")]
  InvalidTypeExpression { expression: String, message: String },
  #[error("type '{type_name}' used by {used_by} cannot be resolved")]
  UnresolvedType { type_name: String, used_by: String },
  #[error("action {action} declares unsupported HTTP method '{method}'")]
  InvalidMethod { action: String, method: String },
  #[error("{method} {path} is declared by both {first} and {second}")]
  DuplicateOperation {
    method: String,
    path: String,
    first: String,
    second: String,
  },
  #[error("action {action} declares more than one body parameter")]
  MultipleBodies { action: String },
}

/// Produces an API description document for a set of controller types.
///
/// Implementations must be deterministic: the same settings and type set
/// always yield the same document.
pub trait SchemaGenerator {
  fn generate(&self, settings: &SchemaSettings, types: &TypeSet) -> anyhow::Result<Value>;
}

/// The serialized document as written to disk.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
  pub json: String,
  pub operations: usize,
  pub schemas: usize,
}

impl GeneratedDocument {
  fn from_value(document: &Value) -> anyhow::Result<Self> {
    let operations = document
      .get("paths")
      .and_then(Value::as_object)
      .map_or(0, |paths| {
        paths
          .values()
          .filter_map(Value::as_object)
          .map(|item| item.len())
          .sum()
      });
    let schemas = document
      .pointer("/components/schemas")
      .or_else(|| document.get("definitions"))
      .and_then(Value::as_object)
      .map_or(0, |schemas| schemas.len());

    Ok(Self {
      json: serde_json::to_string_pretty(document)?,
      operations,
      schemas,
    })
  }
}

/// Runs the generator, writes the document to `settings.output` (replacing
/// any previous file) and returns the exact text that was written.
pub async fn generate_document<S: SchemaGenerator>(
  generator: &S,
  settings: &SchemaSettings,
  types: &TypeSet,
) -> anyhow::Result<GeneratedDocument> {
  let document = generator
    .generate(settings, types)
    .context("failed to generate the API document")?;
  let generated = GeneratedDocument::from_value(&document)?;

  if let Some(parent) = settings.output.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  tokio::fs::write(&settings.output, &generated.json)
    .await
    .with_context(|| format!("failed to write API document to {}", settings.output.display()))?;

  Ok(generated)
}
