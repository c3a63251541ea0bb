//! Stage two: API client generation from the in-memory document.
//!
//! The stage writes a transient configuration beside the main configuration
//! file, loads it the same way a standalone client generator run would, binds
//! the freshly generated document and executes every configured code
//! generator. The transient file is removed whatever the outcome.

mod codegen;
mod config;
mod document;
mod naming;
mod rust_client;
mod stage;

use std::{future::Future, path::PathBuf};

pub use self::{
  codegen::Visibility,
  config::{ClientGenerationConfig, DocumentSource},
  rust_client::{RUST_CLIENT_GENERATOR, RustClientGenerator, RustClientSettings},
  stage::{TRANSIENT_PREFIX, generate_clients},
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  #[error("failed to read {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("client configuration {path} is malformed")]
  Malformed {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("client configuration has no documentGenerator.fromDocument source")]
  MissingSource,
  #[error("API document is not valid JSON")]
  InvalidDocumentJson(#[source] serde_json::Error),
  #[error("API document is neither OpenAPI 3 nor Swagger 2")]
  UnsupportedDocument,
  #[error("invalid API document: {0}")]
  InvalidDocument(String),
  #[error("code generator '{generator}' is misconfigured: {message}")]
  InvalidGenerator { generator: String, message: String },
  #[error("generated code for '{generator}' is not valid Rust")]
  Render {
    generator: String,
    #[source]
    source: syn::Error,
  },
  #[error("failed to write {path}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Turns a loaded client configuration into generated client files.
pub trait ClientGenerator {
  fn execute(&self, config: &ClientGenerationConfig) -> impl Future<Output = anyhow::Result<ClientGenerationOutput>>;
}

/// One file written by a code generator entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedClient {
  pub generator: String,
  pub client_name: String,
  pub path: PathBuf,
  pub operations: usize,
  pub types: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientGenerationOutput {
  pub clients: Vec<GeneratedClient>,
  /// `codeGenerators` entries no generator handled.
  pub skipped: Vec<String>,
}
