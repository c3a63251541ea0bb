use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{
  ClientError, ClientGenerationConfig, ClientGenerationOutput, ClientGenerator, GeneratedClient,
  codegen::{Visibility, render_client},
  document::ApiDocument,
  naming::to_rust_type_name,
};

/// Name of the `codeGenerators` entry handled by [`RustClientGenerator`].
pub const RUST_CLIENT_GENERATOR: &str = "openApiToRustClient";

const DEFAULT_CLIENT_NAME: &str = "ApiClient";

/// Settings of one `openApiToRustClient` entry.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct RustClientSettings {
  #[builder(into)]
  pub output: PathBuf,
  #[builder(into)]
  pub client_name: Option<String>,
  #[builder(default)]
  pub visibility: Visibility,
}

impl RustClientSettings {
  pub fn from_entry(entry: &Value, base_dir: &Path) -> Result<Self, ClientError> {
    let invalid = |message: &str| ClientError::InvalidGenerator {
      generator: RUST_CLIENT_GENERATOR.to_string(),
      message: message.to_string(),
    };
    let entry = entry.as_object().ok_or_else(|| invalid("expected an object"))?;
    let text = |field: &str| match entry.get(field) {
      None | Some(Value::Null) => Ok(None),
      Some(Value::String(value)) => Ok(Some(value.clone())),
      Some(_) => Err(invalid(&format!("'{field}' must be a string"))),
    };

    let output = text("output")?.ok_or_else(|| invalid("'output' is required"))?;
    let visibility = match text("visibility")? {
      Some(visibility) => {
        Visibility::parse(&visibility).ok_or_else(|| invalid("'visibility' must be one of public, crate, file"))?
      }
      None => Visibility::default(),
    };

    Ok(Self {
      output: base_dir.join(output),
      client_name: text("clientName")?,
      visibility,
    })
  }

  fn resolved_client_name(&self, document: &ApiDocument) -> String {
    match &self.client_name {
      Some(name) => to_rust_type_name(name),
      None if document.title.trim().is_empty() => DEFAULT_CLIENT_NAME.to_string(),
      None => format!("{}Client", to_rust_type_name(&document.title)),
    }
  }
}

/// Emits a typed `reqwest` client per `openApiToRustClient` entry. Other
/// entries are reported as skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustClientGenerator;

impl ClientGenerator for RustClientGenerator {
  async fn execute(&self, config: &ClientGenerationConfig) -> anyhow::Result<ClientGenerationOutput> {
    let document = ApiDocument::parse(&config.document_text().await?)?;
    let mut output = ClientGenerationOutput::default();

    for (name, entry) in config.code_generators() {
      if name != RUST_CLIENT_GENERATOR {
        output.skipped.push(name.to_string());
        continue;
      }

      let settings = RustClientSettings::from_entry(entry, config.base_dir())?;
      let client_name = settings.resolved_client_name(&document);
      let rendered = render_client(&document, name, &client_name, settings.visibility)?;

      if let Some(parent) = settings.output.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|source| ClientError::Write {
          path: parent.to_path_buf(),
          source,
        })?;
      }
      tokio::fs::write(&settings.output, &rendered.code)
        .await
        .map_err(|source| ClientError::Write {
          path: settings.output.clone(),
          source,
        })?;

      output.clients.push(GeneratedClient {
        generator: name.to_string(),
        client_name,
        path: settings.output,
        operations: rendered.operations,
        types: rendered.types,
      });
    }

    Ok(output)
  }
}
