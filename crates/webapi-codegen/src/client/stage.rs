use std::path::Path;

use anyhow::Context as _;
use serde_json::{Map, Value, json};

use super::{ClientGenerationConfig, ClientGenerationOutput, ClientGenerator, config::FROM_DOCUMENT_KEY};
use crate::{config::DOCUMENT_GENERATOR_KEY, ui::PipelineLogger};

/// File name prefix of the transient client configuration.
pub const TRANSIENT_PREFIX: &str = ".webapi-codegen-";

/// The remainder configuration with a `documentGenerator` that points the
/// client generator at `document_json` itself.
pub(crate) fn transient_config(remainder: Value, document_json: &str) -> Value {
  let mut transient = match remainder {
    Value::Object(fields) => fields,
    _ => Map::new(),
  };
  transient.insert(
    DOCUMENT_GENERATOR_KEY.to_string(),
    json!({ FROM_DOCUMENT_KEY: { "json": document_json } }),
  );
  Value::Object(transient)
}

/// Runs `generator` against a transient configuration written to a random
/// file in `base_dir`. Failures are logged with their full chain and returned;
/// the transient file is removed either way.
pub async fn generate_clients<G: ClientGenerator>(
  generator: &G,
  remainder: Value,
  document_json: &str,
  base_dir: &Path,
  logger: &PipelineLogger,
) -> anyhow::Result<ClientGenerationOutput> {
  let contents = serde_json::to_string_pretty(&transient_config(remainder, document_json))
    .context("failed to serialize the client configuration")?;

  let transient = tempfile::Builder::new()
    .prefix(TRANSIENT_PREFIX)
    .suffix(".json")
    .tempfile_in(base_dir)
    .with_context(|| format!("failed to create a client configuration in {}", base_dir.display()))?;

  let result = run(generator, transient.path(), &contents, document_json).await;
  if let Err(error) = &result {
    logger.error(error);
  }
  if let Err(error) = transient.close() {
    logger.warn(&format!("could not remove the transient client configuration: {error}"));
  }

  result
}

async fn run<G: ClientGenerator>(
  generator: &G,
  path: &Path,
  contents: &str,
  document_json: &str,
) -> anyhow::Result<ClientGenerationOutput> {
  tokio::fs::write(path, contents)
    .await
    .with_context(|| format!("failed to write {}", path.display()))?;

  let mut config = ClientGenerationConfig::load(path)
    .await
    .context("failed to load the client configuration")?;
  config.bind_document(document_json);

  generator.execute(&config).await.context("client generation failed")
}
