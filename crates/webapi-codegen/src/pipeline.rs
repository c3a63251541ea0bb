//! The build step end to end: configuration, controller discovery, API
//! document, clients. Stages run strictly one after another and the first
//! failure ends the run.

use std::path::Path;

use anyhow::Context as _;

use crate::{
  catalog::{CatalogLoader, SearchPathRegistry},
  client::{ClientGenerationOutput, ClientGenerator, RustClientGenerator, generate_clients},
  config::{ConfigDocument, SchemaSettings},
  schema::{GeneratedDocument, SchemaGenerator, WebApiDocumentGenerator, generate_document},
  ui::{PipelineLogger, catalog_table},
};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
  pub settings: SchemaSettings,
  pub controllers: Vec<String>,
  pub document: GeneratedDocument,
  pub clients: ClientGenerationOutput,
}

pub struct Pipeline<S = WebApiDocumentGenerator, G = RustClientGenerator> {
  schema_generator: S,
  client_generator: G,
  loader: CatalogLoader,
  registry: SearchPathRegistry,
  logger: PipelineLogger,
}

impl Pipeline {
  pub fn new(logger: PipelineLogger) -> Self {
    Self::with_generators(WebApiDocumentGenerator, RustClientGenerator, logger)
  }
}

impl<S: SchemaGenerator, G: ClientGenerator> Pipeline<S, G> {
  pub fn with_generators(schema_generator: S, client_generator: G, logger: PipelineLogger) -> Self {
    Self {
      schema_generator,
      client_generator,
      loader: CatalogLoader::default(),
      registry: SearchPathRegistry::new(),
      logger,
    }
  }

  /// Folders registered for reference resolution so far. Registrations are
  /// kept across runs of the same pipeline.
  pub fn registry(&self) -> &SearchPathRegistry {
    &self.registry
  }

  pub async fn run(&mut self, config_path: &Path) -> anyhow::Result<PipelineReport> {
    let logger = self.logger;
    logger.info(&format!("Handling configuration file {}", config_path.display()));

    let config = ConfigDocument::load(config_path)
      .await
      .context("failed to read the configuration")?;
    logger.info(&format!("Working directory {}", config.base_dir().display()));
    let settings = config
      .schema_settings(&logger)
      .with_context(|| format!("invalid configuration in {}", config.path().display()))?;
    logger.stat("Output type", settings.schema_type);
    logger.stat("Response nullability", settings.response_null_handling);
    logger.stat("Assemblies", settings.assembly_paths.len());

    logger.info("Loading controller types");
    let discovered = self
      .loader
      .load(&mut self.registry, &settings.assembly_paths, config.base_dir())
      .await
      .context("failed to load controller types")?;
    let (types, unmatched) = discovered.retain_named(&settings.controller_names);
    for name in &unmatched {
      logger.warn(&format!("Controller {name} is not among the discovered types"));
    }
    if !types.is_empty() {
      logger.table(&catalog_table(&types, logger.colors()));
    }
    logger.stat("Controllers", types.len());

    logger.info("Generating API document");
    let document = generate_document(&self.schema_generator, &settings, &types).await?;
    logger.stat("Operations", document.operations);
    logger.stat("Schemas", document.schemas);
    logger.stat("Document", settings.output.display());

    logger.info("Generating clients");
    let clients = generate_clients(
      &self.client_generator,
      config.remainder(),
      &document.json,
      config.base_dir(),
      &logger,
    )
    .await?;
    for skipped in &clients.skipped {
      logger.warn(&format!("No generator handles codeGenerators.{skipped}, skipped"));
    }
    for client in &clients.clients {
      logger.stat(&client.client_name, client.path.display());
    }

    logger.success("Completed");

    Ok(PipelineReport {
      settings,
      controllers: types.names().map(str::to_string).collect(),
      document,
      clients,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use serde_json::{Value, json};

  use super::*;
  use crate::{
    client::{ClientGenerationConfig, TRANSIENT_PREFIX},
    config::SchemaType,
    tests::support::{petstore_assembly, write_json},
  };

  fn fixture(dir: &Path, section: Value) -> PathBuf {
    write_json(&dir.join("bin/Petstore.Api.json"), &petstore_assembly());
    let config = dir.join("nswag.json");
    write_json(
      &config,
      &json!({
        "runtime": "Net80",
        "documentGenerator": { "webApiToOpenApi": section },
        "codeGenerators": { "openApiToRustClient": { "output": "generated/client.rs", "clientName": "PetsClient" } }
      }),
    );
    config
  }

  fn section() -> Value {
    json!({
      "infoTitle": "Petstore",
      "infoDescription": "Pets and more",
      "infoVersion": "1.0.0",
      "output": "out/swagger.json",
      "assemblyPaths": ["bin/Petstore.Api.json"]
    })
  }

  fn transient_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
      .unwrap()
      .filter(|entry| {
        entry
          .as_ref()
          .unwrap()
          .file_name()
          .to_string_lossy()
          .starts_with(TRANSIENT_PREFIX)
      })
      .count()
  }

  struct FailingClientGenerator;

  impl ClientGenerator for FailingClientGenerator {
    async fn execute(&self, _config: &ClientGenerationConfig) -> anyhow::Result<ClientGenerationOutput> {
      anyhow::bail!("client generator failed")
    }
  }

  struct PanickingClientGenerator;

  impl ClientGenerator for PanickingClientGenerator {
    async fn execute(&self, _config: &ClientGenerationConfig) -> anyhow::Result<ClientGenerationOutput> {
      panic!("client stage must not run");
    }
  }

  #[tokio::test]
  async fn test_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), section());

    let report = Pipeline::new(PipelineLogger::default()).run(&config).await.unwrap();

    assert_eq!(report.settings.schema_type, SchemaType::OpenApi3);
    assert_eq!(
      report.controllers,
      vec!["Petstore.Api.PetsController", "Petstore.Api.StoreController"]
    );
    assert_eq!(report.document.operations, 5);

    let written = std::fs::read_to_string(dir.path().join("out/swagger.json")).unwrap();
    assert_eq!(written, report.document.json);

    assert_eq!(report.clients.clients.len(), 1);
    assert!(dir.path().join("generated/client.rs").exists());
    assert_eq!(transient_files(dir.path()), 0);

    let original: Value = serde_json::from_str(&std::fs::read_to_string(&config).unwrap()).unwrap();
    assert!(original.get("documentGenerator").is_some());
  }

  #[tokio::test]
  async fn test_allow_list_and_swagger2() {
    let dir = tempfile::tempdir().unwrap();
    let mut section = section();
    section["outputType"] = json!("Swagger2");
    section["controllerNames"] = json!(["Petstore.Api.StoreController", "Petstore.Api.GoneController"]);
    let config = fixture(dir.path(), section);

    let report = Pipeline::new(PipelineLogger::default()).run(&config).await.unwrap();

    assert_eq!(report.controllers, vec!["Petstore.Api.StoreController"]);
    let document: Value = serde_json::from_str(&report.document.json).unwrap();
    assert_eq!(document["swagger"], "2.0");
    assert_eq!(document["paths"].as_object().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_client_failure_keeps_document_and_removes_transient_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), section());

    let mut pipeline = Pipeline::with_generators(WebApiDocumentGenerator, FailingClientGenerator, PipelineLogger::default());
    let err = pipeline.run(&config).await.unwrap_err();

    assert!(format!("{err:#}").contains("client generator failed"));
    assert!(dir.path().join("out/swagger.json").exists());
    assert_eq!(transient_files(dir.path()), 0);
  }

  #[tokio::test]
  async fn test_missing_section_stops_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("nswag.json"), &json!({ "documentGenerator": {} }));

    let mut pipeline =
      Pipeline::with_generators(WebApiDocumentGenerator, PanickingClientGenerator, PipelineLogger::default());
    let err = pipeline.run(&dir.path().join("nswag.json")).await.unwrap_err();

    assert!(format!("{err:#}").contains("webApiToOpenApi"));
    assert!(!dir.path().join("out").exists());
  }

  #[tokio::test]
  async fn test_missing_assembly_stops_before_schema_generation() {
    let dir = tempfile::tempdir().unwrap();
    let mut section = section();
    section["assemblyPaths"] = json!(["bin/Missing.json"]);
    let config = fixture(dir.path(), section);

    let mut pipeline =
      Pipeline::with_generators(WebApiDocumentGenerator, PanickingClientGenerator, PipelineLogger::default());
    let err = pipeline.run(&config).await.unwrap_err();

    assert!(format!("{err:#}").contains("Missing.json"));
    assert!(!dir.path().join("out/swagger.json").exists());
  }

  #[tokio::test]
  async fn test_repeated_runs_reuse_registry_and_rewrite_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), section());
    let mut pipeline = Pipeline::new(PipelineLogger::default());

    let outputs = || {
      (
        std::fs::read(dir.path().join("out/swagger.json")).unwrap(),
        std::fs::read(dir.path().join("generated/client.rs")).unwrap(),
      )
    };

    pipeline.run(&config).await.unwrap();
    let first = outputs();
    pipeline.run(&config).await.unwrap();
    let second = outputs();

    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    assert_eq!(pipeline.registry().len(), 1);
    assert!(pipeline.registry().contains(dir.path().join("bin/References")));
  }
}
