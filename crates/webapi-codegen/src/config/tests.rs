use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use super::*;

fn document(section: Value) -> ConfigDocument {
  let root = json!({
    "runtime": "Net80",
    "documentGenerator": { "webApiToOpenApi": section },
    "codeGenerators": { "openApiToRustClient": { "output": "client.rs" } }
  });
  ConfigDocument::from_value(PathBuf::from("/work/api/nswag.json"), root).unwrap()
}

fn full_section() -> Value {
  json!({
    "outputType": "OpenApi3",
    "infoTitle": "Pets",
    "infoDescription": "Pet store",
    "infoVersion": "1.2.0",
    "output": "openapi.json",
    "assemblyPaths": ["bin/Pets.Api.json", "../shared/Shared.Api.json"]
  })
}

fn with_field(key: &str, value: Value) -> Value {
  let mut section = full_section();
  section[key] = value;
  section
}

fn without_field(key: &str) -> Value {
  let mut section = full_section();
  section.as_object_mut().unwrap().remove(key);
  section
}

fn resolve(section: Value) -> Result<SchemaSettings, ConfigError> {
  document(section).schema_settings(&PipelineLogger::default())
}

#[test]
fn test_reads_required_fields() {
  let settings = resolve(full_section()).unwrap();

  assert_eq!(settings.title, "Pets");
  assert_eq!(settings.description, "Pet store");
  assert_eq!(settings.version, "1.2.0");
  assert_eq!(settings.output, Path::new("/work/api/openapi.json"));
  assert_eq!(
    settings.assembly_paths,
    vec![
      PathBuf::from("/work/api/bin/Pets.Api.json"),
      PathBuf::from("/work/api/../shared/Shared.Api.json"),
    ]
  );
  assert!(settings.controller_names.is_empty());
}

#[test]
fn test_fixed_nullability_axes() {
  let settings = resolve(full_section()).unwrap();
  assert_eq!(settings.reference_null_handling, ReferenceNullHandling::Null);
  assert_eq!(settings.dictionary_value_null_handling, ReferenceNullHandling::NotNull);
}

#[test]
fn test_output_type_selection() {
  for (value, expected) in [
    (json!("swagger2"), SchemaType::Swagger2),
    (json!("Swagger2"), SchemaType::Swagger2),
    (json!("SWAGGER2"), SchemaType::Swagger2),
    (json!("openapi3"), SchemaType::OpenApi3),
    (json!("swagger"), SchemaType::OpenApi3),
    (json!(""), SchemaType::OpenApi3),
    (json!(3), SchemaType::OpenApi3),
    (json!(true), SchemaType::OpenApi3),
    (json!(["swagger2"]), SchemaType::OpenApi3),
    (json!({ "type": "swagger2" }), SchemaType::OpenApi3),
  ] {
    let settings = resolve(with_field("outputType", value.clone())).unwrap();
    assert_eq!(settings.schema_type, expected, "outputType {value}");
  }

  let settings = resolve(without_field("outputType")).unwrap();
  assert_eq!(settings.schema_type, SchemaType::OpenApi3);
}

#[test]
fn test_response_null_handling_override() {
  let cases = [
    (Some(json!("NotNull")), ReferenceNullHandling::NotNull),
    (Some(json!("Null")), ReferenceNullHandling::Null),
    (Some(json!("notnull")), ReferenceNullHandling::Null),
    (Some(json!("Nullable")), ReferenceNullHandling::Null),
    (Some(json!(42)), ReferenceNullHandling::Null),
    (Some(json!({ "value": "NotNull" })), ReferenceNullHandling::Null),
    (None, ReferenceNullHandling::Null),
  ];

  for (value, expected) in cases {
    let section = match &value {
      Some(value) => with_field("defaultResponseReferenceTypeNullHandling", value.clone()),
      None => full_section(),
    };
    let settings = resolve(section).unwrap();
    assert_eq!(settings.response_null_handling, expected, "override {value:?}");
  }
}

#[test]
fn test_override_reports_fallback_reason() {
  let (handling, reason) = ReferenceNullHandling::from_override(Some(&json!("Maybe")));
  assert_eq!(handling, ReferenceNullHandling::RESPONSE_FALLBACK);
  assert_eq!(reason.as_deref(), Some("\"Maybe\""));

  let (handling, reason) = ReferenceNullHandling::from_override(Some(&json!(7)));
  assert_eq!(handling, ReferenceNullHandling::RESPONSE_FALLBACK);
  assert_eq!(reason.as_deref(), Some("7"));

  let (handling, reason) = ReferenceNullHandling::from_override(Some(&json!("NotNull")));
  assert_eq!(handling, ReferenceNullHandling::NotNull);
  assert!(reason.is_none());
}

#[test]
fn test_missing_override_is_not_reported_as_rejected() {
  let (handling, reason) = ReferenceNullHandling::from_override(None);
  assert_eq!(handling, ReferenceNullHandling::RESPONSE_FALLBACK);
  assert!(reason.is_none());
}

#[test]
fn test_controller_allow_list() {
  let settings = resolve(with_field("controllerNames", json!(["Foo.BarController"]))).unwrap();
  assert_eq!(settings.controller_names, vec!["Foo.BarController".to_string()]);

  let settings = resolve(with_field("controllerNames", Value::Null)).unwrap();
  assert!(settings.controller_names.is_empty());
}

#[test]
fn test_missing_required_fields() {
  for key in ["infoTitle", "infoDescription", "infoVersion", "output", "assemblyPaths"] {
    let err = resolve(without_field(key)).unwrap_err();
    match err {
      ConfigError::MissingField(field) => {
        assert_eq!(field, format!("documentGenerator.webApiToOpenApi.{key}"));
      }
      other => panic!("expected missing field for {key}, got {other:?}"),
    }
  }
}

#[test]
fn test_missing_section_is_fatal() {
  let root = json!({ "documentGenerator": {} });
  let document = ConfigDocument::from_value(PathBuf::from("/work/nswag.json"), root).unwrap();
  let err = document.schema_settings(&PipelineLogger::default()).unwrap_err();
  assert!(matches!(err, ConfigError::MissingField(ref field) if field == "documentGenerator.webApiToOpenApi"));

  let root = json!({ "codeGenerators": {} });
  let document = ConfigDocument::from_value(PathBuf::from("/work/nswag.json"), root).unwrap();
  let err = document.schema_settings(&PipelineLogger::default()).unwrap_err();
  assert!(matches!(err, ConfigError::MissingField(ref field) if field == "documentGenerator"));
}

#[test]
fn test_empty_assembly_list_is_rejected() {
  let err = resolve(with_field("assemblyPaths", json!([]))).unwrap_err();
  assert!(matches!(err, ConfigError::NoAssemblies(_)));
  assert!(err.to_string().contains("assemblyPaths"));
}

#[test]
fn test_wrong_field_types() {
  let err = resolve(with_field("infoTitle", json!(7))).unwrap_err();
  assert!(matches!(err, ConfigError::InvalidField { .. }));

  let err = resolve(with_field("assemblyPaths", json!(["a.json", 3]))).unwrap_err();
  assert!(err.to_string().contains("documentGenerator.webApiToOpenApi.assemblyPaths"));
}

#[test]
fn test_remainder_drops_document_generator_only() {
  let document = document(full_section());
  let remainder = document.remainder();

  assert!(remainder.get("documentGenerator").is_none());
  assert_eq!(remainder["runtime"], "Net80");
  assert_eq!(remainder["codeGenerators"]["openApiToRustClient"]["output"], "client.rs");
  assert!(document.root().get("documentGenerator").is_some());
}

#[test]
fn test_root_must_be_object() {
  let err = ConfigDocument::from_value(PathBuf::from("/work/nswag.json"), json!([1, 2])).unwrap_err();
  assert!(matches!(err, ConfigError::NotAnObject));
}

#[tokio::test]
async fn test_load_resolves_base_dir() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("nswag.json");
  tokio::fs::write(&path, json!({ "documentGenerator": {} }).to_string())
    .await
    .unwrap();

  let document = ConfigDocument::load(&path).await.unwrap();
  assert_eq!(document.base_dir(), dir.path());
  assert_eq!(document.path(), path);
}

#[tokio::test]
async fn test_load_reports_unreadable_and_malformed_files() {
  let dir = tempfile::tempdir().unwrap();

  let err = ConfigDocument::load(&dir.path().join("missing.json")).await.unwrap_err();
  assert!(matches!(err, ConfigError::Read { .. }));

  let path = dir.path().join("broken.json");
  tokio::fs::write(&path, "{ not json").await.unwrap();
  let err = ConfigDocument::load(&path).await.unwrap_err();
  assert!(matches!(err, ConfigError::Malformed { .. }));
}
