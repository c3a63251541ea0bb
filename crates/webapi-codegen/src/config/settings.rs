use std::path::PathBuf;

use serde_json::Value;

/// Output flavour of the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SchemaType {
  #[strum(serialize = "swagger2")]
  Swagger2,
  #[default]
  #[strum(serialize = "openapi3")]
  OpenApi3,
}

impl SchemaType {
  /// `swagger2` (any case) selects Swagger 2.0; every other value, including
  /// a missing one, selects OpenAPI 3.
  pub fn from_output_type(output_type: Option<&str>) -> Self {
    match output_type.map(str::parse::<Self>) {
      Some(Ok(Self::Swagger2)) => Self::Swagger2,
      _ => Self::OpenApi3,
    }
  }
}

/// Whether reference types are emitted as nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum ReferenceNullHandling {
  Null,
  NotNull,
}

impl ReferenceNullHandling {
  /// Built-in response handling before the configuration is consulted.
  pub const RESPONSE_BASELINE: Self = Self::NotNull;
  /// Used when the response override is missing or unreadable.
  pub const RESPONSE_FALLBACK: Self = Self::Null;
  /// Properties of reference type.
  pub const REFERENCE_DEFAULT: Self = Self::Null;
  /// Values of dictionaries. Not configurable.
  pub const DICTIONARY_VALUE_DEFAULT: Self = Self::NotNull;

  /// Reads the optional response override. Only the exact literals `Null`
  /// and `NotNull` are recognised. A missing override yields the fallback;
  /// anything else yields the fallback along with a rendering of the
  /// rejected value for logging.
  pub fn from_override(value: Option<&Value>) -> (Self, Option<String>) {
    match value {
      Some(Value::String(raw)) => match raw.parse::<Self>() {
        Ok(handling) => (handling, None),
        Err(_) => (Self::RESPONSE_FALLBACK, Some(format!("\"{raw}\""))),
      },
      Some(other) => (Self::RESPONSE_FALLBACK, Some(other.to_string())),
      None => (Self::RESPONSE_FALLBACK, None),
    }
  }

  pub const fn is_nullable(self) -> bool {
    matches!(self, Self::Null)
  }
}

/// Everything the schema generation stage needs, resolved from the
/// `webApiToOpenApi` section. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct SchemaSettings {
  #[builder(default)]
  pub schema_type: SchemaType,
  #[builder(into)]
  pub title: String,
  #[builder(into)]
  pub description: String,
  #[builder(into)]
  pub version: String,
  #[builder(into)]
  pub output: PathBuf,
  pub assembly_paths: Vec<PathBuf>,
  #[builder(default)]
  pub controller_names: Vec<String>,
  #[builder(default = ReferenceNullHandling::RESPONSE_BASELINE)]
  pub response_null_handling: ReferenceNullHandling,
  #[builder(default = ReferenceNullHandling::REFERENCE_DEFAULT)]
  pub reference_null_handling: ReferenceNullHandling,
  #[builder(default = ReferenceNullHandling::DICTIONARY_VALUE_DEFAULT)]
  pub dictionary_value_null_handling: ReferenceNullHandling,
}
