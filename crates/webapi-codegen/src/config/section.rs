use serde_json::{Map, Value};

use super::ConfigError;

/// Typed accessors over one JSON object of the configuration, reporting
/// errors with the full dotted path of the offending field.
pub(super) struct Section<'a> {
  path: String,
  fields: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
  pub(super) fn locate(root: &'a Value, keys: &[&str]) -> Result<Self, ConfigError> {
    let mut path = String::new();
    let mut current = root;

    for key in keys {
      if !path.is_empty() {
        path.push('.');
      }
      path.push_str(key);
      current = current.get(key).ok_or_else(|| ConfigError::MissingField(path.clone()))?;
    }

    let fields = current.as_object().ok_or_else(|| ConfigError::InvalidField {
      field: path.clone(),
      expected: "an object",
    })?;

    Ok(Self { path, fields })
  }

  pub(super) fn field_path(&self, key: &str) -> String {
    format!("{}.{key}", self.path)
  }

  pub(super) fn optional_value(&self, key: &str) -> Option<&'a Value> {
    self.fields.get(key).filter(|value| !value.is_null())
  }

  pub(super) fn required_str(&self, key: &str) -> Result<String, ConfigError> {
    self
      .optional_str(key)?
      .ok_or_else(|| ConfigError::MissingField(self.field_path(key)))
  }

  pub(super) fn optional_str(&self, key: &str) -> Result<Option<String>, ConfigError> {
    match self.optional_value(key) {
      None => Ok(None),
      Some(Value::String(value)) => Ok(Some(value.clone())),
      Some(_) => Err(self.invalid(key, "a string")),
    }
  }

  pub(super) fn required_str_array(&self, key: &str) -> Result<Vec<String>, ConfigError> {
    self
      .optional_str_array(key)?
      .ok_or_else(|| ConfigError::MissingField(self.field_path(key)))
  }

  pub(super) fn optional_str_array(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(value) = self.optional_value(key) else {
      return Ok(None);
    };

    let items = value.as_array().ok_or_else(|| self.invalid(key, "an array of strings"))?;
    items
      .iter()
      .map(|item| {
        item
          .as_str()
          .map(str::to_string)
          .ok_or_else(|| self.invalid(key, "an array of strings"))
      })
      .collect::<Result<Vec<_>, _>>()
      .map(Some)
  }

  fn invalid(&self, key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidField {
      field: self.field_path(key),
      expected,
    }
  }
}
