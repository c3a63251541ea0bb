//! Flavor-independent view of an OpenAPI 3 or Swagger 2 document, reduced to
//! what the client emitter needs.

use http::Method;
use serde_json::{Map, Value};

use super::ClientError;

const JSON_MEDIA_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentFlavor {
  OpenApi3,
  Swagger2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParameterLocation {
  Path,
  Query,
  Header,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiParameter {
  pub name: String,
  pub location: ParameterLocation,
  pub required: bool,
  pub schema: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiBody {
  pub name: String,
  pub required: bool,
  pub schema: Value,
}

#[derive(Debug, Clone)]
pub(crate) enum ApiResponse {
  Empty,
  Binary,
  Json(Value),
}

#[derive(Debug, Clone)]
pub(crate) struct ApiOperation {
  pub method: Method,
  pub path: String,
  pub operation_id: Option<String>,
  pub summary: Option<String>,
  pub parameters: Vec<ApiParameter>,
  pub body: Option<ApiBody>,
  pub response: ApiResponse,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiDocument {
  pub flavor: DocumentFlavor,
  pub title: String,
  pub version: String,
  pub description: Option<String>,
  pub schemas: Map<String, Value>,
  pub operations: Vec<ApiOperation>,
}

impl ApiDocument {
  pub(crate) fn parse(text: &str) -> Result<Self, ClientError> {
    let root: Value = serde_json::from_str(text).map_err(ClientError::InvalidDocumentJson)?;

    let flavor = if root
      .get("openapi")
      .and_then(Value::as_str)
      .is_some_and(|version| version.starts_with("3."))
    {
      DocumentFlavor::OpenApi3
    } else if root.get("swagger").and_then(Value::as_str) == Some("2.0") {
      DocumentFlavor::Swagger2
    } else {
      return Err(ClientError::UnsupportedDocument);
    };

    let info_field = |field: &str| {
      root
        .get("info")
        .and_then(|info| info.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
    };

    let schemas_pointer = match flavor {
      DocumentFlavor::OpenApi3 => "/components/schemas",
      DocumentFlavor::Swagger2 => "/definitions",
    };
    let schemas = root
      .pointer(schemas_pointer)
      .and_then(Value::as_object)
      .cloned()
      .unwrap_or_default();

    let mut operations = Vec::new();
    if let Some(paths) = root.get("paths").and_then(Value::as_object) {
      for (path, item) in paths {
        let item = item
          .as_object()
          .ok_or_else(|| ClientError::InvalidDocument(format!("path item {path} is not an object")))?;
        let shared_parameters = item.get("parameters").and_then(Value::as_array);

        for (key, operation) in item {
          let Some(method) = operation_method(key) else {
            continue;
          };
          operations.push(parse_operation(flavor, method, path, operation, shared_parameters)?);
        }
      }
    }

    Ok(Self {
      flavor,
      title: info_field("title").unwrap_or_default(),
      version: info_field("version").unwrap_or_default(),
      description: info_field("description").filter(|description| !description.is_empty()),
      schemas,
      operations,
    })
  }
}

fn operation_method(key: &str) -> Option<Method> {
  let method = match key {
    "get" => Method::GET,
    "post" => Method::POST,
    "put" => Method::PUT,
    "delete" => Method::DELETE,
    "patch" => Method::PATCH,
    "head" => Method::HEAD,
    "options" => Method::OPTIONS,
    _ => return None,
  };
  Some(method)
}

fn parse_operation(
  flavor: DocumentFlavor,
  method: Method,
  path: &str,
  operation: &Value,
  shared_parameters: Option<&Vec<Value>>,
) -> Result<ApiOperation, ClientError> {
  let label = format!("{method} {path}");
  let text = |field: &str| operation.get(field).and_then(Value::as_str).map(str::to_string);

  let mut parameters = Vec::new();
  let mut body = None;
  let declared = shared_parameters
    .into_iter()
    .flatten()
    .chain(operation.get("parameters").and_then(Value::as_array).into_iter().flatten());

  for parameter in declared {
    let name = parameter
      .get("name")
      .and_then(Value::as_str)
      .ok_or_else(|| ClientError::InvalidDocument(format!("{label} has a parameter without a name")))?;
    let required = parameter.get("required").and_then(Value::as_bool).unwrap_or(false);

    let location = match parameter.get("in").and_then(Value::as_str) {
      Some("path") => ParameterLocation::Path,
      Some("query") => ParameterLocation::Query,
      Some("header") => ParameterLocation::Header,
      Some("body") => {
        body = Some(ApiBody {
          name: name.to_string(),
          required,
          schema: parameter.get("schema").cloned().unwrap_or(Value::Null),
        });
        continue;
      }
      // cookies and form fields are not emitted
      _ => continue,
    };

    let schema = match flavor {
      DocumentFlavor::OpenApi3 => parameter.get("schema").cloned().unwrap_or(Value::Null),
      DocumentFlavor::Swagger2 => parameter.get("x-schema").cloned().unwrap_or_else(|| parameter.clone()),
    };

    parameters.push(ApiParameter {
      name: name.to_string(),
      location,
      required: required || location == ParameterLocation::Path,
      schema,
    });
  }

  if let Some(request_body) = operation.get("requestBody") {
    body = Some(ApiBody {
      name: request_body
        .get("x-name")
        .and_then(Value::as_str)
        .unwrap_or("body")
        .to_string(),
      required: request_body.get("required").and_then(Value::as_bool).unwrap_or(false),
      schema: request_body
        .get("content")
        .and_then(preferred_media)
        .and_then(|media| media.get("schema"))
        .cloned()
        .unwrap_or(Value::Null),
    });
  }

  Ok(ApiOperation {
    method,
    path: path.to_string(),
    operation_id: text("operationId"),
    summary: text("summary").or_else(|| text("description")),
    parameters,
    body,
    response: parse_response(flavor, operation.get("responses")),
  })
}

/// The `200` response, or the first other `2xx` one.
fn parse_response(flavor: DocumentFlavor, responses: Option<&Value>) -> ApiResponse {
  let Some(responses) = responses.and_then(Value::as_object) else {
    return ApiResponse::Empty;
  };
  let success = responses
    .get("200")
    .or_else(|| {
      responses
        .iter()
        .find(|(status, _)| status.starts_with('2'))
        .map(|(_, response)| response)
    });
  let Some(success) = success else {
    return ApiResponse::Empty;
  };

  let schema = match flavor {
    DocumentFlavor::Swagger2 => success.get("schema"),
    DocumentFlavor::OpenApi3 => success
      .get("content")
      .and_then(preferred_media)
      .and_then(|media| media.get("schema")),
  };

  match schema {
    None => ApiResponse::Empty,
    Some(schema) if is_binary(schema) => ApiResponse::Binary,
    Some(schema) => ApiResponse::Json(schema.clone()),
  }
}

fn preferred_media(content: &Value) -> Option<&Value> {
  let content = content.as_object()?;
  content.get(JSON_MEDIA_TYPE).or_else(|| content.values().next())
}

fn is_binary(schema: &Value) -> bool {
  let ty = schema.get("type").and_then(Value::as_str);
  let format = schema.get("format").and_then(Value::as_str);
  ty == Some("file") || (ty == Some("string") && format == Some("binary"))
}
