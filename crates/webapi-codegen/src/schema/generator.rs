use std::{
  collections::{BTreeMap, HashMap, HashSet},
  sync::LazyLock,
};

use http::Method;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value, json};

use super::{
  SchemaError, SchemaGenerator,
  type_expr::{Primitive, TypeExpr},
};
use crate::{
  catalog::{ActionDef, CatalogType, LoadContext, ParameterDef, ParameterSource, TypeDef, TypeKind, TypeSet},
  config::{SchemaSettings, SchemaType},
};

/// Route used by controllers that do not declare one.
pub const DEFAULT_ROUTE_TEMPLATE: &str = "[controller]";

const GENERATOR_NAME: &str = concat!("webapi-codegen v", env!("CARGO_PKG_VERSION"));
const JSON_MEDIA_TYPE: &str = "application/json";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";

// `{id}`, `{id:int}`, `{id?}`, `{**path}`
static ROUTE_PARAMETER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\{\*{0,2}([A-Za-z_][A-Za-z0-9_]*)(?::[^}?]*)?\??\}").unwrap());

/// Builds OpenAPI 3 or Swagger 2 documents from controller metadata, using
/// ASP.NET Core routing conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebApiDocumentGenerator;

impl SchemaGenerator for WebApiDocumentGenerator {
  fn generate(&self, settings: &SchemaSettings, types: &TypeSet) -> anyhow::Result<Value> {
    let mut builder = DocumentBuilder::new(settings);
    for controller in types.iter() {
      builder.add_controller(controller)?;
    }
    Ok(builder.finish())
  }
}

struct DocumentBuilder<'a> {
  settings: &'a SchemaSettings,
  paths: IndexMap<String, Map<String, Value>>,
  operation_owners: HashMap<(String, String), String>,
  schemas: BTreeMap<String, Value>,
  schema_names: HashMap<String, String>,
  used_names: HashSet<String>,
}

impl<'a> DocumentBuilder<'a> {
  fn new(settings: &'a SchemaSettings) -> Self {
    Self {
      settings,
      paths: IndexMap::new(),
      operation_owners: HashMap::new(),
      schemas: BTreeMap::new(),
      schema_names: HashMap::new(),
      used_names: HashSet::new(),
    }
  }

  fn is_swagger2(&self) -> bool {
    self.settings.schema_type == SchemaType::Swagger2
  }

  fn ref_prefix(&self) -> &'static str {
    if self.is_swagger2() {
      "#/definitions/"
    } else {
      "#/components/schemas/"
    }
  }

  fn add_controller(&mut self, controller: &CatalogType) -> Result<(), SchemaError> {
    let definition = &controller.definition;
    let short = definition.short_name();
    let name = short.strip_suffix("Controller").filter(|n| !n.is_empty()).unwrap_or(short);
    let template = definition.route.as_deref().unwrap_or(DEFAULT_ROUTE_TEMPLATE);

    for action in &definition.actions {
      let method = parse_method(&action.method).ok_or_else(|| SchemaError::InvalidMethod {
        action: format!("{}.{}", definition.full_name, action.name),
        method: action.method.clone(),
      })?;
      let path = build_path(template, action.route.as_deref(), name, &action.name);
      let method_key = method.as_str().to_ascii_lowercase();
      let owner = format!("{}.{}", definition.full_name, action.name);

      if let Some(first) = self.operation_owners.get(&(path.clone(), method_key.clone())) {
        return Err(SchemaError::DuplicateOperation {
          method: method.to_string(),
          path,
          first: first.clone(),
          second: owner,
        });
      }

      let operation = self.operation(name, action, &path, &owner, &controller.context)?;
      self.operation_owners.insert((path.clone(), method_key.clone()), owner);
      self.paths.entry(path).or_default().insert(method_key, operation);
    }

    Ok(())
  }

  fn operation(
    &mut self,
    controller: &str,
    action: &ActionDef,
    path: &str,
    owner: &str,
    context: &LoadContext,
  ) -> Result<Value, SchemaError> {
    let route_parameters: Vec<String> = ROUTE_PARAMETER_RE
      .captures_iter(path)
      .map(|caps| caps[1].to_ascii_lowercase())
      .collect();

    let mut operation = Map::new();
    operation.insert("tags".into(), json!([controller]));
    if let Some(description) = &action.description {
      operation.insert("summary".into(), json!(description));
    }
    operation.insert("operationId".into(), json!(format!("{controller}_{}", action.name)));

    let mut parameters = Vec::new();
    let mut body: Option<(usize, &ParameterDef, TypeExpr)> = None;

    for (index, parameter) in action.parameters.iter().enumerate() {
      let expr = TypeExpr::parse(&parameter.type_name)?;
      let source = match parameter.source {
        Some(source) => source,
        None => infer_source(parameter, &expr, &route_parameters, context),
      };

      if source == ParameterSource::Body {
        if body.is_some() {
          return Err(SchemaError::MultipleBodies {
            action: owner.to_string(),
          });
        }
        body = Some((index, parameter, expr));
        continue;
      }

      parameters.push(self.parameter(index, parameter, &expr, source, owner, context)?);
    }

    if let Some((index, parameter, expr)) = &body {
      let schema = self.schema_for(expr, owner, context)?;
      let nullable = expr.is_nullable();
      if self.is_swagger2() {
        let mut body_parameter = json!({
          "name": parameter.name,
          "in": "body",
          "required": parameter.required.unwrap_or(!nullable),
          "schema": schema,
          "x-position": index + 1,
        });
        if nullable {
          body_parameter["x-nullable"] = json!(true);
        }
        parameters.push(body_parameter);
      } else {
        operation.insert(
          "requestBody".into(),
          json!({
            "x-name": parameter.name,
            "content": { JSON_MEDIA_TYPE: { "schema": schema } },
            "required": parameter.required.unwrap_or(!nullable),
            "x-position": index + 1,
          }),
        );
      }
    }

    if self.is_swagger2() && body.is_some() {
      operation.insert("consumes".into(), json!([JSON_MEDIA_TYPE]));
    }
    if !parameters.is_empty() {
      operation.insert("parameters".into(), Value::Array(parameters));
    }

    let returns = action
      .returns
      .as_deref()
      .map(TypeExpr::parse)
      .transpose()?
      .unwrap_or(TypeExpr::Void);
    self.add_responses(&mut operation, &returns, owner, context)?;

    Ok(Value::Object(operation))
  }

  fn parameter(
    &mut self,
    index: usize,
    parameter: &ParameterDef,
    expr: &TypeExpr,
    source: ParameterSource,
    owner: &str,
    context: &LoadContext,
  ) -> Result<Value, SchemaError> {
    let location = match source {
      ParameterSource::Path => "path",
      ParameterSource::Header => "header",
      _ => "query",
    };
    let required = source == ParameterSource::Path
      || parameter
        .required
        .unwrap_or(!expr.is_nullable() && !self.is_reference(expr, context));
    let schema = self.schema_for(expr, owner, context)?;

    let mut object = Map::new();
    object.insert("name".into(), json!(parameter.name));
    object.insert("in".into(), json!(location));
    object.insert("required".into(), json!(required));
    if let Some(description) = &parameter.description {
      object.insert("description".into(), json!(description));
    }

    if self.is_swagger2() {
      match schema {
        Value::Object(fields) if fields.contains_key("$ref") => {
          object.insert("type".into(), json!("string"));
          object.insert("x-schema".into(), Value::Object(fields));
        }
        Value::Object(fields) => object.extend(fields),
        _ => {}
      }
    } else {
      object.insert("schema".into(), schema);
    }
    object.insert("x-position".into(), json!(index + 1));

    Ok(Value::Object(object))
  }

  fn add_responses(
    &mut self,
    operation: &mut Map<String, Value>,
    returns: &TypeExpr,
    owner: &str,
    context: &LoadContext,
  ) -> Result<(), SchemaError> {
    let swagger2 = self.is_swagger2();

    let (response, produces) = match returns {
      TypeExpr::Void => (json!({ "description": "" }), None),
      TypeExpr::Untyped if swagger2 => (
        json!({ "description": "", "schema": { "type": "file" } }),
        Some(BINARY_MEDIA_TYPE),
      ),
      TypeExpr::Untyped => (
        json!({
          "description": "",
          "content": { BINARY_MEDIA_TYPE: { "schema": { "type": "string", "format": "binary" } } }
        }),
        None,
      ),
      expr => {
        let mut schema = self.schema_for(expr, owner, context)?;
        if self.settings.response_null_handling.is_nullable() && self.is_reference(expr, context) {
          schema = self.nullable(schema);
        }
        if swagger2 {
          (json!({ "description": "", "schema": schema }), Some(JSON_MEDIA_TYPE))
        } else {
          (
            json!({ "description": "", "content": { JSON_MEDIA_TYPE: { "schema": schema } } }),
            None,
          )
        }
      }
    };

    if let Some(media_type) = produces {
      operation.insert("produces".into(), json!([media_type]));
    }
    operation.insert("responses".into(), json!({ "200": response }));
    Ok(())
  }

  /// Whether values of this type may be null in .NET.
  fn is_reference(&self, expr: &TypeExpr, context: &LoadContext) -> bool {
    match expr {
      TypeExpr::Primitive(primitive) => primitive.is_reference(),
      TypeExpr::Named(name) => context
        .resolve_type(name)
        .is_none_or(|definition| definition.kind != TypeKind::Enum),
      TypeExpr::Array(_) | TypeExpr::Map(_) | TypeExpr::Untyped => true,
      TypeExpr::Nullable(_) | TypeExpr::Void => false,
    }
  }

  fn nullable(&self, schema: Value) -> Value {
    let mut fields = match schema {
      Value::Object(fields) => fields,
      other => return other,
    };

    if self.is_swagger2() {
      fields.insert("x-nullable".into(), json!(true));
      return Value::Object(fields);
    }

    if fields.contains_key("$ref") {
      json!({ "nullable": true, "oneOf": [Value::Object(fields)] })
    } else {
      fields.insert("nullable".into(), json!(true));
      Value::Object(fields)
    }
  }

  fn schema_for(&mut self, expr: &TypeExpr, owner: &str, context: &LoadContext) -> Result<Value, SchemaError> {
    let schema = match expr {
      TypeExpr::Primitive(primitive) => primitive_schema(*primitive),
      TypeExpr::Array(items) => json!({ "type": "array", "items": self.schema_for(items, owner, context)? }),
      TypeExpr::Map(values) => {
        let mut value_schema = self.schema_for(values, owner, context)?;
        if self.settings.dictionary_value_null_handling.is_nullable() && self.is_reference(values, context) {
          value_schema = self.nullable(value_schema);
        }
        json!({ "type": "object", "additionalProperties": value_schema })
      }
      TypeExpr::Nullable(inner) => {
        let schema = self.schema_for(inner, owner, context)?;
        self.nullable(schema)
      }
      TypeExpr::Named(name) => {
        let definition = context
          .resolve_type(name)
          .ok_or_else(|| SchemaError::UnresolvedType {
            type_name: name.clone(),
            used_by: owner.to_string(),
          })?;
        let schema_name = self.ensure_schema(definition, context)?;
        json!({ "$ref": format!("{}{schema_name}", self.ref_prefix()) })
      }
      TypeExpr::Untyped | TypeExpr::Void => json!({}),
    };
    Ok(schema)
  }

  fn ensure_schema(&mut self, definition: &TypeDef, context: &LoadContext) -> Result<String, SchemaError> {
    if let Some(name) = self.schema_names.get(&definition.full_name) {
      return Ok(name.clone());
    }

    let name = self.allocate_name(definition.short_name());
    self.schema_names.insert(definition.full_name.clone(), name.clone());
    let schema = self.model_schema(definition, context)?;
    self.schemas.insert(name.clone(), schema);
    Ok(name)
  }

  fn allocate_name(&mut self, short_name: &str) -> String {
    let base: String = short_name
      .chars()
      .map(|c| if c.is_alphanumeric() { c } else { '_' })
      .collect();
    let mut candidate = base.clone();
    let mut suffix = 2;
    while !self.used_names.insert(candidate.clone()) {
      candidate = format!("{base}{suffix}");
      suffix += 1;
    }
    candidate
  }

  fn model_schema(&mut self, definition: &TypeDef, context: &LoadContext) -> Result<Value, SchemaError> {
    let mut own = Map::new();

    if definition.kind == TypeKind::Enum {
      own.insert("type".into(), json!("string"));
      if let Some(description) = &definition.description {
        own.insert("description".into(), json!(description));
      }
      own.insert("x-enumNames".into(), json!(definition.values));
      own.insert("enum".into(), json!(definition.values));
      return Ok(Value::Object(own));
    }

    own.insert("type".into(), json!("object"));
    let mut required = Vec::new();
    let mut properties = Map::new();

    for property in definition.properties.iter().filter(|property| !property.is_abstract) {
      let expr = TypeExpr::parse(&property.type_name)?;
      let mut schema = self.schema_for(&expr, &definition.full_name, context)?;

      if property.required {
        required.push(property.name.clone());
      } else if !expr.is_nullable()
        && self.settings.reference_null_handling.is_nullable()
        && self.is_reference(&expr, context)
      {
        schema = self.nullable(schema);
      }

      if let (Some(description), Value::Object(fields)) = (&property.description, &mut schema)
        && !fields.contains_key("$ref")
      {
        fields.insert("description".into(), json!(description));
      }
      properties.insert(property.name.clone(), schema);
    }

    if !required.is_empty() {
      own.insert("required".into(), json!(required));
    }
    own.insert("properties".into(), Value::Object(properties));

    let base = definition
      .base_type
      .as_deref()
      .and_then(|base| context.resolve_type(base))
      .filter(|base| base.kind == TypeKind::Class);

    let mut schema = match base {
      Some(base) => {
        let base_name = self.ensure_schema(base, context)?;
        let mut composed = Map::new();
        composed.insert(
          "allOf".into(),
          json!([{ "$ref": format!("{}{base_name}", self.ref_prefix()) }, Value::Object(own)]),
        );
        composed
      }
      None => own,
    };

    if let Some(description) = &definition.description {
      schema.insert("description".into(), json!(description));
    }
    if definition.is_abstract {
      schema.insert("x-abstract".into(), json!(true));
    }

    Ok(Value::Object(schema))
  }

  fn finish(self) -> Value {
    let info = json!({
      "title": self.settings.title,
      "description": self.settings.description,
      "version": self.settings.version,
    });
    let paths: Map<String, Value> = self
      .paths
      .into_iter()
      .map(|(path, operations)| (path, Value::Object(operations)))
      .collect();
    let schemas: Map<String, Value> = self.schemas.into_iter().collect();

    match self.settings.schema_type {
      SchemaType::Swagger2 => json!({
        "x-generator": GENERATOR_NAME,
        "swagger": "2.0",
        "info": info,
        "paths": paths,
        "definitions": schemas,
      }),
      SchemaType::OpenApi3 => json!({
        "x-generator": GENERATOR_NAME,
        "openapi": "3.0.0",
        "info": info,
        "paths": paths,
        "components": { "schemas": schemas },
      }),
    }
  }
}

fn parse_method(raw: &str) -> Option<Method> {
  let method = Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).ok()?;
  [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
  ]
  .contains(&method)
  .then_some(method)
}

fn primitive_schema(primitive: Primitive) -> Value {
  match primitive.schema_type() {
    ("object", _) => json!({}),
    (ty, Some(format)) => json!({ "type": ty, "format": format }),
    (ty, None) => json!({ "type": ty }),
  }
}

/// Parameters without an explicit source bind from the route when the
/// template names them, from the body when they are complex, and from the
/// query string otherwise.
fn infer_source(
  parameter: &ParameterDef,
  expr: &TypeExpr,
  route_parameters: &[String],
  context: &LoadContext,
) -> ParameterSource {
  if route_parameters.contains(&parameter.name.to_ascii_lowercase()) {
    return ParameterSource::Path;
  }

  let complex = match expr {
    TypeExpr::Named(name) => context
      .resolve_type(name)
      .is_none_or(|definition| definition.kind != TypeKind::Enum),
    TypeExpr::Map(_) => true,
    TypeExpr::Array(items) => matches!(**items, TypeExpr::Named(_)),
    _ => false,
  };

  if complex {
    ParameterSource::Body
  } else {
    ParameterSource::Query
  }
}

/// Combines controller and action routes, substituting `[controller]` and
/// `[action]` and normalising parameter constraints to `{name}`. An action
/// route starting with `/` or `~/` replaces the controller route.
pub(crate) fn build_path(template: &str, action_route: Option<&str>, controller: &str, action: &str) -> String {
  let mut segments: Vec<&str> = Vec::new();

  match action_route {
    Some(route) if route.starts_with('/') || route.starts_with("~/") => {
      segments.push(route.trim_start_matches('~'));
    }
    Some(route) => {
      segments.push(template);
      segments.push(route);
    }
    None => segments.push(template),
  }

  let joined = segments
    .iter()
    .map(|segment| segment.trim_matches('/'))
    .filter(|segment| !segment.is_empty())
    .collect::<Vec<_>>()
    .join("/")
    .replace("[controller]", controller)
    .replace("[action]", action);

  format!("/{}", ROUTE_PARAMETER_RE.replace_all(&joined, "{$1}"))
}
