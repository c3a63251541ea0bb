//! Rust client emission: one model type per schema and a `reqwest` client
//! with an async method per operation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use http::Method;
use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, format_ident, quote};
use serde_json::Value;
use syn::LitStr;

use super::{
  ClientError,
  document::{ApiDocument, ApiOperation, ApiResponse, ParameterLocation},
  naming::{ensure_unique, to_rust_field_name, to_rust_type_name},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
  #[default]
  Public,
  Crate,
  File,
}

impl Visibility {
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "public" => Some(Visibility::Public),
      "crate" => Some(Visibility::Crate),
      "file" => Some(Visibility::File),
      _ => None,
    }
  }

  pub(crate) fn to_tokens(self) -> TokenStream {
    match self {
      Visibility::Public => quote! { pub },
      Visibility::Crate => quote! { pub(crate) },
      Visibility::File => quote! {},
    }
  }
}

#[derive(Clone, Debug)]
pub(crate) struct HttpInitFragment {
  method: Method,
}

impl HttpInitFragment {
  pub(crate) fn new(method: Method) -> Self {
    Self { method }
  }
}

impl ToTokens for HttpInitFragment {
  fn to_tokens(&self, tokens: &mut TokenStream) {
    let ts = match self.method {
      Method::GET => quote! { self.client.get(url) },
      Method::POST => quote! { self.client.post(url) },
      Method::PUT => quote! { self.client.put(url) },
      Method::DELETE => quote! { self.client.delete(url) },
      Method::PATCH => quote! { self.client.patch(url) },
      Method::HEAD => quote! { self.client.head(url) },
      _ => {
        let m = format_ident!("{}", self.method.as_str());
        quote! { self.client.request(reqwest::Method::#m, url) }
      }
    };
    tokens.extend(ts);
  }
}

/// Formatted source of one client file.
#[derive(Debug, Clone)]
pub(crate) struct RenderedClient {
  pub code: String,
  pub operations: usize,
  pub types: usize,
}

// Locals and methods of the generated client that arguments must not shadow.
const RESERVED_LOCALS: &[&str] = &["url", "req_builder", "response", "rb", "value"];
const RESERVED_METHODS: &[&str] = &["new", "with_client", "base_url"];

pub(crate) fn render_client(
  document: &ApiDocument,
  generator: &str,
  client_name: &str,
  visibility: Visibility,
) -> Result<RenderedClient, ClientError> {
  let mut used_types = BTreeSet::from([client_name.to_string()]);
  let mut names = BTreeMap::new();
  for key in document.schemas.keys() {
    let name = ensure_unique(&to_rust_type_name(key), &used_types);
    used_types.insert(name.clone());
    names.insert(key.clone(), name);
  }

  let emitter = Emitter {
    names,
    vis: visibility.to_tokens(),
  };

  let models: Vec<TokenStream> = document
    .schemas
    .iter()
    .map(|(key, schema)| emitter.model(key, schema))
    .collect();

  let mut used_methods: BTreeSet<String> = RESERVED_METHODS.iter().map(ToString::to_string).collect();
  let methods: Vec<TokenStream> = document
    .operations
    .iter()
    .map(|operation| emitter.operation(operation, &mut used_methods))
    .collect();

  let vis = &emitter.vis;
  let client = format_ident!("{}", client_name);
  let code = quote! {
    use serde::{Deserialize, Serialize};

    #(#models)*

    #[derive(Debug, Clone)]
    #vis struct #client {
      client: reqwest::Client,
      base_url: String,
    }

    impl #client {
      #vis fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
      }

      #vis fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
      }

      #vis fn base_url(&self) -> &str {
        &self.base_url
      }

      #(#methods)*
    }
  };

  let syntax_tree = syn::parse2::<syn::File>(code).map_err(|source| ClientError::Render {
    generator: generator.to_string(),
    source,
  })?;
  let formatted = prettyplease::unparse(&syntax_tree);

  let description = document
    .description
    .as_ref()
    .map(|d| d.replace('\n', "\n//! "))
    .unwrap_or_else(|| String::from("No description provided"));

  let code = format!(
    r#"//! AUTO-GENERATED CODE - DO NOT EDIT!
//!
//! {}
//! Version: {}
//! Generated by `webapi-codegen`
//!
//! {}
#![allow(clippy::all)]

{}"#,
    document.title, document.version, description, formatted
  );

  Ok(RenderedClient {
    code,
    operations: document.operations.len(),
    types: document.schemas.len(),
  })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
  Text,
  List,
  Other,
}

#[derive(Debug, Clone)]
struct MappedType {
  tokens: TokenStream,
  nullable: bool,
  shape: Shape,
}

impl MappedType {
  fn other(tokens: TokenStream) -> Self {
    Self {
      tokens,
      nullable: false,
      shape: Shape::Other,
    }
  }

  fn owned(&self) -> TokenStream {
    let tokens = &self.tokens;
    if self.nullable {
      quote! { Option<#tokens> }
    } else {
      tokens.clone()
    }
  }

  /// Argument type: strings are borrowed as `&str`, bodies by reference.
  fn argument(&self, optional: bool, by_ref: bool) -> TokenStream {
    let tokens = &self.tokens;
    let base = match self.shape {
      Shape::Text => quote! { &str },
      _ if by_ref => quote! { &#tokens },
      _ => tokens.clone(),
    };
    if optional { quote! { Option<#base> } } else { base }
  }
}

struct Emitter {
  names: BTreeMap<String, String>,
  vis: TokenStream,
}

impl Emitter {
  fn type_name(&self, reference: &str) -> String {
    let key = reference.rsplit('/').next().unwrap_or(reference);
    self.names.get(key).cloned().unwrap_or_else(|| to_rust_type_name(key))
  }

  fn map(&self, schema: &Value) -> MappedType {
    let mut mapped = self.map_inner(schema);
    mapped.nullable |= is_flagged_nullable(schema);
    mapped
  }

  fn map_inner(&self, schema: &Value) -> MappedType {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
      let ident = format_ident!("{}", self.type_name(reference));
      return MappedType::other(quote! { #ident });
    }
    for key in ["oneOf", "anyOf", "allOf"] {
      if let Some([single]) = schema.get(key).and_then(Value::as_array).map(Vec::as_slice) {
        return self.map(single);
      }
    }

    let (ty, type_nullable) = schema_type(schema);
    let format = schema.get("format").and_then(Value::as_str);
    let mut mapped = match ty {
      Some("string") if format == Some("binary") => MappedType::other(quote! { Vec<u8> }),
      Some("string") => MappedType {
        tokens: quote! { String },
        nullable: false,
        shape: Shape::Text,
      },
      Some("integer") => MappedType::other(match format {
        Some("int32") => quote! { i32 },
        Some("byte") => quote! { u8 },
        _ => quote! { i64 },
      }),
      Some("number") if format == Some("float") => MappedType::other(quote! { f32 }),
      Some("number") => MappedType::other(quote! { f64 }),
      Some("boolean") => MappedType::other(quote! { bool }),
      Some("file") => MappedType::other(quote! { Vec<u8> }),
      Some("array") => {
        let items = schema
          .get("items")
          .map_or_else(|| quote! { serde_json::Value }, |items| self.map(items).owned());
        MappedType {
          tokens: quote! { Vec<#items> },
          nullable: false,
          shape: Shape::List,
        }
      }
      _ => match schema.get("additionalProperties") {
        Some(values) if values.is_object() => {
          let values = self.map(values).owned();
          MappedType::other(quote! { std::collections::HashMap<String, #values> })
        }
        _ => MappedType::other(quote! { serde_json::Value }),
      },
    };
    mapped.nullable |= type_nullable;
    mapped
  }

  fn model(&self, key: &str, schema: &Value) -> TokenStream {
    let name = self.type_name(key);
    let ident = format_ident!("{}", name);
    let vis = &self.vis;
    let doc = doc_attrs(schema.get("description").and_then(Value::as_str));

    if let Some(values) = string_enum_values(schema) {
      let mut used = BTreeSet::new();
      let variants = values.iter().map(|value| {
        let variant = ensure_unique(&to_rust_type_name(value), &used);
        used.insert(variant.clone());
        let variant = format_ident!("{}", variant);
        quote! {
          #[serde(rename = #value)]
          #variant
        }
      });
      return quote! {
        #doc
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #vis enum #ident {
          #(#variants),*
        }
      };
    }

    if !is_object_model(schema) {
      let target = self.map(schema).owned();
      return quote! {
        #doc
        #vis type #ident = #target;
      };
    }

    let mut used = BTreeSet::new();
    let mut fields = Vec::new();
    for part in schema.get("allOf").and_then(Value::as_array).into_iter().flatten() {
      if let Some(reference) = part.get("$ref").and_then(Value::as_str) {
        let base = self.type_name(reference);
        let field = unique_ident(&to_rust_field_name(&base), &mut used);
        let base = format_ident!("{}", base);
        fields.push(quote! {
          #[serde(flatten)]
          #vis #field: #base
        });
      } else {
        self.properties(&name, part, &mut used, &mut fields);
      }
    }
    self.properties(&name, schema, &mut used, &mut fields);

    quote! {
      #doc
      #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
      #vis struct #ident {
        #(#fields),*
      }
    }
  }

  fn properties(&self, owner: &str, schema: &Value, used: &mut BTreeSet<String>, fields: &mut Vec<TokenStream>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
      return;
    };
    let required: Vec<&str> = schema
      .get("required")
      .and_then(Value::as_array)
      .into_iter()
      .flatten()
      .filter_map(Value::as_str)
      .collect();
    let vis = &self.vis;

    for (property, property_schema) in properties {
      let field = unique_ident(&to_rust_field_name(property), used);
      let mapped = self.map(property_schema);
      let optional = mapped.nullable || !required.contains(&property.as_str());

      let mut ty = mapped.tokens;
      if direct_reference(property_schema).is_some_and(|reference| self.type_name(reference) == owner) {
        ty = quote! { Box<#ty> };
      }
      if optional {
        ty = quote! { Option<#ty> };
      }

      let rename = (field.to_string().trim_start_matches("r#") != property.as_str()).then(|| {
        quote! { #[serde(rename = #property)] }
      });
      let skip = optional.then(|| {
        quote! { #[serde(default, skip_serializing_if = "Option::is_none")] }
      });
      let doc = doc_attrs(property_schema.get("description").and_then(Value::as_str));

      fields.push(quote! {
        #doc
        #rename
        #skip
        #vis #field: #ty
      });
    }
  }

  fn operation(&self, operation: &ApiOperation, used_methods: &mut BTreeSet<String>) -> TokenStream {
    let base_name = operation
      .operation_id
      .clone()
      .unwrap_or_else(|| fallback_operation_id(&operation.method, &operation.path));
    let method_name = ensure_unique(&to_rust_field_name(&base_name), used_methods);
    used_methods.insert(method_name.clone());
    let method_ident = format_ident!("{}", method_name);

    let mut used_args: BTreeSet<String> = RESERVED_LOCALS.iter().map(ToString::to_string).collect();
    let mut args = Vec::new();
    let mut path_args = HashMap::new();
    let mut statements = Vec::new();

    for parameter in &operation.parameters {
      let arg = unique_ident(&to_rust_field_name(&parameter.name), &mut used_args);
      let mapped = self.map(&parameter.schema);
      let optional = parameter.location != ParameterLocation::Path && (!parameter.required || mapped.nullable);
      let ty = mapped.argument(optional, false);
      args.push(quote! { #arg: #ty });

      let name = parameter.name.as_str();
      let statement = match (parameter.location, optional, mapped.shape) {
        (ParameterLocation::Path, ..) => {
          path_args.insert(parameter.name.clone(), arg);
          continue;
        }
        (ParameterLocation::Query, false, Shape::List) | (ParameterLocation::Query, true, Shape::Text | Shape::Other) => {
          quote! { let req_builder = #arg.iter().fold(req_builder, |rb, value| rb.query(&[(#name, value)])); }
        }
        (ParameterLocation::Query, true, Shape::List) => {
          quote! { let req_builder = #arg.iter().flatten().fold(req_builder, |rb, value| rb.query(&[(#name, value)])); }
        }
        (ParameterLocation::Query, false, _) => quote! { let req_builder = req_builder.query(&[(#name, &#arg)]); },
        (ParameterLocation::Header, false, Shape::List) => quote! {
          let req_builder = req_builder.header(#name, #arg.iter().map(ToString::to_string).collect::<Vec<_>>().join(","));
        },
        (ParameterLocation::Header, false, _) => quote! { let req_builder = req_builder.header(#name, #arg.to_string()); },
        (ParameterLocation::Header, true, _) => quote! {
          let req_builder = #arg.iter().fold(req_builder, |rb, value| rb.header(#name, value.to_string()));
        },
      };
      statements.push(statement);
    }

    if let Some(body) = &operation.body {
      let arg = unique_ident(&to_rust_field_name(&body.name), &mut used_args);
      let mapped = self.map(&body.schema);
      let optional = !body.required || mapped.nullable;
      let ty = mapped.argument(optional, true);
      args.push(quote! { #arg: #ty });
      statements.push(if optional {
        quote! {
          let req_builder = match #arg {
            Some(body) => req_builder.json(body),
            None => req_builder,
          };
        }
      } else {
        quote! { let req_builder = req_builder.json(#arg); }
      });
    }

    let (format, values) = url_format(&operation.path, &path_args);
    let format = LitStr::new(&format, Span::call_site());
    let init = HttpInitFragment::new(operation.method.clone());

    let (output, finish) = match &operation.response {
      ApiResponse::Empty => (
        quote! { () },
        quote! {
          req_builder.send().await?.error_for_status()?;
          Ok(())
        },
      ),
      ApiResponse::Binary => (
        quote! { Vec<u8> },
        quote! {
          let response = req_builder.send().await?.error_for_status()?;
          Ok(response.bytes().await?.to_vec())
        },
      ),
      ApiResponse::Json(schema) => {
        let output = self.map(schema).owned();
        let finish = quote! {
          let response = req_builder.send().await?.error_for_status()?;
          Ok(response.json::<#output>().await?)
        };
        (output, finish)
      }
    };

    let doc = doc_attrs(operation.summary.as_deref());
    let vis = &self.vis;

    quote! {
      #doc
      #vis async fn #method_ident(&self, #(#args),*) -> anyhow::Result<#output> {
        let url = format!(#format, self.base_url.trim_end_matches('/'), #(#values),*);
        let req_builder = #init;
        #(#statements)*
        #finish
      }
    }
  }
}

fn unique_ident(candidate: &str, used: &mut BTreeSet<String>) -> Ident {
  let name = ensure_unique(candidate, used);
  used.insert(name.clone());
  format_ident!("{}", name)
}

fn doc_attrs(text: Option<&str>) -> TokenStream {
  let lines = text
    .into_iter()
    .flat_map(str::lines)
    .map(|line| format!(" {}", line.trim_end()));
  quote! { #(#[doc = #lines])* }
}

fn is_flagged_nullable(schema: &Value) -> bool {
  ["nullable", "x-nullable"]
    .iter()
    .any(|flag| schema.get(*flag).and_then(Value::as_bool) == Some(true))
}

/// The declared `type`, accepting the `["string", "null"]` array form.
fn schema_type(schema: &Value) -> (Option<&str>, bool) {
  match schema.get("type") {
    Some(Value::String(ty)) => (Some(ty.as_str()), false),
    Some(Value::Array(types)) => {
      let nullable = types.iter().any(|ty| ty == "null");
      let ty = types.iter().filter_map(Value::as_str).find(|ty| *ty != "null");
      (ty, nullable)
    }
    _ => (None, false),
  }
}

fn string_enum_values(schema: &Value) -> Option<Vec<String>> {
  schema
    .get("enum")?
    .as_array()?
    .iter()
    .map(|value| value.as_str().map(str::to_string))
    .collect()
}

fn is_object_model(schema: &Value) -> bool {
  if schema.get("properties").is_some() || schema.get("allOf").is_some_and(|parts| !parts.is_null()) {
    return true;
  }
  schema_type(schema).0 == Some("object") && !schema.get("additionalProperties").is_some_and(Value::is_object)
}

fn direct_reference(schema: &Value) -> Option<&str> {
  if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
    return Some(reference);
  }
  ["oneOf", "anyOf", "allOf"].iter().find_map(|key| match schema.get(*key)?.as_array()?.as_slice() {
    [single] => single.get("$ref").and_then(Value::as_str),
    _ => None,
  })
}

/// `{}` for the base URL, then the path with declared parameters as `{}`.
/// Undeclared placeholders are kept literally.
fn url_format(path: &str, path_args: &HashMap<String, Ident>) -> (String, Vec<Ident>) {
  let mut format = String::from("{}");
  let mut values = Vec::new();
  let mut rest = path;

  while let Some(start) = rest.find('{') {
    format.push_str(&rest[..start].replace('}', "}}"));
    let after = &rest[start + 1..];
    let Some(end) = after.find('}') else {
      format.push_str("{{");
      rest = after;
      continue;
    };

    let name = &after[..end];
    if let Some(ident) = path_args.get(name) {
      format.push_str("{}");
      values.push(ident.clone());
    } else {
      format.push_str(&format!("{{{{{name}}}}}"));
    }
    rest = &after[end + 1..];
  }
  format.push_str(&rest.replace('}', "}}"));

  (format, values)
}

fn fallback_operation_id(method: &Method, path: &str) -> String {
  let parts: Vec<String> = path
    .split('/')
    .filter(|segment| !segment.is_empty())
    .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
      Some(parameter) => format!("by_{parameter}"),
      None => segment.to_string(),
    })
    .collect();

  let method = method.as_str().to_lowercase();
  if parts.is_empty() {
    method
  } else {
    format!("{method}_{}", parts.join("_"))
  }
}
