//! Parsing of C#-style type expressions found in assembly metadata, such as
//! `Task<ActionResult<List<Pet>>>`, `int?` or `Dictionary<string, Pet[]>`.

use std::{iter::Peekable, str::CharIndices};

use super::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
  String,
  Int16,
  Int32,
  Int64,
  Byte,
  Boolean,
  Float,
  Double,
  Decimal,
  DateTime,
  Date,
  TimeSpan,
  Guid,
  Uri,
  Binary,
  Object,
}

impl Primitive {
  fn from_name(name: &str) -> Option<Self> {
    let name = name.strip_prefix("System.").unwrap_or(name);
    let primitive = match name {
      "string" | "String" | "char" | "Char" => Self::String,
      "short" | "Int16" | "ushort" | "UInt16" => Self::Int16,
      "int" | "Int32" | "uint" | "UInt32" => Self::Int32,
      "long" | "Int64" | "ulong" | "UInt64" => Self::Int64,
      "byte" | "Byte" | "sbyte" | "SByte" => Self::Byte,
      "bool" | "Boolean" => Self::Boolean,
      "float" | "Single" => Self::Float,
      "double" | "Double" => Self::Double,
      "decimal" | "Decimal" => Self::Decimal,
      "DateTime" | "DateTimeOffset" => Self::DateTime,
      "DateOnly" => Self::Date,
      "TimeSpan" | "TimeOnly" => Self::TimeSpan,
      "Guid" => Self::Guid,
      "Uri" => Self::Uri,
      "IFormFile" | "Stream" => Self::Binary,
      "object" | "Object" | "JsonElement" => Self::Object,
      _ => return None,
    };
    Some(primitive)
  }

  /// JSON schema `type` and `format`.
  pub const fn schema_type(self) -> (&'static str, Option<&'static str>) {
    match self {
      Self::String => ("string", None),
      Self::Int16 | Self::Int32 => ("integer", Some("int32")),
      Self::Int64 => ("integer", Some("int64")),
      Self::Byte => ("integer", Some("byte")),
      Self::Boolean => ("boolean", None),
      Self::Float => ("number", Some("float")),
      Self::Double => ("number", Some("double")),
      Self::Decimal => ("number", Some("decimal")),
      Self::DateTime => ("string", Some("date-time")),
      Self::Date => ("string", Some("date")),
      Self::TimeSpan => ("string", Some("duration")),
      Self::Guid => ("string", Some("guid")),
      Self::Uri => ("string", Some("uri")),
      Self::Binary => ("string", Some("binary")),
      Self::Object => ("object", None),
    }
  }

  /// Reference types may be null unless told otherwise; value types may not.
  pub const fn is_reference(self) -> bool {
    matches!(self, Self::String | Self::Uri | Self::Binary | Self::Object)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
  Primitive(Primitive),
  Named(String),
  Array(Box<TypeExpr>),
  Map(Box<TypeExpr>),
  Nullable(Box<TypeExpr>),
  /// `IActionResult` and friends: a response without a declared body type.
  Untyped,
  Void,
}

const ARRAY_GENERICS: &[&str] = &[
  "List",
  "IList",
  "IEnumerable",
  "ICollection",
  "IReadOnlyList",
  "IReadOnlyCollection",
  "HashSet",
  "ISet",
];
const MAP_GENERICS: &[&str] = &["Dictionary", "IDictionary", "IReadOnlyDictionary"];
const WRAPPER_GENERICS: &[&str] = &["Task", "ValueTask", "ActionResult"];
const UNTYPED_RESULTS: &[&str] = &["IActionResult", "ActionResult"];

impl TypeExpr {
  pub fn parse(input: &str) -> Result<Self, SchemaError> {
    let mut parser = Parser {
      input,
      chars: input.char_indices().peekable(),
    };
    let expr = parser.parse_type()?;
    parser.skip_whitespace();
    if let Some(&(_, c)) = parser.chars.peek() {
      return Err(parser.error(&format!("unexpected '{c}'")));
    }
    Ok(expr)
  }

  pub fn is_nullable(&self) -> bool {
    matches!(self, Self::Nullable(_))
  }

  fn from_generic(name: &str, mut args: Vec<TypeExpr>) -> Option<Self> {
    let base = name.rsplit('.').next().unwrap_or(name);

    if args.is_empty() {
      if base == "void" || base == "Void" || base == "Task" || base == "ValueTask" {
        return Some(Self::Void);
      }
      if UNTYPED_RESULTS.contains(&base) {
        return Some(Self::Untyped);
      }
      return Some(
        Primitive::from_name(name).map_or_else(|| Self::Named(name.to_string()), Self::Primitive),
      );
    }

    let last = args.pop()?;
    let expr = if ARRAY_GENERICS.contains(&base) && args.is_empty() {
      Self::Array(Box::new(last))
    } else if MAP_GENERICS.contains(&base) && args.len() == 1 {
      Self::Map(Box::new(last))
    } else if WRAPPER_GENERICS.contains(&base) && args.is_empty() {
      last
    } else if base == "Nullable" && args.is_empty() {
      Self::Nullable(Box::new(last))
    } else {
      return None;
    };
    Some(expr)
  }
}

struct Parser<'a> {
  input: &'a str,
  chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
  fn error(&self, message: &str) -> SchemaError {
    SchemaError::InvalidTypeExpression {
      expression: self.input.to_string(),
      message: message.to_string(),
    }
  }

  fn skip_whitespace(&mut self) {
    while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
  }

  fn eat(&mut self, expected: char) -> bool {
    self.skip_whitespace();
    self.chars.next_if(|(_, c)| *c == expected).is_some()
  }

  fn identifier(&mut self) -> Result<String, SchemaError> {
    self.skip_whitespace();
    let mut ident = String::new();
    while let Some((_, c)) = self
      .chars
      .next_if(|(_, c)| c.is_alphanumeric() || matches!(c, '_' | '.' | '+' | '`'))
    {
      ident.push(c);
    }

    if ident.is_empty() {
      return Err(self.error("expected a type name"));
    }
    Ok(ident)
  }

  fn parse_type(&mut self) -> Result<TypeExpr, SchemaError> {
    let name = self.identifier()?;

    let mut args = Vec::new();
    if self.eat('<') {
      loop {
        args.push(self.parse_type()?);
        if self.eat(',') {
          continue;
        }
        if self.eat('>') {
          break;
        }
        return Err(self.error("expected ',' or '>'"));
      }
    }

    let arity = args.len();
    let mut expr =
      TypeExpr::from_generic(&name, args).ok_or_else(|| self.error(&format!("unsupported generic {name}`{arity}")))?;

    loop {
      if self.eat('?') {
        if !expr.is_nullable() {
          expr = TypeExpr::Nullable(Box::new(expr));
        }
      } else if self.eat('[') {
        if !self.eat(']') {
          return Err(self.error("expected ']'"));
        }
        expr = match expr {
          TypeExpr::Primitive(Primitive::Byte) => TypeExpr::Primitive(Primitive::Binary),
          other => TypeExpr::Array(Box::new(other)),
        };
      } else {
        break;
      }
    }

    Ok(expr)
  }
}
