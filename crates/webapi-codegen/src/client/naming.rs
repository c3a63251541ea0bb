use std::{
  collections::{BTreeSet, HashSet},
  sync::LazyLock,
};

use any_ascii::any_ascii;
use inflections::Inflect;
use regex::Regex;

static FORBIDDEN_IDENTIFIERS: LazyLock<HashSet<&str>> = LazyLock::new(|| {
  [
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
    "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "async", "await", "dyn", "try", "abstract", "become", "box", "do",
    "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "gen",
  ]
  .into_iter()
  .collect()
});

// Names that would shadow prelude items or derive macros in the generated file.
static RESERVED_TYPE_NAMES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
  [
    "Clone", "Copy", "Debug", "Default", "Deserialize", "Display", "Option", "Result", "Self", "Send", "Serialize",
    "String", "Sync", "Type", "Vec",
  ]
  .into_iter()
  .collect()
});

static INVALID_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());
static MULTI_UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// Transliterates to ASCII, replaces everything that cannot appear in an
/// identifier with `_`, collapses runs of `_` and trims them from both ends.
pub(crate) fn sanitize(input: &str) -> String {
  let ascii = any_ascii(input);
  let replaced = INVALID_CHARS_RE.replace_all(&ascii, "_");
  let collapsed = MULTI_UNDERSCORE_RE.replace_all(&replaced, "_");

  collapsed.trim_matches('_').to_string()
}

/// `snake_case` identifier for methods, fields and arguments. Keywords become
/// raw identifiers, `self` becomes `self_`.
pub(crate) fn to_rust_field_name(name: &str) -> String {
  let mut ident = sanitize(name).to_snake_case();

  if ident.is_empty() {
    return "_".to_string();
  }
  if ident == "self" {
    return "self_".to_string();
  }
  if FORBIDDEN_IDENTIFIERS.contains(ident.as_str()) {
    return format!("r#{ident}");
  }

  prefix_if_digit_start(&mut ident, '_');
  ident
}

/// `PascalCase` identifier for structs, enums and variants.
///
/// Input that is already mixed case without separators (`PetKind`) keeps its
/// capitalization; anything else is split into words first.
pub(crate) fn to_rust_type_name(name: &str) -> String {
  let has_separators = name.contains(['-', '_', '.', ' ']);
  let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
  let has_lower = name.chars().any(|c| c.is_ascii_lowercase());

  let mut ident: String = if !has_separators && has_upper && has_lower {
    let cleaned: String = any_ascii(name).chars().filter(char::is_ascii_alphanumeric).collect();
    let mut chars = cleaned.chars();
    match chars.next() {
      Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
      None => String::new(),
    }
  } else {
    sanitize(name).to_lowercase().to_pascal_case()
  };

  if ident.is_empty() {
    return "Unnamed".to_string();
  }
  if RESERVED_TYPE_NAMES.contains(ident.as_str()) {
    ident.push_str("Model");
  }

  prefix_if_digit_start(&mut ident, 'T');
  ident
}

/// Appends a numeric suffix, starting at 2, until `base_name` is not in `used_names`.
pub(crate) fn ensure_unique(base_name: &str, used_names: &BTreeSet<String>) -> String {
  if !used_names.contains(base_name) {
    return base_name.to_string();
  }
  (2..)
    .map(|i| format!("{base_name}{i}"))
    .find(|candidate| !used_names.contains(candidate))
    .unwrap_or_else(|| base_name.to_string())
}

fn prefix_if_digit_start(ident: &mut String, prefix: char) {
  if ident.starts_with(|c: char| c.is_ascii_digit()) {
    ident.insert(0, prefix);
  }
}
