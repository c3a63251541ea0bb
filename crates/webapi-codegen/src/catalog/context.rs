use std::{
  collections::{HashSet, VecDeque},
  path::{Component, Path, PathBuf},
};

use indexmap::{IndexMap, IndexSet};

use super::{
  CatalogError,
  metadata::{AssemblyIdentity, AssemblyMetadata, AssemblyReference, TypeDef},
};

/// Folder next to each assembly that holds its private dependencies.
pub const REFERENCES_FOLDER: &str = "References";

const METADATA_EXTENSION: &str = "json";

/// Framework types that never appear in assembly metadata, with their bases.
const FRAMEWORK_BASES: &[(&str, &str)] = &[
  ("Microsoft.AspNetCore.Mvc.Controller", "Microsoft.AspNetCore.Mvc.ControllerBase"),
  ("Microsoft.AspNetCore.Mvc.ControllerBase", "System.Object"),
];

/// Extra folders probed when resolving assembly references.
///
/// Registration has set semantics: registering a folder that is already
/// known is a no-op. The registry is owned by the caller and passed to every
/// load, so several runs in one process can share it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPathRegistry {
  paths: IndexSet<PathBuf>,
}

impl SearchPathRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns `true` when the folder was not registered before.
  pub fn ensure_registered(&mut self, path: impl AsRef<Path>) -> bool {
    self.paths.insert(normalize(path.as_ref()))
  }

  pub fn contains(&self, path: impl AsRef<Path>) -> bool {
    self.paths.contains(&normalize(path.as_ref()))
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Path> {
    self.paths.iter().map(PathBuf::as_path)
  }
}

/// Lexically removes `.` and `..` components.
pub(crate) fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
          normalized.pop();
        } else if !normalized.has_root() {
          normalized.push(component);
        }
      }
      other => normalized.push(other),
    }
  }
  normalized
}

/// An isolated set of assemblies resolved for one primary assembly.
///
/// Every primary assembly gets its own context, so two assemblies in the same
/// run may depend on different versions of a shared dependency.
#[derive(Debug)]
pub struct LoadContext {
  primary: AssemblyIdentity,
  assemblies: Vec<AssemblyIdentity>,
  primary_types: Vec<String>,
  types: IndexMap<String, TypeDef>,
}

impl LoadContext {
  /// Reads the primary assembly and resolves its references transitively.
  ///
  /// References are probed in the assembly's own folder first, then in the
  /// registered search paths in registration order.
  pub async fn load(path: &Path, registry: &SearchPathRegistry) -> Result<Self, CatalogError> {
    let primary = AssemblyMetadata::read(path).await?;

    let mut probe_dirs: IndexSet<PathBuf> = IndexSet::new();
    if let Some(folder) = path.parent() {
      probe_dirs.insert(normalize(folder));
    }
    probe_dirs.extend(registry.iter().map(Path::to_path_buf));

    let mut pending: VecDeque<(AssemblyIdentity, AssemblyReference)> = primary
      .references
      .iter()
      .map(|reference| (primary.identity(), reference.clone()))
      .collect();
    let mut loaded: IndexMap<String, AssemblyMetadata> = IndexMap::new();
    loaded.insert(primary.name.clone(), primary);

    while let Some((requester, reference)) = pending.pop_front() {
      if loaded.contains_key(&reference.name) {
        continue;
      }

      let metadata = probe(&probe_dirs, &reference)
        .await?
        .ok_or_else(|| CatalogError::UnresolvedReference {
          assembly: requester.to_string(),
          reference: reference.to_string(),
          searched: probe_dirs.iter().cloned().collect(),
        })?;

      pending.extend(
        metadata
          .references
          .iter()
          .map(|next| (metadata.identity(), next.clone())),
      );
      loaded.insert(reference.name.clone(), metadata);
    }

    Ok(Self::from_assemblies(loaded.into_values()))
  }

  pub(crate) fn from_assemblies(assemblies: impl IntoIterator<Item = AssemblyMetadata>) -> Self {
    let mut identities = Vec::new();
    let mut primary_types = Vec::new();
    let mut types = IndexMap::new();

    for assembly in assemblies {
      if identities.is_empty() {
        primary_types = assembly.types.iter().map(|ty| ty.full_name.clone()).collect();
      }
      identities.push(assembly.identity());
      for ty in assembly.types {
        types.entry(ty.full_name.clone()).or_insert(ty);
      }
    }

    let primary = identities.first().cloned().unwrap_or(AssemblyIdentity {
      name: String::new(),
      version: None,
    });

    Self {
      primary,
      assemblies: identities,
      primary_types,
      types,
    }
  }

  pub fn primary(&self) -> &AssemblyIdentity {
    &self.primary
  }

  /// Every assembly in the context, primary first.
  pub fn assemblies(&self) -> &[AssemblyIdentity] {
    &self.assemblies
  }

  pub fn resolve_type(&self, full_name: &str) -> Option<&TypeDef> {
    self.types.get(full_name)
  }

  /// Types declared by the primary assembly, in declaration order.
  pub fn primary_types(&self) -> impl Iterator<Item = &TypeDef> {
    self.primary_types.iter().filter_map(|name| self.types.get(name))
  }

  /// Whether `ty` has `base` somewhere in its inheritance chain. Bases that
  /// cannot be resolved end the walk.
  pub fn derives_from(&self, ty: &TypeDef, base: &str) -> bool {
    let mut visited = HashSet::new();
    let mut current = ty.base_type.clone();

    while let Some(name) = current {
      if name == base {
        return true;
      }
      if !visited.insert(name.clone()) {
        return false;
      }

      current = match self.resolve_type(&name) {
        Some(def) => def.base_type.clone(),
        None => FRAMEWORK_BASES
          .iter()
          .find(|(framework, _)| *framework == name)
          .map(|(_, parent)| (*parent).to_string()),
      };
    }

    false
  }
}

async fn probe(dirs: &IndexSet<PathBuf>, reference: &AssemblyReference) -> Result<Option<AssemblyMetadata>, CatalogError> {
  let file_name = format!("{}.{METADATA_EXTENSION}", reference.name);

  for dir in dirs {
    let candidate = dir.join(&file_name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
      continue;
    }

    let metadata = AssemblyMetadata::read(&candidate).await?;
    if reference.accepts(&metadata) {
      return Ok(Some(metadata));
    }
  }

  Ok(None)
}
