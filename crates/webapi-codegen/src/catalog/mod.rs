//! Discovery of controller types from compiled assemblies.
//!
//! Each assembly is loaded into its own [`LoadContext`]. References are
//! resolved from the assembly's folder and from the folders registered in a
//! [`SearchPathRegistry`]; the loader registers the `References` folder next
//! to every assembly it is asked to load. Matching types of all assemblies are
//! merged into one de-duplicated [`TypeSet`].

mod context;
mod filter;
mod metadata;

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use itertools::Itertools as _;

pub use self::{
  context::{LoadContext, REFERENCES_FOLDER, SearchPathRegistry},
  filter::{CONTROLLER_BASE, TypeFilter},
  metadata::{
    ActionDef, AssemblyIdentity, AssemblyMetadata, AssemblyReference, ParameterDef, ParameterSource, PropertyDef,
    TypeDef, TypeKind,
  },
};
pub(crate) use self::{context::normalize, metadata::short_name};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
  #[error("assembly {0} does not exist")]
  NotFound(PathBuf),
  #[error("failed to open assembly {path}")]
  Open {
    path: PathBuf,
    #[source]
    source: fmmap::error::Error,
  },
  #[error("assembly metadata {path} is malformed")]
  Malformed {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("could not resolve reference '{reference}' of '{assembly}' (searched: {})", display_paths(.searched))]
  UnresolvedReference {
    assembly: String,
    reference: String,
    searched: Vec<PathBuf>,
  },
  #[error("failed to initialize catalog for {path}")]
  Initialize {
    path: PathBuf,
    #[source]
    source: Box<CatalogError>,
  },
}

fn display_paths(paths: &[PathBuf]) -> String {
  paths.iter().map(|path| path.display()).join(", ")
}

/// One discovered type together with where it came from.
#[derive(Debug, Clone)]
pub struct CatalogType {
  pub definition: TypeDef,
  pub assembly: AssemblyIdentity,
  pub context: Arc<LoadContext>,
}

impl CatalogType {
  pub fn full_name(&self) -> &str {
    &self.definition.full_name
  }
}

/// Discovered types keyed by fully-qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeSet {
  types: BTreeMap<String, CatalogType>,
}

impl TypeSet {
  /// Adds a type unless one with the same name is already present.
  pub fn insert(&mut self, ty: CatalogType) -> bool {
    if self.types.contains_key(ty.full_name()) {
      return false;
    }
    self.types.insert(ty.full_name().to_string(), ty);
    true
  }

  pub fn len(&self) -> usize {
    self.types.len()
  }

  pub fn is_empty(&self) -> bool {
    self.types.is_empty()
  }

  pub fn contains(&self, full_name: &str) -> bool {
    self.types.contains_key(full_name)
  }

  pub fn get(&self, full_name: &str) -> Option<&CatalogType> {
    self.types.get(full_name)
  }

  /// Types ordered by full name.
  pub fn iter(&self) -> impl Iterator<Item = &CatalogType> {
    self.types.values()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.types.keys().map(String::as_str)
  }

  /// Keeps only the types named in `allow_list`. An empty list keeps
  /// everything. Returns the narrowed set and the names that matched nothing.
  pub fn retain_named(self, allow_list: &[String]) -> (Self, Vec<String>) {
    if allow_list.is_empty() {
      return (self, Vec::new());
    }

    let unmatched = allow_list
      .iter()
      .filter(|name| !self.types.contains_key(name.as_str()))
      .cloned()
      .collect();
    let types = self
      .types
      .into_iter()
      .filter(|(name, _)| allow_list.iter().any(|allowed| allowed == name))
      .collect();

    (Self { types }, unmatched)
  }
}

impl FromIterator<CatalogType> for TypeSet {
  fn from_iter<I: IntoIterator<Item = CatalogType>>(iter: I) -> Self {
    let mut set = Self::default();
    for ty in iter {
      set.insert(ty);
    }
    set
  }
}

/// Types of a single assembly that pass a [`TypeFilter`].
#[derive(Debug, Clone)]
pub struct AssemblyCatalog {
  path: PathBuf,
  filter: TypeFilter,
}

impl AssemblyCatalog {
  pub fn new(path: impl Into<PathBuf>, filter: TypeFilter) -> Self {
    Self {
      path: path.into(),
      filter,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub async fn initialize(&self, registry: &SearchPathRegistry) -> Result<Vec<CatalogType>, CatalogError> {
    let context = Arc::new(LoadContext::load(&self.path, registry).await?);
    let assembly = context.primary().clone();

    let types = context
      .primary_types()
      .filter(|ty| self.filter.matches(ty, &context))
      .map(|ty| CatalogType {
        definition: ty.clone(),
        assembly: assembly.clone(),
        context: Arc::clone(&context),
      })
      .collect();

    Ok(types)
  }
}

/// Union of several assembly catalogs.
#[derive(Debug, Clone, Default)]
pub struct CompositeCatalog {
  catalogs: Vec<AssemblyCatalog>,
}

impl CompositeCatalog {
  pub fn new(catalogs: Vec<AssemblyCatalog>) -> Self {
    Self { catalogs }
  }

  /// Initializes every catalog. The first failure aborts with its cause
  /// attached; the merged set never contains the same full name twice.
  pub async fn initialize(&self, registry: &SearchPathRegistry) -> Result<TypeSet, CatalogError> {
    let mut merged = TypeSet::default();

    for catalog in &self.catalogs {
      let types = catalog
        .initialize(registry)
        .await
        .map_err(|source| CatalogError::Initialize {
          path: catalog.path().to_path_buf(),
          source: Box::new(source),
        })?;
      for ty in types {
        merged.insert(ty);
      }
    }

    Ok(merged)
  }
}

/// Loads controller types from assembly paths.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoader {
  filter: TypeFilter,
}

impl CatalogLoader {
  pub fn new(filter: TypeFilter) -> Self {
    Self { filter }
  }

  /// Resolves each path against `base_dir`, registers its sibling
  /// `References` folder in `registry` and loads everything into one set.
  pub async fn load(
    &self,
    registry: &mut SearchPathRegistry,
    assembly_paths: &[PathBuf],
    base_dir: &Path,
  ) -> Result<TypeSet, CatalogError> {
    let mut catalogs = Vec::with_capacity(assembly_paths.len());

    for assembly_path in assembly_paths {
      let full_path = normalize(&base_dir.join(assembly_path));
      let folder = full_path.parent().map(Path::to_path_buf).unwrap_or_default();
      registry.ensure_registered(folder.join(REFERENCES_FOLDER));
      catalogs.push(AssemblyCatalog::new(full_path, self.filter.clone()));
    }

    CompositeCatalog::new(catalogs).initialize(registry).await
  }
}

#[cfg(test)]
mod tests;
