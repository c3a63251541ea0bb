use std::path::{Path, PathBuf};

use serde_json::json;

use super::*;
use crate::tests::support::{controller, petstore_assembly, sorted_names, write_json};

async fn load(registry: &mut SearchPathRegistry, base_dir: &Path, paths: &[&str]) -> Result<TypeSet, CatalogError> {
  let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
  CatalogLoader::default().load(registry, &paths, base_dir).await
}

#[test]
fn test_registry_is_idempotent() {
  let mut registry = SearchPathRegistry::new();

  assert!(registry.ensure_registered("/build/bin/References"));
  assert!(!registry.ensure_registered("/build/bin/References"));
  assert!(!registry.ensure_registered("/build/bin/./../bin/References"));
  assert!(registry.ensure_registered("/build/other/References"));

  assert_eq!(registry.len(), 2);
  assert!(registry.contains("/build/bin/References"));
  assert_eq!(
    registry.iter().collect::<Vec<_>>(),
    vec![Path::new("/build/bin/References"), Path::new("/build/other/References")]
  );
}

#[test]
fn test_normalize_is_lexical() {
  assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
  assert_eq!(normalize(Path::new("../x/y")), PathBuf::from("../x/y"));
  assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
}

#[test]
fn test_short_name() {
  assert_eq!(short_name("Petstore.Api.PetsController"), "PetsController");
  assert_eq!(short_name("Outer+Inner"), "Inner");
  assert_eq!(short_name("Plain"), "Plain");
}

#[tokio::test]
async fn test_discovers_only_concrete_controllers() {
  let dir = tempfile::tempdir().unwrap();
  write_json(&dir.path().join("bin/Petstore.Api.json"), &petstore_assembly());

  let mut registry = SearchPathRegistry::new();
  let types = load(&mut registry, dir.path(), &["bin/Petstore.Api.json"]).await.unwrap();

  assert_eq!(
    sorted_names(&types),
    vec!["Petstore.Api.PetsController", "Petstore.Api.StoreController"]
  );
  let pets = types.get("Petstore.Api.PetsController").unwrap();
  assert_eq!(pets.assembly.name, "Petstore.Api");
  assert_eq!(pets.assembly.version.as_deref(), Some("1.0.0"));
  assert!(registry.contains(dir.path().join("bin").join(REFERENCES_FOLDER)));
}

#[tokio::test]
async fn test_overlapping_paths_do_not_duplicate_types() {
  let dir = tempfile::tempdir().unwrap();
  write_json(&dir.path().join("bin/Petstore.Api.json"), &petstore_assembly());

  let mut registry = SearchPathRegistry::new();
  let types = load(
    &mut registry,
    dir.path(),
    &["bin/Petstore.Api.json", "bin/../bin/Petstore.Api.json", "./bin/Petstore.Api.json"],
  )
  .await
  .unwrap();

  assert_eq!(types.len(), 2);
  assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_base_chain_through_referenced_assembly() {
  let dir = tempfile::tempdir().unwrap();
  write_json(
    &dir.path().join("bin/References/Shared.Web.json"),
    &json!({
      "name": "Shared.Web",
      "version": "3.0.0",
      "types": [ { "fullName": "Shared.Web.AppController", "abstract": true, "baseType": "Microsoft.AspNetCore.Mvc.Controller" } ]
    }),
  );
  write_json(
    &dir.path().join("bin/Orders.Api.json"),
    &json!({
      "name": "Orders.Api",
      "references": [ { "name": "Shared.Web", "version": "3.0.0" } ],
      "types": [
        { "fullName": "Orders.Api.OrdersController", "baseType": "Shared.Web.AppController" },
        { "fullName": "Orders.Api.NotAController", "baseType": "Shared.Web.Missing" }
      ]
    }),
  );

  let mut registry = SearchPathRegistry::new();
  let types = load(&mut registry, dir.path(), &["bin/Orders.Api.json"]).await.unwrap();

  assert_eq!(sorted_names(&types), vec!["Orders.Api.OrdersController"]);
  let context = &types.get("Orders.Api.OrdersController").unwrap().context;
  assert_eq!(context.assemblies().len(), 2);
  assert!(context.resolve_type("Shared.Web.AppController").is_some());
}

#[tokio::test]
async fn test_isolated_contexts_resolve_conflicting_versions() {
  let dir = tempfile::tempdir().unwrap();
  let shared = |version: &str, model: &str| {
    json!({
      "name": "Shared.Contracts",
      "version": version,
      "types": [ { "fullName": model } ]
    })
  };
  write_json(&dir.path().join("a/References/Shared.Contracts.json"), &shared("1.0.0", "Shared.V1Model"));
  write_json(&dir.path().join("b/References/Shared.Contracts.json"), &shared("2.0.0", "Shared.V2Model"));

  for (folder, version) in [("a", "1.0.0"), ("b", "2.0.0")] {
    write_json(
      &dir.path().join(format!("{folder}/Api.{folder}.json")),
      &json!({
        "name": format!("Api.{folder}"),
        "references": [ { "name": "Shared.Contracts", "version": version } ],
        "types": [ controller(&format!("Api.{folder}.ValuesController"), json!([])) ]
      }),
    );
  }

  let mut registry = SearchPathRegistry::new();
  let types = load(&mut registry, dir.path(), &["a/Api.a.json", "b/Api.b.json"]).await.unwrap();

  let a = &types.get("Api.a.ValuesController").unwrap().context;
  let b = &types.get("Api.b.ValuesController").unwrap().context;
  assert!(a.resolve_type("Shared.V1Model").is_some());
  assert!(a.resolve_type("Shared.V2Model").is_none());
  assert!(b.resolve_type("Shared.V2Model").is_some());
  assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn test_missing_assembly_aborts() {
  let dir = tempfile::tempdir().unwrap();
  let mut registry = SearchPathRegistry::new();

  let err = load(&mut registry, dir.path(), &["bin/Nope.json"]).await.unwrap_err();
  let CatalogError::Initialize { source, .. } = err else {
    panic!("expected initialization failure");
  };
  assert!(matches!(*source, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_unresolved_reference_aborts() {
  let dir = tempfile::tempdir().unwrap();
  write_json(
    &dir.path().join("bin/Api.json"),
    &json!({
      "name": "Api",
      "references": [ { "name": "Shared", "version": "9.9.9" } ],
      "types": [ controller("Api.ValuesController", json!([])) ]
    }),
  );
  write_json(
    &dir.path().join("bin/References/Shared.json"),
    &json!({ "name": "Shared", "version": "1.0.0" }),
  );

  let mut registry = SearchPathRegistry::new();
  let err = load(&mut registry, dir.path(), &["bin/Api.json"]).await.unwrap_err();
  let CatalogError::Initialize { source, .. } = err else {
    panic!("expected initialization failure");
  };
  match *source {
    CatalogError::UnresolvedReference { assembly, reference, searched } => {
      assert_eq!(assembly, "Api");
      assert_eq!(reference, "Shared, Version=9.9.9");
      assert!(searched.contains(&dir.path().join("bin/References")));
    }
    other => panic!("unexpected error {other:?}"),
  }
}

#[tokio::test]
async fn test_malformed_metadata_aborts() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::create_dir_all(dir.path().join("bin")).unwrap();
  std::fs::write(dir.path().join("bin/Api.json"), "{ \"name\": ").unwrap();

  let mut registry = SearchPathRegistry::new();
  let err = load(&mut registry, dir.path(), &["bin/Api.json"]).await.unwrap_err();
  assert!(err.to_string().contains("Api.json"));
}

#[test]
fn test_filter_rules() {
  let context = LoadContext::from_assemblies([serde_json::from_value::<AssemblyMetadata>(petstore_assembly()).unwrap()]);
  let filter = TypeFilter::controllers();
  let matches = |name: &str| filter.matches(context.resolve_type(name).unwrap(), &context);

  assert!(matches("Petstore.Api.PetsController"));
  assert!(matches("Petstore.Api.StoreController"));
  assert!(!matches("Petstore.Api.ApiControllerBase"));
  assert!(!matches("Petstore.Api.PetService"));
  assert!(!matches("Petstore.Api.PetKind"));

  let any_class = TypeFilter::builder().build();
  assert!(any_class.matches(context.resolve_type("Petstore.Api.Animal").unwrap(), &context));
}

#[test]
fn test_retain_named_intersects_by_full_name() {
  let context = std::sync::Arc::new(LoadContext::from_assemblies([
    serde_json::from_value::<AssemblyMetadata>(json!({
      "name": "Foo",
      "types": [ controller("Foo.BarController", json!([])), controller("Foo.BazController", json!([])) ]
    }))
    .unwrap(),
  ]));
  let types: TypeSet = context
    .primary_types()
    .map(|ty| CatalogType {
      definition: ty.clone(),
      assembly: context.primary().clone(),
      context: std::sync::Arc::clone(&context),
    })
    .collect();

  let (all, unmatched) = types.clone().retain_named(&[]);
  assert_eq!(all.len(), 2);
  assert!(unmatched.is_empty());

  let allow = vec!["Foo.BarController".to_string(), "BarController".to_string()];
  let (narrowed, unmatched) = types.retain_named(&allow);
  assert_eq!(sorted_names(&narrowed), vec!["Foo.BarController"]);
  assert_eq!(unmatched, vec!["BarController".to_string()]);
}
