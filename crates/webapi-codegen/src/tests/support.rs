use std::{path::Path, sync::Arc};

use serde_json::{Value, json};

use crate::{
  catalog::{AssemblyMetadata, CONTROLLER_BASE, CatalogType, LoadContext, TypeFilter, TypeSet},
  config::{SchemaSettings, SchemaType},
};

pub(crate) fn write_json(path: &Path, value: &Value) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

pub(crate) fn controller(full_name: &str, actions: Value) -> Value {
  json!({
    "fullName": full_name,
    "baseType": CONTROLLER_BASE,
    "route": "api/[controller]",
    "actions": actions,
  })
}

/// `Petstore.Api` with two concrete controllers, one abstract controller,
/// a plain service class and the models they use.
pub(crate) fn petstore_assembly() -> Value {
  json!({
    "name": "Petstore.Api",
    "version": "1.0.0",
    "types": [
      {
        "fullName": "Petstore.Api.ApiControllerBase",
        "abstract": true,
        "baseType": CONTROLLER_BASE,
        "actions": [ { "name": "Ping", "method": "GET", "route": "ping" } ]
      },
      controller("Petstore.Api.PetsController", json!([
        {
          "name": "GetPet",
          "method": "GET",
          "route": "{id}",
          "description": "Find a pet by id",
          "parameters": [ { "name": "id", "type": "int" } ],
          "returns": "Task<ActionResult<Petstore.Api.Pet>>"
        },
        {
          "name": "ListPets",
          "method": "GET",
          "parameters": [ { "name": "limit", "type": "int?" }, { "name": "tag", "type": "string" } ],
          "returns": "List<Petstore.Api.Pet>"
        },
        {
          "name": "CreatePet",
          "method": "POST",
          "parameters": [ { "name": "pet", "type": "Petstore.Api.NewPet" } ],
          "returns": "Petstore.Api.Pet"
        },
        {
          "name": "DeletePet",
          "method": "DELETE",
          "route": "{id}",
          "parameters": [ { "name": "id", "type": "long" } ]
        }
      ])),
      {
        "fullName": "Petstore.Api.StoreController",
        "baseType": "Petstore.Api.ApiControllerBase",
        "route": "api/store",
        "actions": [
          {
            "name": "GetInventory",
            "method": "GET",
            "route": "inventory",
            "returns": "Dictionary<string, Petstore.Api.Pet>"
          }
        ]
      },
      {
        "fullName": "Petstore.Api.PetService",
        "actions": [ { "name": "Hidden", "method": "GET" } ]
      },
      {
        "fullName": "Petstore.Api.Animal",
        "abstract": true,
        "properties": [ { "name": "name", "type": "string", "required": true } ]
      },
      {
        "fullName": "Petstore.Api.Pet",
        "baseType": "Petstore.Api.Animal",
        "properties": [
          { "name": "id", "type": "long", "required": true },
          { "name": "kind", "type": "Petstore.Api.PetKind", "required": true },
          { "name": "tag", "type": "string" },
          { "name": "birthday", "type": "DateTime?" }
        ]
      },
      {
        "fullName": "Petstore.Api.NewPet",
        "properties": [
          { "name": "name", "type": "string", "required": true },
          { "name": "kind", "type": "Petstore.Api.PetKind" }
        ]
      },
      { "fullName": "Petstore.Api.PetKind", "kind": "enum", "values": ["Cat", "Dog"] }
    ]
  })
}

pub(crate) fn sorted_names(types: &TypeSet) -> Vec<&str> {
  types.names().collect()
}

/// Controllers of an in-memory assembly (plus its references), filtered the
/// same way the loader does.
pub(crate) fn controller_set(primary: Value, references: Vec<Value>) -> TypeSet {
  let assemblies = std::iter::once(primary)
    .chain(references)
    .map(|value| serde_json::from_value::<AssemblyMetadata>(value).unwrap());
  let context = Arc::new(LoadContext::from_assemblies(assemblies));
  let filter = TypeFilter::controllers();

  context
    .primary_types()
    .filter(|ty| filter.matches(ty, &context))
    .map(|ty| CatalogType {
      definition: ty.clone(),
      assembly: context.primary().clone(),
      context: Arc::clone(&context),
    })
    .collect()
}

pub(crate) fn schema_settings(schema_type: SchemaType, output: &Path) -> SchemaSettings {
  SchemaSettings::builder()
    .schema_type(schema_type)
    .title("Petstore")
    .description("Pets and more")
    .version("1.0.0")
    .output(output)
    .assembly_paths(Vec::new())
    .build()
}
