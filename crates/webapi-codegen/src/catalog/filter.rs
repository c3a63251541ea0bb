use super::{
  context::LoadContext,
  metadata::{TypeDef, TypeKind},
};

/// Base type every Web API controller derives from.
pub const CONTROLLER_BASE: &str = "Microsoft.AspNetCore.Mvc.ControllerBase";

/// Capability predicate applied to every type of a loaded assembly.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct TypeFilter {
  /// Reject abstract classes.
  #[builder(default)]
  pub concrete: bool,
  /// Require this type in the inheritance chain.
  #[builder(into)]
  pub derives_from: Option<String>,
}

impl TypeFilter {
  /// Concrete classes deriving from the controller base.
  pub fn controllers() -> Self {
    Self::builder().concrete(true).derives_from(CONTROLLER_BASE).build()
  }

  pub fn matches(&self, ty: &TypeDef, context: &LoadContext) -> bool {
    if ty.kind != TypeKind::Class {
      return false;
    }
    if self.concrete && ty.is_abstract {
      return false;
    }

    match &self.derives_from {
      Some(base) => context.derives_from(ty, base),
      None => true,
    }
  }
}

impl Default for TypeFilter {
  fn default() -> Self {
    Self::controllers()
  }
}
