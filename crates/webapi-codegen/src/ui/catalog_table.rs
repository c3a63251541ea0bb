use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Row, Table};

use crate::{
  catalog::TypeSet,
  ui::{Colors, colors::IntoComfyColor, term_width},
};

/// Discovered controllers with their assembly and action count.
pub fn catalog_table(types: &TypeSet, colors: &Colors) -> Table {
  let mut table = Table::new();
  table
    .load_preset("  ── ──            ")
    .set_content_arrangement(ContentArrangement::Dynamic)
    .set_width(term_width());
  if !colors.enabled() {
    table.force_no_tty();
  }

  let mut header = Row::new();
  for title in ["CONTROLLER", "ASSEMBLY", "ACTIONS"] {
    header.add_cell(Cell::new(title).fg(colors.label().into_comfy()));
  }
  table.set_header(header);

  for ty in types.iter() {
    let mut row = Row::new();
    row.add_cell(
      Cell::new(ty.full_name())
        .fg(colors.value().into_comfy())
        .add_attribute(Attribute::Bold),
    );
    row.add_cell(Cell::new(ty.assembly.to_string()).fg(colors.primary().into_comfy()));
    row.add_cell(
      Cell::new(ty.definition.actions.len())
        .fg(colors.accent().into_comfy())
        .set_alignment(CellAlignment::Right),
    );
    table.add_row(row);
  }

  table
}
