pub mod catalog_table;
pub mod cli;
pub mod colors;
pub mod logger;

pub use catalog_table::catalog_table;
pub use cli::Cli;
pub use colors::Colors;
pub use logger::PipelineLogger;

fn term_width() -> u16 {
  if let Ok((width, _)) = crossterm::terminal::size() {
    width
  } else {
    80
  }
}
