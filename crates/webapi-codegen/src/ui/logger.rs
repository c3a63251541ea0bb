use chrono::{Local, Timelike};

use super::Colors;

fn format_timestamp() -> String {
  let now = Local::now();
  format!("[{:02}:{:02}:{:02}]", now.hour(), now.minute(), now.second())
}

/// Timestamped console output for the generation pipeline.
///
/// Progress goes to stdout, warnings and errors go to stderr so the invoking
/// build sees diagnostics even when stdout is discarded.
#[derive(Debug, Clone, Copy)]
pub struct PipelineLogger {
  colors: Colors,
}

impl PipelineLogger {
  pub const fn new(colors: Colors) -> Self {
    Self { colors }
  }

  pub const fn colors(&self) -> &Colors {
    &self.colors
  }

  fn timestamp(&self) -> String {
    self.colors.paint(format_timestamp(), self.colors.timestamp())
  }

  fn info_line(&self, message: &str) -> String {
    format!("{} {}", self.timestamp(), self.colors.paint(message, self.colors.primary()))
  }

  fn stat_line(&self, label: &str, value: impl std::fmt::Display) -> String {
    format!(
      "           {} {}",
      self.colors.paint(format!("{label:<24}"), self.colors.label()),
      self.colors.paint(value, self.colors.value())
    )
  }

  fn warn_line(&self, message: &str) -> String {
    format!(
      "{} {} {}",
      self.timestamp(),
      self.colors.paint("Warning:", self.colors.accent()),
      self.colors.paint(message, self.colors.primary())
    )
  }

  fn error_line(&self, error: &anyhow::Error) -> String {
    format!(
      "{} {} {}",
      self.timestamp(),
      self.colors.paint("Error:", self.colors.error()),
      self.colors.paint(format!("{error:?}"), self.colors.error())
    )
  }

  pub fn info(&self, message: &str) {
    println!("{}", self.info_line(message));
  }

  pub fn stat(&self, label: &str, value: impl std::fmt::Display) {
    println!("{}", self.stat_line(label, value));
  }

  pub fn warn(&self, message: &str) {
    eprintln!("{}", self.warn_line(message));
  }

  /// Prints an error with its full cause chain.
  pub fn error(&self, error: &anyhow::Error) {
    eprintln!("{}", self.error_line(error));
  }

  pub fn table(&self, table: &comfy_table::Table) {
    println!("{table}");
  }

  pub fn success(&self, message: &str) {
    println!(
      "{} {}",
      self.timestamp(),
      self.colors.paint(message, self.colors.success())
    );
  }
}

impl Default for PipelineLogger {
  fn default() -> Self {
    Self::new(Colors::plain())
  }
}
