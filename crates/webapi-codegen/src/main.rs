#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
use clap::Parser;

use crate::{
  pipeline::Pipeline,
  ui::{Cli, Colors, PipelineLogger},
};

mod catalog;
mod client;
mod config;
mod pipeline;
mod schema;
mod ui;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let logger = PipelineLogger::new(Colors::detect());

  Pipeline::new(logger).run(&cli.config).await?;

  Ok(())
}
