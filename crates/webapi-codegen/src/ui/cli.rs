use std::path::PathBuf;

use clap::Parser;

use super::Colors;

#[derive(Parser, Debug)]
#[command(name = "webapi-codegen")]
#[command(author, version, about = "Generate an OpenAPI document and API clients from Web API assemblies")]
#[command(styles = Colors::clap_styles())]
pub struct Cli {
  /// Path to the generator configuration file (absolute or relative to the current directory)
  #[arg(value_name = "CONFIG")]
  pub config: PathBuf,
}
