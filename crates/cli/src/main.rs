mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reactor_lib::module::ModuleId;
use reactor_lib::selection::MakeBehavior;
use tracing_subscriber::EnvFilter;

use crate::cmd::{Overrides, cmd_order, cmd_reduce};
use crate::output::{OutputFormat, print_error};

/// reactor - Reduce multi-module builds to the modules that changed
#[derive(Parser)]
#[command(name = "reactor")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Reduce the build set described by an inventory file
  Reduce {
    /// Path to the inventory file
    inventory: PathBuf,

    /// Selection specifiers (comma-separated, `!id` to deselect); replaces the inventory's
    #[arg(long = "pl", value_name = "SPEC")]
    selection: Vec<String>,

    /// Make behavior: none, upstream (am), downstream (amd) or both
    #[arg(long = "make", value_name = "BEHAVIOR")]
    make_behavior: Option<MakeBehavior>,

    /// Additional changed module (`group:artifact`)
    #[arg(long, value_name = "ID")]
    changed: Vec<ModuleId>,

    /// Set a property (`key=value`), e.g. -D gib.buildAll=true
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    define: Vec<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Print the build order of an inventory
  Order {
    /// Path to the inventory file
    inventory: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  // Default to warn, or debug with --verbose; RUST_LOG wins when set
  let level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli.command) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}

fn run(command: Commands) -> Result<()> {
  match command {
    Commands::Reduce {
      inventory,
      selection,
      make_behavior,
      changed,
      define,
      output,
    } => cmd_reduce(
      &inventory,
      Overrides {
        selection,
        make_behavior,
        changed,
        defines: define,
      },
      output,
    ),
    Commands::Order { inventory, output } => cmd_order(&inventory, output),
  }
}
