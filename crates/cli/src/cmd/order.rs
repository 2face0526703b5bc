use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use reactor_lib::inventory::Inventory;

use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_order(path: &Path, output: OutputFormat) -> Result<()> {
  let inventory = Inventory::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
  let graph = inventory.graph().context("Invalid module inventory")?;
  debug!(modules = graph.len(), "computed build order");

  if output.is_json() {
    let modules: Vec<String> = graph.modules().map(ToString::to_string).collect();
    return print_json(&serde_json::json!({ "modules": modules }));
  }

  for (position, module) in graph.modules().enumerate() {
    let upstream = graph.upstream(module);
    if upstream.is_empty() {
      println!("{:>3}. {}", position + 1, module);
    } else {
      let upstream: Vec<String> = upstream.iter().map(ToString::to_string).collect();
      println!("{:>3}. {} <- {}", position + 1, module, upstream.join(", "));
    }
  }
  println!();
  print_stat("Modules", &graph.len().to_string());

  Ok(())
}
