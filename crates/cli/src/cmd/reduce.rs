//! Reduce command implementation.
//!
//! Loads an inventory, merges command line overrides, reduces the build set and
//! shows the host session after the decision has been applied.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

use reactor_lib::apply::MemorySession;
use reactor_lib::inventory::Inventory;
use reactor_lib::module::ModuleId;
use reactor_lib::reduce::{Decision, FinalProjects};
use reactor_lib::selection::MakeBehavior;

use crate::output::{OutputFormat, print_info, print_json, print_module, print_stat, print_success, symbols};

/// Command line overrides applied on top of the inventory.
#[derive(Debug, Default)]
pub struct Overrides {
  /// Replaces the inventory's selection when not empty.
  pub selection: Vec<String>,
  pub make_behavior: Option<MakeBehavior>,
  /// Added to the inventory's changed modules.
  pub changed: Vec<ModuleId>,
  /// `key=value` properties; a bare key means an empty value.
  pub defines: Vec<String>,
}

impl Overrides {
  fn apply(self, inventory: &mut Inventory) -> Result<()> {
    if !self.selection.is_empty() {
      inventory.selection = self.selection;
    }
    if let Some(make_behavior) = self.make_behavior {
      inventory.make_behavior = make_behavior;
    }
    inventory.changed.extend(self.changed);
    for define in &self.defines {
      let (key, value) = parse_define(define)?;
      inventory.properties.insert(key.to_string(), value.to_string());
    }
    Ok(())
  }
}

fn parse_define(define: &str) -> Result<(&str, &str)> {
  let (key, value) = define.split_once('=').unwrap_or((define, ""));
  if key.trim().is_empty() {
    bail!("invalid property '{}': expected key=value", define);
  }
  Ok((key.trim(), value))
}

#[derive(Serialize)]
struct ReduceReport<'a> {
  decision: &'a Decision,
  session: &'a MemorySession,
}

pub fn cmd_reduce(path: &Path, overrides: Overrides, output: OutputFormat) -> Result<()> {
  let mut inventory = Inventory::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
  debug!(path = %path.display(), ?overrides, "applying command line overrides");
  overrides.apply(&mut inventory)?;

  let reduction = inventory.run().context("Failed to reduce the build set")?;
  let session = reduction.session();

  if output.is_json() {
    return print_json(&ReduceReport {
      decision: &reduction.decision,
      session: &session,
    });
  }

  let decision = &reduction.decision;
  match &decision.final_projects {
    FinalProjects::Unchanged => print_info("Host module list unchanged"),
    FinalProjects::Override(modules) => print_success(&format!("Building {} module(s)", modules.len())),
  }
  if decision.short_circuit {
    print_info("No impacted modules, skipping all goals");
  }

  println!();
  for module in session.projects() {
    print_module(symbols::ARROW, &module.to_string(), &session.properties(module));
  }

  // Properties of modules the host builds even though they are not listed
  for (module, properties) in &decision.property_overrides {
    if !session.projects().contains(module) {
      print_module(symbols::PLUS, &module.to_string(), properties);
    }
  }

  println!();
  let goals = if session.goals().is_empty() {
    "(none)".to_string()
  } else {
    session.goals().join(" ")
  };
  print_stat("Goals", &goals);
  print_stat("Changed", &reduction.changes.changed().len().to_string());

  Ok(())
}
