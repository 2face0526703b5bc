//! Shared fixture for reduction scenarios.
//!
//! Every scenario starts from `module-a`. Modules added with [`Scenario::module`]
//! depend on `module-a` unless other upstream modules are given. Test skipping
//! for upstream modules is on and upstream building follows the make behavior.

use std::collections::BTreeSet;

use reactor_lib::inventory::{Inventory, Reduction};
use reactor_lib::module::{Module, ModuleId};
use reactor_lib::reduce::FinalProjects;
use reactor_lib::selection::MakeBehavior;

pub const GROUP: &str = "com.acme";
pub const TEST_SKIP: &str = "maven.test.skip";

pub fn id(artifact: &str) -> ModuleId {
  ModuleId::new(GROUP, artifact)
}

pub struct Scenario {
  inventory: Inventory,
}

impl Scenario {
  pub fn new() -> Self {
    let mut inventory = Inventory::new(vec![Module::new(id("module-a"))]);
    inventory
      .properties
      .insert("gib.skipTestsForUpstreamModules".to_string(), "true".to_string());
    inventory
      .properties
      .insert("gib.buildUpstream".to_string(), "derived".to_string());
    Self { inventory }
  }

  /// Add a module depending on `module-a`.
  pub fn module(self, artifact: &str) -> Self {
    self.module_on(artifact, &["module-a"])
  }

  /// Add a module depending on the given upstream modules.
  pub fn module_on(mut self, artifact: &str, upstream: &[&str]) -> Self {
    let module = Module::new(id(artifact)).depending_on(upstream.iter().map(|a| id(a)));
    self.inventory.modules.push(module);
    self
  }

  /// `module-a <- module-b <- module-c`
  pub fn chain() -> Self {
    Self::new().module("module-b").module_on("module-c", &["module-b"])
  }

  /// `module-a <- module-b <- module-c` and `module-a <- module-d <- module-e`
  pub fn two_chains() -> Self {
    Self::chain().module("module-d").module_on("module-e", &["module-d"])
  }

  pub fn changed(mut self, artifacts: &[&str]) -> Self {
    self.inventory.changed.extend(artifacts.iter().map(|a| id(a)));
    self
  }

  /// Add a selection specifier, as given to `-pl`.
  pub fn select(mut self, spec: &str) -> Self {
    self.inventory.selection.push(spec.to_string());
    self
  }

  pub fn make(mut self, make_behavior: MakeBehavior) -> Self {
    self.inventory.make_behavior = make_behavior;
    self
  }

  /// Set a `gib.` configuration property.
  pub fn set(mut self, name: &str, value: &str) -> Self {
    self
      .inventory
      .properties
      .insert(format!("gib.{name}"), value.to_string());
    self
  }

  pub fn run(&self) -> Reduction {
    self.inventory.run().unwrap()
  }
}

/// Assert the host's module list was replaced by exactly these modules.
pub fn assert_projects(reduction: &Reduction, artifacts: &[&str]) {
  let expected: Vec<ModuleId> = artifacts.iter().map(|a| id(a)).collect();
  assert_eq!(reduction.decision.final_projects, FinalProjects::Override(expected));
  assert!(!reduction.decision.short_circuit);
}

/// Assert the host's module list stands and the build runs.
pub fn assert_unchanged(reduction: &Reduction) {
  assert!(reduction.decision.final_projects.is_unchanged());
  assert!(!reduction.decision.short_circuit);
}

/// Assert the invocation runs with no goals over the host's own module list.
pub fn assert_short_circuit(reduction: &Reduction) {
  assert!(reduction.decision.short_circuit);
  assert!(reduction.decision.final_projects.is_unchanged());
}

/// Assert the invocation runs with no goals over exactly these modules.
pub fn assert_short_circuit_on(reduction: &Reduction, artifacts: &[&str]) {
  let expected: Vec<ModuleId> = artifacts.iter().map(|a| id(a)).collect();
  assert!(reduction.decision.short_circuit);
  assert_eq!(reduction.decision.final_projects, FinalProjects::Override(expected));
}

/// Assert exactly these modules have their tests skipped.
pub fn assert_test_skipped(reduction: &Reduction, artifacts: &[&str]) {
  let expected: BTreeSet<ModuleId> = artifacts.iter().map(|a| id(a)).collect();
  let actual: BTreeSet<ModuleId> = reduction
    .decision
    .property_overrides
    .iter()
    .filter(|(_, props)| props.get(TEST_SKIP).is_some_and(|v| v == "true"))
    .map(|(id, _)| id.clone())
    .collect();
  assert_eq!(actual, expected, "modules with skipped tests");
}
