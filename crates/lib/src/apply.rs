//! Applying a decision to the host.
//!
//! The host session is a trait so real build tools and the in-memory session
//! used by the CLI share the same applier. The applier makes no decisions of
//! its own.

use std::collections::BTreeMap;
use std::convert::Infallible;

use serde::Serialize;
use tracing::{debug, info};

use crate::module::ModuleId;
use crate::reduce::{Decision, FinalProjects, Properties};

/// The host build session, as seen by the applier.
pub trait HostSession {
  type Error;

  /// Replace the session's module list, preserving the given order.
  fn set_projects(&mut self, modules: Vec<ModuleId>) -> Result<(), Self::Error>;

  /// Add a property to a module. Existing properties are never overwritten.
  fn set_property(&mut self, module: &ModuleId, key: &str, value: &str) -> Result<(), Self::Error>;

  /// Run the invocation with no effective goals.
  fn skip_goals(&mut self) -> Result<(), Self::Error>;
}

/// Apply a decision: properties first, then the module list, then the goals.
pub fn apply_decision<S: HostSession>(decision: &Decision, session: &mut S) -> Result<(), S::Error> {
  for (module, properties) in &decision.property_overrides {
    for (key, value) in properties {
      debug!(module = %module, key, value, "setting module property");
      session.set_property(module, key, value)?;
    }
  }

  if let FinalProjects::Override(modules) = &decision.final_projects {
    info!(count = modules.len(), "replacing session module list");
    session.set_projects(modules.clone())?;
  }

  if decision.short_circuit {
    info!("skipping all goals");
    session.skip_goals()?;
  }

  Ok(())
}

/// An in-memory host session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemorySession {
  projects: Vec<ModuleId>,
  goals: Vec<String>,
  properties: BTreeMap<ModuleId, Properties>,
}

impl MemorySession {
  pub fn new(projects: Vec<ModuleId>, goals: Vec<String>) -> Self {
    Self {
      projects,
      goals,
      properties: BTreeMap::new(),
    }
  }

  pub fn projects(&self) -> &[ModuleId] {
    &self.projects
  }

  pub fn goals(&self) -> &[String] {
    &self.goals
  }

  /// The property bag of a module (empty if nothing was set).
  pub fn properties(&self, module: &ModuleId) -> Properties {
    self.properties.get(module).cloned().unwrap_or_default()
  }

  pub fn property(&self, module: &ModuleId, key: &str) -> Option<&str> {
    self.properties.get(module)?.get(key).map(String::as_str)
  }
}

impl HostSession for MemorySession {
  type Error = Infallible;

  fn set_projects(&mut self, modules: Vec<ModuleId>) -> Result<(), Self::Error> {
    self.projects = modules;
    Ok(())
  }

  fn set_property(&mut self, module: &ModuleId, key: &str, value: &str) -> Result<(), Self::Error> {
    self
      .properties
      .entry(module.clone())
      .or_default()
      .entry(key.to_string())
      .or_insert_with(|| value.to_string());
    Ok(())
  }

  fn skip_goals(&mut self) -> Result<(), Self::Error> {
    self.goals.clear();
    Ok(())
  }
}
