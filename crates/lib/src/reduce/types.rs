//! Types for build-set reduction.
//!
//! This module defines the decision record produced by the reducer and
//! consumed by the applier.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::module::ModuleId;

/// Properties to add to a module, keyed by property name.
pub type Properties = BTreeMap<String, String>;

/// Per-module property additions.
pub type PropertyOverrides = BTreeMap<ModuleId, Properties>;

/// The module list to hand back to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "modules", rename_all = "lowercase")]
pub enum FinalProjects {
  /// The host's own module list stands.
  #[default]
  Unchanged,
  /// Replace the host's module list with these modules, in this order.
  Override(Vec<ModuleId>),
}

impl FinalProjects {
  pub fn is_unchanged(&self) -> bool {
    matches!(self, FinalProjects::Unchanged)
  }

  /// The explicit module list, if one was decided.
  pub fn modules(&self) -> Option<&[ModuleId]> {
    match self {
      FinalProjects::Unchanged => None,
      FinalProjects::Override(modules) => Some(modules),
    }
  }
}

/// The outcome of one reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Decision {
  pub final_projects: FinalProjects,

  /// Properties to add to modules before any build step runs.
  pub property_overrides: PropertyOverrides,

  /// Run the invocation with no effective goals.
  pub short_circuit: bool,
}

impl Decision {
  /// Leave the host untouched.
  pub fn unchanged() -> Self {
    Self::default()
  }

  /// Properties decided for one module.
  pub fn properties(&self, id: &ModuleId) -> Option<&Properties> {
    self.property_overrides.get(id)
  }

  /// Whether the decision changes nothing on the host.
  pub fn is_noop(&self) -> bool {
    self.final_projects.is_unchanged() && self.property_overrides.is_empty() && !self.short_circuit
  }
}

/// Why a module ended up in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
  /// Changed, downstream of a change, or explicitly selected: built and tested.
  Impacted,
  /// Only needed so impacted modules compile.
  UpstreamOnly,
}
