//! Build-set reduction.
//!
//! Combines the dependency graph, the change set, the user's selection and the
//! policy configuration into a [`Decision`]:
//!
//! 1. Impacted modules: changed modules and (optionally) their downstream
//!    closure, limited to the selection and its downstream make-behavior
//!    closure. A change anywhere the make behavior reaches makes the explicitly
//!    selected modules impacted as well.
//! 2. Required modules: impacted plus (optionally) their upstream closure.
//!    Upstream additions are built only so impacted modules compile.
//! 3. Upstream-only modules receive the test-skip and upstream properties.
//! 4. Nothing left to build: short-circuit, or keep building everything in
//!    build-all mode.
//! 5. Otherwise the host's module list is replaced by the required modules,
//!    unless the host's list already is the user's selection and covers them.
//!
//! Exclusions are absolute but applied last: excluded modules still seed the
//! closures, yet never appear in an explicit list and never receive
//! properties.

mod types;

pub use types::*;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::change::{ChangeSet, join};
use crate::config::{BuildUpstream, Config, TEST_SKIP_PROPERTY};
use crate::graph::{DependencyGraph, ModuleSet};
use crate::module::ModuleId;
use crate::selection::{MakeBehavior, Selection};

/// Reduces the host's build set for one invocation.
///
/// The reducer is a pure function of its inputs: it reads the graph and
/// configuration and returns a decision without touching the host.
pub struct Reducer<'a> {
  graph: &'a DependencyGraph,
  config: &'a Config,
}

impl<'a> Reducer<'a> {
  pub fn new(graph: &'a DependencyGraph, config: &'a Config) -> Self {
    Self { graph, config }
  }

  /// Compute the decision for a change set and selection.
  pub fn reduce(&self, changes: &ChangeSet, selection: &Selection) -> Decision {
    if self.config.disable {
      info!("reactor reduction disabled, leaving the build untouched");
      return Decision::unchanged();
    }

    let build_set = self.build_set(changes, selection);
    let required: ModuleSet = build_set
      .keys()
      .filter(|id| !selection.is_excluded(id))
      .cloned()
      .collect();
    if required.is_empty() {
      return self.no_changes(changes, selection, !build_set.is_empty());
    }

    let host_scope = selection.host_scope(self.graph);

    if self.config.build_all {
      // Everything the host builds anyway; only the classification matters.
      let upstream_only: ModuleSet = host_scope
        .iter()
        .filter(|id| build_set.get(*id) != Some(&Classification::Impacted))
        .cloned()
        .collect();
      let decision = Decision {
        final_projects: FinalProjects::Unchanged,
        property_overrides: self.upstream_properties(&upstream_only, selection),
        short_circuit: false,
      };
      info!(
        modules = host_scope.len(),
        "build-all mode, building the full module set"
      );
      return decision;
    }

    let upstream_only: ModuleSet = build_set
      .iter()
      .filter(|(_, class)| **class == Classification::UpstreamOnly)
      .map(|(id, _)| id.clone())
      .collect();

    let final_projects = if self.keeps_host_projects(selection, &host_scope, &required) {
      info!(modules = required.len(), "host module list already covers the build set");
      FinalProjects::Unchanged
    } else {
      let modules = self.graph.topological_order(&required);
      info!(
        modules = modules.len(),
        upstream_only = upstream_only.len(),
        "overriding host module list"
      );
      FinalProjects::Override(modules)
    };

    Decision {
      final_projects,
      property_overrides: self.upstream_properties(&upstream_only, selection),
      short_circuit: false,
    }
  }

  /// Classify every module that has to be built, excluded modules included.
  ///
  /// Empty when no change reaches the user's scope.
  pub fn build_set(&self, changes: &ChangeSet, selection: &Selection) -> BTreeMap<ModuleId, Classification> {
    let impacted = self.impacted(changes, selection);
    let mut build_set: BTreeMap<ModuleId, Classification> = impacted
      .iter()
      .map(|id| (id.clone(), Classification::Impacted))
      .collect();

    if !impacted.is_empty() && self.builds_upstream(selection.make_behavior()) {
      for id in self.graph.upstream_closure(&impacted) {
        build_set.entry(id).or_insert(Classification::UpstreamOnly);
      }
    }

    build_set
  }

  fn impacted(&self, changes: &ChangeSet, selection: &Selection) -> ModuleSet {
    let mut affected = changes.changed().clone();
    if self.config.build_downstream {
      affected.extend(self.graph.downstream_closure(changes.changed()));
    }

    if affected.is_disjoint(&selection.reach(self.graph)) {
      debug!(affected = %join(&affected), "no change reaches the selection");
      return ModuleSet::new();
    }

    let scope = selection.impact_scope(self.graph);
    let mut impacted: ModuleSet = affected.intersection(&scope).cloned().collect();
    if self.handles_selection(selection) {
      impacted.extend(selection.included().iter().cloned());
    }
    debug!(
      affected = %join(&affected),
      impacted = %join(&impacted),
      "impacted modules"
    );

    impacted
  }

  fn builds_upstream(&self, make_behavior: MakeBehavior) -> bool {
    match self.config.build_upstream {
      BuildUpstream::Always => true,
      BuildUpstream::Never => false,
      BuildUpstream::Derived => make_behavior.includes_upstream(),
    }
  }

  /// Whether explicitly selected modules get special treatment.
  fn handles_selection(&self, selection: &Selection) -> bool {
    !self.config.disable_selected_projects_handling && selection.has_inclusions()
  }

  /// The host's list can stand only if it is exactly the user's explicit
  /// selection (no make-behavior additions, no exclusions) and covers
  /// everything required.
  fn keeps_host_projects(&self, selection: &Selection, host_scope: &ModuleSet, required: &ModuleSet) -> bool {
    if !self.handles_selection(selection) || selection.has_exclusions() {
      return false;
    }
    let roots = selection.roots(self.graph);
    *host_scope == roots && required.is_subset(host_scope)
  }

  /// Nothing is left to build. `excluded_changes` is set when the changes
  /// reached the selection but only impacted excluded modules.
  fn no_changes(&self, changes: &ChangeSet, selection: &Selection, excluded_changes: bool) -> Decision {
    let host_scope = selection.host_scope(self.graph);

    if self.config.build_all || self.config.build_all_if_no_changes {
      let unchanged: ModuleSet = host_scope.iter().filter(|id| !changes.contains(id)).cloned().collect();
      info!(
        modules = host_scope.len(),
        "no impacted modules, building all modules as configured"
      );
      return Decision {
        final_projects: FinalProjects::Unchanged,
        property_overrides: self.upstream_properties(&unchanged, selection),
        short_circuit: false,
      };
    }

    if self.config.disable_selected_projects_handling || excluded_changes {
      // A host session tracks a single current module.
      let final_projects = match selection.current(self.graph) {
        Some(current) => FinalProjects::Override(vec![current]),
        None => FinalProjects::Unchanged,
      };
      info!(excluded_changes, "no impacted modules, skipping the build");
      return Decision {
        final_projects,
        property_overrides: PropertyOverrides::new(),
        short_circuit: true,
      };
    }

    // Drop the make-behavior closures the configuration turns off.
    let make_behavior = selection.make_behavior();
    let upstream = make_behavior.includes_upstream() && self.builds_upstream(make_behavior);
    let downstream = make_behavior.includes_downstream() && self.config.build_downstream;
    let mut allowed = selection.expand(self.graph, upstream, downstream);
    allowed.retain(|id| !selection.is_excluded(id));

    let final_projects = if allowed == host_scope {
      FinalProjects::Unchanged
    } else {
      FinalProjects::Override(self.graph.topological_order(&allowed))
    };

    // The host still builds the upstream modules of the selection.
    let upstream_only = if upstream {
      let roots = selection.roots(self.graph);
      let mut modules = self.graph.upstream_closure(&roots);
      modules.retain(|id| !roots.contains(id));
      modules
    } else {
      ModuleSet::new()
    };

    info!(
      upstream_only = upstream_only.len(),
      "no impacted modules, skipping the build"
    );
    Decision {
      final_projects,
      property_overrides: self.upstream_properties(&upstream_only, selection),
      short_circuit: true,
    }
  }

  fn upstream_properties(&self, modules: &ModuleSet, selection: &Selection) -> PropertyOverrides {
    let mut properties = Properties::new();
    if self.config.skip_tests_for_upstream_modules {
      properties.insert(TEST_SKIP_PROPERTY.to_string(), "true".to_string());
    }
    properties.extend(
      self
        .config
        .args_for_upstream_modules
        .iter()
        .map(|(k, v)| (k.clone(), v.clone())),
    );

    if properties.is_empty() {
      return PropertyOverrides::new();
    }

    modules
      .iter()
      .filter(|id| !selection.is_excluded(id))
      .map(|id| (id.clone(), properties.clone()))
      .collect()
  }
}

/// Convenience wrapper around [`Reducer::reduce`].
pub fn reduce(graph: &DependencyGraph, config: &Config, changes: &ChangeSet, selection: &Selection) -> Decision {
  Reducer::new(graph, config).reduce(changes, selection)
}
