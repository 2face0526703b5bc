//! Module selection.
//!
//! Parses the user's inclusion/exclusion specifiers (`-pl a,!b`) into concrete
//! module sets and models the host's make behavior: the closures the host adds
//! around the inclusions on its own (`-am`, `-amd`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::graph::{DependencyGraph, GraphError, ModuleSet};
use crate::module::{ModuleId, ModuleIdError, ModuleRef};

/// Configuration errors found in a selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
  #[error("invalid selector '{selector}': {source}")]
  InvalidSelector {
    selector: String,
    #[source]
    source: ModuleIdError,
  },

  #[error("selector '{selector}' does not name a module of this build: {source}")]
  UnknownModule {
    selector: String,
    #[source]
    source: GraphError,
  },

  #[error("unknown make behavior '{0}': expected none, upstream, downstream or both")]
  InvalidMakeBehavior(String),
}

/// Closures the host adds around the selected modules without being told.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MakeBehavior {
  #[default]
  None,
  /// Also make the dependencies of the selected modules (`-am`).
  Upstream,
  /// Also make the dependents of the selected modules (`-amd`).
  Downstream,
  /// Both of the above.
  Both,
}

impl MakeBehavior {
  pub fn includes_upstream(self) -> bool {
    matches!(self, MakeBehavior::Upstream | MakeBehavior::Both)
  }

  pub fn includes_downstream(self) -> bool {
    matches!(self, MakeBehavior::Downstream | MakeBehavior::Both)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      MakeBehavior::None => "none",
      MakeBehavior::Upstream => "upstream",
      MakeBehavior::Downstream => "downstream",
      MakeBehavior::Both => "both",
    }
  }
}

impl fmt::Display for MakeBehavior {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MakeBehavior {
  type Err = SelectionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "" | "none" => Ok(MakeBehavior::None),
      "upstream" | "am" | "make-upstream" => Ok(MakeBehavior::Upstream),
      "downstream" | "amd" | "make-downstream" => Ok(MakeBehavior::Downstream),
      "both" | "make-both" => Ok(MakeBehavior::Both),
      _ => Err(SelectionError::InvalidMakeBehavior(s.to_string())),
    }
  }
}

/// One parsed selection specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
  Include(ModuleRef),
  Exclude(ModuleRef),
}

impl Selector {
  /// Parse a comma separated specifier list, skipping blank entries.
  pub fn parse_list(spec: &str) -> Result<Vec<Selector>, SelectionError> {
    spec
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::parse)
      .collect()
  }
}

impl FromStr for Selector {
  type Err = SelectionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    let (exclude, rest) = match s.strip_prefix(['!', '-']) {
      Some(rest) => (true, rest),
      None => (false, s),
    };

    let reference: ModuleRef = rest.parse().map_err(|source| SelectionError::InvalidSelector {
      selector: s.to_string(),
      source,
    })?;

    Ok(if exclude {
      Selector::Exclude(reference)
    } else {
      Selector::Include(reference)
    })
  }
}

/// The user's resolved selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  /// Explicit inclusions, in the order given, without excluded modules.
  included: Vec<ModuleId>,
  excluded: ModuleSet,
  make_behavior: MakeBehavior,
}

impl Selection {
  /// The whole graph, with no make behavior.
  pub fn all() -> Self {
    Self::default()
  }

  /// Explicit inclusions in specifier order. Empty means every module.
  pub fn included(&self) -> &[ModuleId] {
    &self.included
  }

  pub fn excluded(&self) -> &ModuleSet {
    &self.excluded
  }

  pub fn make_behavior(&self) -> MakeBehavior {
    self.make_behavior
  }

  /// Whether no module was explicitly included (the whole graph is in scope).
  pub fn is_all(&self) -> bool {
    self.included.is_empty()
  }

  pub fn has_inclusions(&self) -> bool {
    !self.included.is_empty()
  }

  pub fn has_exclusions(&self) -> bool {
    !self.excluded.is_empty()
  }

  pub fn is_excluded(&self, id: &ModuleId) -> bool {
    self.excluded.contains(id)
  }

  /// The explicit inclusions, or every module of the graph when there are none.
  pub fn roots(&self, graph: &DependencyGraph) -> ModuleSet {
    if self.is_all() {
      graph.all()
    } else {
      self.included.iter().cloned().collect()
    }
  }

  /// The roots plus their upstream and downstream closures as requested.
  /// Exclusions are not applied.
  pub fn expand(&self, graph: &DependencyGraph, upstream: bool, downstream: bool) -> ModuleSet {
    let roots = self.roots(graph);
    let mut scope = roots.clone();
    if upstream {
      scope.extend(graph.upstream_closure(&roots));
    }
    if downstream {
      scope.extend(graph.downstream_closure(&roots));
    }
    scope
  }

  /// Everything the make behavior reaches from the roots, excluded modules
  /// included. A change outside of it does not concern this invocation.
  pub fn reach(&self, graph: &DependencyGraph) -> ModuleSet {
    self.expand(
      graph,
      self.make_behavior.includes_upstream(),
      self.make_behavior.includes_downstream(),
    )
  }

  /// The modules the host builds on its own: the roots plus the make-behavior
  /// closures, minus exclusions.
  pub fn host_scope(&self, graph: &DependencyGraph) -> ModuleSet {
    let mut scope = self.reach(graph);
    scope.retain(|id| !self.excluded.contains(id));
    scope
  }

  /// The modules whose changes are built and tested: the roots plus their
  /// downstream closure when the make behavior has downstream.
  ///
  /// Modules the host adds through its upstream closure only support
  /// compilation of the selection. Excluded modules stay in this scope so
  /// their downstream and upstream modules are still found.
  pub fn impact_scope(&self, graph: &DependencyGraph) -> ModuleSet {
    self.expand(graph, false, self.make_behavior.includes_downstream())
  }

  /// The module a host session treats as currently building: the first
  /// explicit inclusion, else the first module of the host scope.
  pub fn current(&self, graph: &DependencyGraph) -> Option<ModuleId> {
    if let Some(first) = self.included.first() {
      return Some(first.clone());
    }
    graph.topological_order(&self.host_scope(graph)).into_iter().next()
  }
}

/// Resolve specifiers against the graph.
///
/// Exclusions always win: a module both included and excluded is only excluded.
///
/// # Errors
///
/// Specifiers that are malformed or name no module of the graph are
/// configuration errors.
pub fn resolve_selection(
  graph: &DependencyGraph,
  selectors: &[Selector],
  make_behavior: MakeBehavior,
) -> Result<Selection, SelectionError> {
  let mut included = Vec::new();
  let mut excluded = ModuleSet::new();

  for selector in selectors {
    let (reference, exclude) = match selector {
      Selector::Include(reference) => (reference, false),
      Selector::Exclude(reference) => (reference, true),
    };
    let id = graph.find(reference).map_err(|source| SelectionError::UnknownModule {
      selector: reference.to_string(),
      source,
    })?;

    if exclude {
      excluded.insert(id.clone());
    } else if !included.contains(id) {
      included.push(id.clone());
    }
  }

  let before = included.len();
  included.retain(|id| !excluded.contains(id));
  if included.len() < before {
    warn!(
      conflicts = before - included.len(),
      "modules both selected and deselected, deselection wins"
    );
  }

  debug!(
    included = included.len(),
    excluded = excluded.len(),
    make_behavior = %make_behavior,
    "resolved selection"
  );

  Ok(Selection {
    included,
    excluded,
    make_behavior,
  })
}
