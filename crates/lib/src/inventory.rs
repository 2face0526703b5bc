//! Serializable snapshot of one host invocation.
//!
//! An inventory carries everything the reducer consumes: the module list in
//! the host's reactor order, the changed module ids, the selection specifiers,
//! the make behavior and the configuration properties. The CLI reads it from
//! JSON; tests build it in memory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::apply::{MemorySession, apply_decision};
use crate::change::{ChangeSet, resolve_changes};
use crate::config::{Config, ConfigError};
use crate::error::ReactorError;
use crate::graph::{DependencyGraph, GraphError};
use crate::module::{Module, ModuleId};
use crate::reduce::{Decision, reduce};
use crate::selection::{MakeBehavior, Selection, SelectionError, Selector, resolve_selection};

#[derive(Debug, Error)]
pub enum InventoryError {
  #[error("inventory file not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("failed to read inventory {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse inventory: {0}")]
  Parse(#[source] serde_json::Error),
}

fn default_goals() -> Vec<String> {
  vec!["install".to_string()]
}

/// One invocation of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
  /// Modules in the host's reactor order.
  pub modules: Vec<Module>,

  /// Modules reported changed by the change detector.
  #[serde(default)]
  pub changed: Vec<ModuleId>,

  /// Selection specifiers, as given to `-pl`.
  #[serde(default)]
  pub selection: Vec<String>,

  #[serde(default)]
  pub make_behavior: MakeBehavior,

  #[serde(default = "default_goals")]
  pub goals: Vec<String>,

  /// Host properties; `gib.`-prefixed keys configure the reducer.
  #[serde(default)]
  pub properties: BTreeMap<String, String>,
}

impl Inventory {
  /// An inventory of the given modules with nothing changed or selected.
  pub fn new(modules: Vec<Module>) -> Self {
    Self {
      modules,
      changed: Vec::new(),
      selection: Vec::new(),
      make_behavior: MakeBehavior::default(),
      goals: default_goals(),
      properties: BTreeMap::new(),
    }
  }

  /// Load an inventory from a JSON file.
  pub fn load(path: &Path) -> Result<Self, InventoryError> {
    let content = fs::read_to_string(path).map_err(|source| {
      if source.kind() == io::ErrorKind::NotFound {
        InventoryError::NotFound(path.to_path_buf())
      } else {
        InventoryError::Read {
          path: path.to_path_buf(),
          source,
        }
      }
    })?;

    let inventory = Self::from_json(&content)?;
    debug!(path = %path.display(), modules = inventory.modules.len(), "loaded inventory");
    Ok(inventory)
  }

  pub fn from_json(content: &str) -> Result<Self, InventoryError> {
    serde_json::from_str(content).map_err(InventoryError::Parse)
  }

  pub fn graph(&self) -> Result<DependencyGraph, GraphError> {
    DependencyGraph::new(&self.modules)
  }

  pub fn config(&self) -> Result<Config, ConfigError> {
    Config::from_properties(self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())))
  }

  /// Parse the selection specifiers. Each entry may hold a comma-separated list.
  pub fn selectors(&self) -> Result<Vec<Selector>, SelectionError> {
    let mut selectors = Vec::new();
    for spec in &self.selection {
      selectors.extend(Selector::parse_list(spec)?);
    }
    Ok(selectors)
  }

  /// Resolve every input and reduce the build set.
  pub fn run(&self) -> Result<Reduction, ReactorError> {
    let graph = self.graph()?;
    let config = self.config()?;
    let changes = resolve_changes(&graph, &self.changed, &config.force_build_modules)?;
    let selection = resolve_selection(&graph, &self.selectors()?, self.make_behavior)?;
    let decision = reduce(&graph, &config, &changes, &selection);

    info!(
      modules = graph.len(),
      changed = changes.changed().len(),
      short_circuit = decision.short_circuit,
      "reduced build set"
    );

    Ok(Reduction {
      graph,
      config,
      changes,
      selection,
      decision,
      goals: self.goals.clone(),
    })
  }
}

/// The resolved inputs and the decision of one reduction.
#[derive(Debug, Clone)]
pub struct Reduction {
  pub graph: DependencyGraph,
  pub config: Config,
  pub changes: ChangeSet,
  pub selection: Selection,
  pub decision: Decision,
  pub goals: Vec<String>,
}

impl Reduction {
  /// The session the host would start with: the selection's modules in
  /// build order and the requested goals.
  pub fn host_session(&self) -> MemorySession {
    let projects = self.graph.topological_order(&self.selection.host_scope(&self.graph));
    MemorySession::new(projects, self.goals.clone())
  }

  /// The host session after the decision has been applied.
  pub fn session(&self) -> MemorySession {
    let mut session = self.host_session();
    let Ok(()) = apply_decision(&self.decision, &mut session);
    session
  }
}
