//! Change set resolution.
//!
//! Merges the modules reported changed by the external detector with the
//! modules forced into the build by configuration.

use thiserror::Error;
use tracing::info;

use crate::graph::{DependencyGraph, GraphError, ModuleSet};
use crate::module::{ModuleId, ModuleIdError, ModuleRef};

/// Configuration errors found while resolving the change set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
  #[error("invalid force-build entry '{entry}': {source}")]
  InvalidForceBuild {
    entry: String,
    #[source]
    source: ModuleIdError,
  },

  #[error("force-build entry '{entry}' does not name a module of this build: {source}")]
  UnknownForceBuild {
    entry: String,
    #[source]
    source: GraphError,
  },

  #[error("changed module '{0}' is not part of this build")]
  UnknownChanged(ModuleId),
}

/// The modules to treat as changed for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
  detected: ModuleSet,
  forced: ModuleSet,
  changed: ModuleSet,
}

impl ChangeSet {
  /// Modules reported by the change detector.
  pub fn detected(&self) -> &ModuleSet {
    &self.detected
  }

  /// Modules named by the force-build list.
  pub fn forced(&self) -> &ModuleSet {
    &self.forced
  }

  /// Union of detected and forced modules.
  pub fn changed(&self) -> &ModuleSet {
    &self.changed
  }

  pub fn contains(&self, id: &ModuleId) -> bool {
    self.changed.contains(id)
  }

  pub fn is_empty(&self) -> bool {
    self.changed.is_empty()
  }
}

/// Union the detected changes with the force-build list.
///
/// Force-build entries are `artifact`, `:artifact` or `group:artifact`,
/// matched case-sensitively.
///
/// # Errors
///
/// A detected module or force-build entry unknown to the graph is a
/// configuration error: building the wrong set silently is worse than failing.
pub fn resolve_changes<'a, I, S>(graph: &DependencyGraph, detected: I, force_build: &[S]) -> Result<ChangeSet, ChangeError>
where
  I: IntoIterator<Item = &'a ModuleId>,
  S: AsRef<str>,
{
  let mut set = ChangeSet::default();

  for id in detected {
    if !graph.contains(id) {
      return Err(ChangeError::UnknownChanged(id.clone()));
    }
    set.detected.insert(id.clone());
  }

  for entry in force_build {
    let entry = entry.as_ref();
    let reference: ModuleRef = entry.parse().map_err(|source| ChangeError::InvalidForceBuild {
      entry: entry.to_string(),
      source,
    })?;
    let id = graph.find(&reference).map_err(|source| ChangeError::UnknownForceBuild {
      entry: entry.to_string(),
      source,
    })?;
    set.forced.insert(id.clone());
  }

  set.changed = set.detected.union(&set.forced).cloned().collect();

  info!(
    detected = set.detected.len(),
    forced = set.forced.len(),
    changed = %join(&set.changed),
    "resolved changed modules"
  );

  Ok(set)
}

pub(crate) fn join(set: &ModuleSet) -> String {
  set.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
