//! Umbrella error for a whole reduction.

use thiserror::Error;

use crate::change::ChangeError;
use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::inventory::InventoryError;
use crate::selection::SelectionError;

#[derive(Debug, Error)]
pub enum ReactorError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Change(#[from] ChangeError),

  #[error(transparent)]
  Selection(#[from] SelectionError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Inventory(#[from] InventoryError),
}

impl ReactorError {
  /// Whether the error comes from an inconsistent module inventory rather than
  /// from user configuration.
  pub fn is_invariant_violation(&self) -> bool {
    matches!(
      self,
      ReactorError::Graph(
        GraphError::DuplicateModule(_) | GraphError::UnknownDependency { .. } | GraphError::CycleDetected(_)
      )
    )
  }
}
