//! Module identity.
//!
//! A module is identified by its group and artifact id, written `group:artifact`.
//! Artifact ids are usually unique on their own, so user-facing specifiers may
//! omit the group (`artifact` or `:artifact`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a module id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleIdError {
  #[error("module id is empty")]
  Empty,

  #[error("module id '{0}' has an empty artifact id")]
  EmptyArtifact(String),

  #[error("module id '{0}' has more than one ':' separator")]
  TooManySeparators(String),
}

/// The identity of a module, unique within a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId {
  group: String,
  artifact: String,
}

impl ModuleId {
  pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
    Self {
      group: group.into(),
      artifact: artifact.into(),
    }
  }

  pub fn group(&self) -> &str {
    &self.group
  }

  pub fn artifact(&self) -> &str {
    &self.artifact
  }

  /// Whether this id is matched by a (possibly group-less) reference.
  ///
  /// Matching is case-sensitive. A reference without a group matches any group.
  pub fn matches(&self, reference: &ModuleRef) -> bool {
    self.artifact == reference.artifact && reference.group.as_deref().is_none_or(|g| g == self.group)
  }
}

impl fmt::Display for ModuleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.group, self.artifact)
  }
}

impl FromStr for ModuleId {
  type Err = ModuleIdError;

  /// Parses `group:artifact`. A bare `artifact` gets an empty group.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let reference = ModuleRef::from_str(s)?;
    Ok(Self {
      group: reference.group.unwrap_or_default(),
      artifact: reference.artifact,
    })
  }
}

impl TryFrom<String> for ModuleId {
  type Error = ModuleIdError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<ModuleId> for String {
  fn from(id: ModuleId) -> Self {
    id.to_string()
  }
}

/// A user-supplied reference to a module: `artifact`, `:artifact` or `group:artifact`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
  pub group: Option<String>,
  pub artifact: String,
}

impl fmt::Display for ModuleRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.group {
      Some(group) => write!(f, "{}:{}", group, self.artifact),
      None => write!(f, ":{}", self.artifact),
    }
  }
}

impl FromStr for ModuleRef {
  type Err = ModuleIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      return Err(ModuleIdError::Empty);
    }

    let mut parts = s.split(':');
    let first = parts.next().unwrap_or_default();
    let (group, artifact) = match (parts.next(), parts.next()) {
      (None, _) => (None, first),
      (Some(artifact), None) if first.is_empty() => (None, artifact),
      (Some(artifact), None) => (Some(first.to_string()), artifact),
      (Some(_), Some(_)) => return Err(ModuleIdError::TooManySeparators(s.to_string())),
    };

    if artifact.is_empty() {
      return Err(ModuleIdError::EmptyArtifact(s.to_string()));
    }

    Ok(Self {
      group,
      artifact: artifact.to_string(),
    })
  }
}

/// A module as known to the host: identity plus direct upstream dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
  pub id: ModuleId,

  /// Direct upstream modules (the modules this one depends on).
  #[serde(default)]
  pub depends_on: Vec<ModuleId>,
}

impl Module {
  pub fn new(id: ModuleId) -> Self {
    Self {
      id,
      depends_on: Vec::new(),
    }
  }

  pub fn depending_on(mut self, upstream: impl IntoIterator<Item = ModuleId>) -> Self {
    self.depends_on.extend(upstream);
    self
  }
}
