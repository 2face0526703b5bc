//! Policy configuration.
//!
//! Options are read once per invocation and never change during it. They can
//! be deserialized (camelCase keys) or read from host properties carrying the
//! [`PROPERTY_PREFIX`], e.g. `gib.buildDownstream=false`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of every configuration property.
pub const PROPERTY_PREFIX: &str = "gib.";

/// The property set on modules whose tests are skipped.
pub const TEST_SKIP_PROPERTY: &str = "maven.test.skip";

/// Errors produced while reading configuration properties.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("invalid value '{value}' for {key}: expected true or false")]
  InvalidBool { key: String, value: String },

  #[error("invalid value '{value}' for {key}: expected true, false or derived")]
  InvalidBuildUpstream { key: String, value: String },

  #[error("invalid argument '{0}' in argsForUpstreamModules: expected key=value")]
  InvalidUpstreamArg(String),
}

/// When upstream modules of impacted modules are added to the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BuildUpstreamValue", into = "String")]
pub enum BuildUpstream {
  /// Always build upstream modules.
  #[default]
  Always,
  /// Never build upstream modules; they are resolved from elsewhere.
  Never,
  /// Build upstream modules only when the host itself was asked to (make upstream).
  Derived,
}

impl BuildUpstream {
  pub fn as_str(self) -> &'static str {
    match self {
      BuildUpstream::Always => "true",
      BuildUpstream::Never => "false",
      BuildUpstream::Derived => "derived",
    }
  }
}

impl fmt::Display for BuildUpstream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BuildUpstream {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "" | "true" => Ok(BuildUpstream::Always),
      "false" => Ok(BuildUpstream::Never),
      "derived" => Ok(BuildUpstream::Derived),
      _ => Err(ConfigError::InvalidBuildUpstream {
        key: Property::BuildUpstream.key(),
        value: s.to_string(),
      }),
    }
  }
}

impl From<BuildUpstream> for String {
  fn from(value: BuildUpstream) -> Self {
    value.as_str().to_string()
  }
}

/// Accepts both JSON booleans and the string forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum BuildUpstreamValue {
  Flag(bool),
  Mode(String),
}

impl TryFrom<BuildUpstreamValue> for BuildUpstream {
  type Error = ConfigError;

  fn try_from(value: BuildUpstreamValue) -> Result<Self, Self::Error> {
    match value {
      BuildUpstreamValue::Flag(true) => Ok(BuildUpstream::Always),
      BuildUpstreamValue::Flag(false) => Ok(BuildUpstream::Never),
      BuildUpstreamValue::Mode(mode) => mode.parse(),
    }
  }
}

/// Configuration of one reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
  /// Turns the reducer off; the host's build set stands as is.
  pub disable: bool,

  pub build_upstream: BuildUpstream,

  /// Build modules depending on changed modules.
  pub build_downstream: bool,

  /// Keep building the host's whole set, only marking unchanged modules.
  pub build_all: bool,

  /// Like `build_all`, but only when nothing changed.
  pub build_all_if_no_changes: bool,

  /// Skip tests of modules built only to satisfy compilation.
  pub skip_tests_for_upstream_modules: bool,

  /// Ignore the user's explicit selection when deciding what to build.
  pub disable_selected_projects_handling: bool,

  /// Modules treated as changed regardless of detection (`artifact` or `group:artifact`).
  pub force_build_modules: Vec<String>,

  /// Extra properties applied to modules built only to satisfy compilation.
  pub args_for_upstream_modules: BTreeMap<String, String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      disable: false,
      build_upstream: BuildUpstream::Always,
      build_downstream: true,
      build_all: false,
      build_all_if_no_changes: false,
      skip_tests_for_upstream_modules: false,
      disable_selected_projects_handling: false,
      force_build_modules: Vec::new(),
      args_for_upstream_modules: BTreeMap::new(),
    }
  }
}

/// A configuration property, keyed as `gib.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
  Disable,
  BuildUpstream,
  BuildDownstream,
  BuildAll,
  BuildAllIfNoChanges,
  SkipTestsForUpstreamModules,
  DisableSelectedProjectsHandling,
  ForceBuildModules,
  ArgsForUpstreamModules,
}

impl Property {
  pub const ALL: [Property; 9] = [
    Property::Disable,
    Property::BuildUpstream,
    Property::BuildDownstream,
    Property::BuildAll,
    Property::BuildAllIfNoChanges,
    Property::SkipTestsForUpstreamModules,
    Property::DisableSelectedProjectsHandling,
    Property::ForceBuildModules,
    Property::ArgsForUpstreamModules,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Property::Disable => "disable",
      Property::BuildUpstream => "buildUpstream",
      Property::BuildDownstream => "buildDownstream",
      Property::BuildAll => "buildAll",
      Property::BuildAllIfNoChanges => "buildAllIfNoChanges",
      Property::SkipTestsForUpstreamModules => "skipTestsForUpstreamModules",
      Property::DisableSelectedProjectsHandling => "disableSelectedProjectsHandling",
      Property::ForceBuildModules => "forceBuildModules",
      Property::ArgsForUpstreamModules => "argsForUpstreamModules",
    }
  }

  /// The full property key, including the prefix.
  pub fn key(self) -> String {
    format!("{}{}", PROPERTY_PREFIX, self.name())
  }

  fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|p| p.name() == name)
  }
}

impl Config {
  /// Read configuration from host properties, starting from the defaults.
  ///
  /// Keys without the [`PROPERTY_PREFIX`] are ignored. Unknown keys with the
  /// prefix are logged and ignored so a typo does not abort the build.
  ///
  /// # Errors
  ///
  /// Returns a `ConfigError` for values that cannot be parsed.
  pub fn from_properties<'a, I>(properties: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (&'a str, &'a str)>,
  {
    let mut config = Config::default();
    for (key, value) in properties {
      config.set(key, value)?;
    }
    Ok(config)
  }

  /// Apply a single property on top of the current values.
  pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
    let Some(name) = key.strip_prefix(PROPERTY_PREFIX) else {
      return Ok(());
    };
    let Some(property) = Property::from_name(name) else {
      warn!(key, "ignoring unknown configuration property");
      return Ok(());
    };

    debug!(key, value, "configuration property");
    match property {
      Property::Disable => self.disable = parse_bool(key, value)?,
      Property::BuildUpstream => self.build_upstream = value.parse()?,
      Property::BuildDownstream => self.build_downstream = parse_bool(key, value)?,
      Property::BuildAll => self.build_all = parse_bool(key, value)?,
      Property::BuildAllIfNoChanges => self.build_all_if_no_changes = parse_bool(key, value)?,
      Property::SkipTestsForUpstreamModules => self.skip_tests_for_upstream_modules = parse_bool(key, value)?,
      Property::DisableSelectedProjectsHandling => self.disable_selected_projects_handling = parse_bool(key, value)?,
      Property::ForceBuildModules => self.force_build_modules = parse_list(value),
      Property::ArgsForUpstreamModules => self.args_for_upstream_modules = parse_args(value)?,
    }
    Ok(())
  }
}

/// An empty value means the flag was given without a value (`-Dgib.buildAll`).
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "" | "true" => Ok(true),
    "false" => Ok(false),
    _ => Err(ConfigError::InvalidBool {
      key: key.to_string(),
      value: value.to_string(),
    }),
  }
}

fn parse_list(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}

/// Whitespace separated `key=value` pairs.
fn parse_args(value: &str) -> Result<BTreeMap<String, String>, ConfigError> {
  value
    .split_whitespace()
    .map(|arg| match arg.split_once('=') {
      Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
      _ => Err(ConfigError::InvalidUpstreamArg(arg.to_string())),
    })
    .collect()
}
