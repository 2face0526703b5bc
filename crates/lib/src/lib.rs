//! reactor-lib: build-set reduction for multi-module builds
//!
//! Given the module dependency graph, the modules changed since a baseline and
//! the user's selection, this crate decides which modules the host actually
//! has to build:
//! - `DependencyGraph`: modules with their upstream/downstream edges and a fixed build order
//! - `ChangeSet` and `Selection`: the resolved inputs of one invocation
//! - `Config`: the reduction policy, read from `gib.` properties
//! - `Decision`: the final module list, per-module properties and the short-circuit flag
//! - `HostSession`: the seam through which a decision is applied to the host

pub mod apply;
pub mod change;
pub mod config;
pub mod error;
pub mod graph;
pub mod inventory;
pub mod module;
pub mod reduce;
pub mod selection;

pub use error::ReactorError;
