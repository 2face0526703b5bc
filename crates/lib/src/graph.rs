//! Module dependency graph.
//!
//! This module provides a directed acyclic graph over the modules of one build
//! invocation. Edges run from a dependency (upstream) to its dependent
//! (downstream), so both directions are answered from the same edge list and
//! can never disagree.
//!
//! The graph also fixes the build order: a topological order that keeps the
//! host's inventory order among modules not ordered by an edge. Subsets are
//! always returned in that order so an explicit module list never reorders the
//! host's reactor.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, VecDeque};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::debug;

use crate::module::{Module, ModuleId, ModuleRef};

/// An ordered set of module ids.
pub type ModuleSet = BTreeSet<ModuleId>;

/// Errors raised while building or querying the graph.
///
/// Construction errors are invariant violations: the host handed over an
/// inventory that cannot describe a buildable reactor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("module '{0}' is declared more than once")]
  DuplicateModule(ModuleId),

  #[error("module '{module}' depends on '{dependency}', which is not part of the build")]
  UnknownDependency { module: ModuleId, dependency: ModuleId },

  #[error("dependency cycle detected involving {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
  CycleDetected(Vec<ModuleId>),

  #[error("no module matches '{0}'")]
  UnknownModule(String),

  #[error("'{reference}' is ambiguous, it matches {}", .candidates.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
  AmbiguousModule {
    reference: String,
    candidates: Vec<ModuleId>,
  },
}

/// A read-only dependency graph with a fixed build order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  /// The underlying graph. Node indices follow the inventory order.
  graph: DiGraph<ModuleId, ()>,

  /// Map from module id to node index.
  nodes: HashMap<ModuleId, NodeIndex>,

  /// Position of each node in the build order, indexed by node index.
  rank: Vec<usize>,

  /// Nodes in build order.
  order: Vec<NodeIndex>,
}

impl DependencyGraph {
  /// Build a graph from the host's module inventory.
  ///
  /// The inventory order is the host's reactor order and breaks ties in the
  /// build order.
  ///
  /// # Errors
  ///
  /// Returns `DuplicateModule` and `UnknownDependency` for inconsistent
  /// inventories and `CycleDetected` if the dependencies form a cycle.
  pub fn new(modules: &[Module]) -> Result<Self, GraphError> {
    let mut graph = DiGraph::with_capacity(modules.len(), modules.len());
    let mut nodes = HashMap::with_capacity(modules.len());

    // First pass: one node per module
    for module in modules {
      if nodes.contains_key(&module.id) {
        return Err(GraphError::DuplicateModule(module.id.clone()));
      }
      let idx = graph.add_node(module.id.clone());
      nodes.insert(module.id.clone(), idx);
    }

    // Second pass: edges from dependency to dependent
    for module in modules {
      let dependent = nodes[&module.id];
      for dependency in &module.depends_on {
        let Some(&upstream) = nodes.get(dependency) else {
          return Err(GraphError::UnknownDependency {
            module: module.id.clone(),
            dependency: dependency.clone(),
          });
        };
        graph.update_edge(upstream, dependent, ());
      }
    }

    let order = build_order(&graph)?;
    let mut rank = vec![0; order.len()];
    for (position, idx) in order.iter().enumerate() {
      rank[idx.index()] = position;
    }

    debug!(
      modules = graph.node_count(),
      edges = graph.edge_count(),
      "built dependency graph"
    );

    Ok(Self {
      graph,
      nodes,
      rank,
      order,
    })
  }

  /// Number of modules in the graph.
  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn contains(&self, id: &ModuleId) -> bool {
    self.nodes.contains_key(id)
  }

  /// All modules in build order.
  pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
    self.order.iter().map(|&idx| &self.graph[idx])
  }

  /// All modules as a set.
  pub fn all(&self) -> ModuleSet {
    self.modules().cloned().collect()
  }

  /// Resolve a user reference (`artifact`, `:artifact`, `group:artifact`) to a module.
  ///
  /// # Errors
  ///
  /// Returns `UnknownModule` when nothing matches and `AmbiguousModule` when a
  /// group-less reference matches artifacts in several groups.
  pub fn find(&self, reference: &ModuleRef) -> Result<&ModuleId, GraphError> {
    let candidates: Vec<&ModuleId> = self.modules().filter(|id| id.matches(reference)).collect();

    match candidates.as_slice() {
      [] => Err(GraphError::UnknownModule(reference.to_string())),
      [single] => Ok(*single),
      _ => Err(GraphError::AmbiguousModule {
        reference: reference.to_string(),
        candidates: candidates.into_iter().cloned().collect(),
      }),
    }
  }

  /// Direct upstream modules (dependencies) of a module, in build order.
  pub fn upstream(&self, id: &ModuleId) -> Vec<&ModuleId> {
    self.neighbors(id, Direction::Incoming)
  }

  /// Direct downstream modules (dependents) of a module, in build order.
  pub fn downstream(&self, id: &ModuleId) -> Vec<&ModuleId> {
    self.neighbors(id, Direction::Outgoing)
  }

  /// Transitive upstream closure of `seeds`, excluding the seeds themselves
  /// unless one seed is upstream of another.
  pub fn upstream_closure(&self, seeds: &ModuleSet) -> ModuleSet {
    self.closure(seeds, Direction::Incoming)
  }

  /// Transitive downstream closure of `seeds`, excluding the seeds themselves
  /// unless one seed is downstream of another.
  pub fn downstream_closure(&self, seeds: &ModuleSet) -> ModuleSet {
    self.closure(seeds, Direction::Outgoing)
  }

  /// The members of `set` in build order. Ids unknown to the graph are dropped.
  pub fn topological_order(&self, set: &ModuleSet) -> Vec<ModuleId> {
    let mut indices: Vec<NodeIndex> = set.iter().filter_map(|id| self.nodes.get(id).copied()).collect();
    indices.sort_by_key(|idx| self.rank[idx.index()]);
    indices.into_iter().map(|idx| self.graph[idx].clone()).collect()
  }

  fn neighbors(&self, id: &ModuleId, direction: Direction) -> Vec<&ModuleId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };

    let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
    neighbors.sort_by_key(|n| self.rank[n.index()]);
    neighbors.into_iter().map(|n| &self.graph[n]).collect()
  }

  fn closure(&self, seeds: &ModuleSet, direction: Direction) -> ModuleSet {
    let mut result = ModuleSet::new();
    let mut queue: VecDeque<NodeIndex> = seeds.iter().filter_map(|id| self.nodes.get(id).copied()).collect();

    while let Some(idx) = queue.pop_front() {
      for next in self.graph.neighbors_directed(idx, direction) {
        if result.insert(self.graph[next].clone()) {
          queue.push_back(next);
        }
      }
    }

    result
  }
}

/// Kahn's algorithm, always releasing the ready node that came first in the
/// inventory.
fn build_order(graph: &DiGraph<ModuleId, ()>) -> Result<Vec<NodeIndex>, GraphError> {
  let mut in_degree: Vec<usize> = graph
    .node_indices()
    .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
    .collect();

  let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
    .node_indices()
    .filter(|idx| in_degree[idx.index()] == 0)
    .map(Reverse)
    .collect();

  let mut order = Vec::with_capacity(graph.node_count());
  while let Some(Reverse(idx)) = ready.pop() {
    order.push(idx);
    for dependent in graph.neighbors_directed(idx, Direction::Outgoing) {
      let degree = &mut in_degree[dependent.index()];
      *degree -= 1;
      if *degree == 0 {
        ready.push(Reverse(dependent));
      }
    }
  }

  if order.len() < graph.node_count() {
    let cyclic = graph
      .node_indices()
      .filter(|idx| in_degree[idx.index()] > 0)
      .map(|idx| graph[idx].clone())
      .collect();
    return Err(GraphError::CycleDetected(cyclic));
  }

  Ok(order)
}
