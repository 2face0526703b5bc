//! Property tests over random acyclic graphs.

use proptest::prelude::*;

use reactor_lib::change::{ChangeSet, resolve_changes};
use reactor_lib::config::{BuildUpstream, Config};
use reactor_lib::graph::DependencyGraph;
use reactor_lib::module::{Module, ModuleId};
use reactor_lib::reduce::{FinalProjects, reduce};
use reactor_lib::selection::{MakeBehavior, Selection, Selector, resolve_selection};

const MAX_MODULES: usize = 8;

fn module_id(index: usize) -> ModuleId {
  ModuleId::new("com.acme", format!("m{index}"))
}

/// Module `i` may depend on any module declared before it, so every graph is acyclic.
fn graph_strategy() -> impl Strategy<Value = DependencyGraph> {
  prop::collection::vec(any::<u8>(), 1..=MAX_MODULES).prop_map(|masks| {
    let modules: Vec<Module> = masks
      .iter()
      .enumerate()
      .map(|(i, mask)| {
        let upstream = (0..i).filter(|j| mask & (1 << j) != 0).map(module_id);
        Module::new(module_id(i)).depending_on(upstream)
      })
      .collect();
    DependencyGraph::new(&modules).unwrap()
  })
}

fn make_behavior_strategy() -> impl Strategy<Value = MakeBehavior> {
  prop_oneof![
    Just(MakeBehavior::None),
    Just(MakeBehavior::Upstream),
    Just(MakeBehavior::Downstream),
    Just(MakeBehavior::Both),
  ]
}

fn build_upstream_strategy() -> impl Strategy<Value = BuildUpstream> {
  prop_oneof![
    Just(BuildUpstream::Always),
    Just(BuildUpstream::Never),
    Just(BuildUpstream::Derived),
  ]
}

fn config_strategy() -> impl Strategy<Value = Config> {
  (build_upstream_strategy(), any::<[bool; 5]>()).prop_map(|(build_upstream, flags)| Config {
    build_upstream,
    build_downstream: flags[0],
    build_all: flags[1],
    build_all_if_no_changes: flags[2],
    skip_tests_for_upstream_modules: flags[3],
    disable_selected_projects_handling: flags[4],
    ..Config::default()
  })
}

fn pick(graph: &DependencyGraph, mask: u8) -> Vec<ModuleId> {
  graph
    .modules()
    .enumerate()
    .filter(|(i, _)| mask & (1 << i) != 0)
    .map(|(_, id)| id.clone())
    .collect()
}

fn changes(graph: &DependencyGraph, mask: u8) -> ChangeSet {
  resolve_changes(graph, &pick(graph, mask), &[] as &[&str]).unwrap()
}

fn selection(graph: &DependencyGraph, include: u8, exclude: u8, make: MakeBehavior) -> Selection {
  let mut selectors: Vec<Selector> = Vec::new();
  for id in pick(graph, include) {
    selectors.push(id.to_string().parse().unwrap());
  }
  for id in pick(graph, exclude) {
    selectors.push(format!("!{id}").parse().unwrap());
  }
  resolve_selection(graph, &selectors, make).unwrap()
}

proptest! {
  /// The same inputs always produce the same decision.
  #[test]
  fn reduction_is_idempotent(
    graph in graph_strategy(),
    config in config_strategy(),
    changed in any::<u8>(),
    include in any::<u8>(),
    exclude in any::<u8>(),
    make in make_behavior_strategy(),
  ) {
    let changes = changes(&graph, changed);
    let selection = selection(&graph, include, exclude, make);

    let first = reduce(&graph, &config, &changes, &selection);
    let second = reduce(&graph, &config, &changes, &selection);
    prop_assert_eq!(first, second);
  }

  /// Excluded modules never appear in an explicit list and never receive properties.
  #[test]
  fn exclusions_are_absolute(
    graph in graph_strategy(),
    config in config_strategy(),
    changed in any::<u8>(),
    include in any::<u8>(),
    exclude in any::<u8>(),
    make in make_behavior_strategy(),
  ) {
    let changes = changes(&graph, changed);
    let selection = selection(&graph, include, exclude, make);
    let decision = reduce(&graph, &config, &changes, &selection);

    for id in selection.excluded() {
      if let Some(modules) = decision.final_projects.modules() {
        prop_assert!(!modules.contains(id));
      }
      prop_assert!(decision.properties(id).is_none());
    }
  }

  /// Over the whole graph with upstream building, every changed module is built
  /// along with everything it depends on, in build order.
  #[test]
  fn whole_graph_build_is_sufficient(
    graph in graph_strategy(),
    changed in 1u8..,
  ) {
    let changes = changes(&graph, changed);
    prop_assume!(!changes.is_empty());

    let decision = reduce(&graph, &Config::default(), &changes, &Selection::all());
    let FinalProjects::Override(modules) = &decision.final_projects else {
      return Err(TestCaseError::fail("expected an explicit module list"));
    };

    for id in changes.changed() {
      prop_assert!(modules.contains(id));
      for downstream in graph.downstream(id) {
        prop_assert!(modules.contains(downstream));
      }
    }
    for (position, id) in modules.iter().enumerate() {
      for upstream in graph.upstream(id) {
        let upstream_position = modules.iter().position(|m| m == upstream);
        prop_assert!(upstream_position.is_some_and(|p| p < position));
      }
    }
  }

  /// With upstream building off, nothing outside the changes and their
  /// downstream closure is built.
  #[test]
  fn disabled_upstream_builds_only_impacted_modules(
    graph in graph_strategy(),
    changed in any::<u8>(),
  ) {
    let changes = changes(&graph, changed);
    let config = Config { build_upstream: BuildUpstream::Never, ..Config::default() };
    let decision = reduce(&graph, &config, &changes, &Selection::all());

    let mut impacted = changes.changed().clone();
    impacted.extend(graph.downstream_closure(changes.changed()));
    if let Some(modules) = decision.final_projects.modules() {
      prop_assert_eq!(modules.len(), impacted.len());
      prop_assert!(modules.iter().all(|id| impacted.contains(id)));
    }
    prop_assert!(decision.property_overrides.is_empty());
  }

  /// Without changes the invocation is skipped unless build-all is configured.
  /// Only upstream modules the host adds around the selection keep properties.
  #[test]
  fn no_changes_short_circuit(
    graph in graph_strategy(),
    config in config_strategy(),
    include in any::<u8>(),
    exclude in any::<u8>(),
    make in make_behavior_strategy(),
  ) {
    let selection = selection(&graph, include, exclude, make);
    let decision = reduce(&graph, &config, &changes(&graph, 0), &selection);

    let builds_all = config.build_all || config.build_all_if_no_changes;
    prop_assert_eq!(decision.short_circuit, !builds_all);
    if decision.short_circuit {
      let roots = selection.roots(&graph);
      for id in decision.property_overrides.keys() {
        prop_assert!(!roots.contains(id));
        prop_assert!(graph.upstream_closure(&roots).contains(id));
      }
    }
  }
}
