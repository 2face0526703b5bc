//! Reductions with deselected modules (`-pl !module-a`).

use super::common::*;

mod upstream_deselected {
  use super::*;

  #[test]
  fn downstream_of_the_change_is_built() {
    let reduction = Scenario::chain().select("!module-a").changed(&["module-a"]).run();

    assert_projects(&reduction, &["module-b", "module-c"]);
    assert!(reduction.decision.properties(&id("module-a")).is_none());
  }

  #[test]
  fn downstream_disabled_keeps_the_first_remaining_module() {
    let reduction = Scenario::chain()
      .select("!module-a")
      .changed(&["module-a"])
      .set("buildDownstream", "false")
      .run();

    assert_short_circuit_on(&reduction, &["module-b"]);
    assert!(reduction.decision.property_overrides.is_empty());
  }

  #[test]
  fn downstream_disabled_builds_all_if_no_changes() {
    let reduction = Scenario::chain()
      .select("!module-a")
      .changed(&["module-a"])
      .set("buildDownstream", "false")
      .set("buildAllIfNoChanges", "true")
      .run();

    assert_unchanged(&reduction);
    assert_test_skipped(&reduction, &["module-b", "module-c"]);
  }
}

mod middle_deselected {
  use super::*;

  #[test]
  fn only_downstream_is_built() {
    let reduction = Scenario::chain().select("!module-b").changed(&["module-b"]).run();

    assert_projects(&reduction, &["module-c"]);
    assert_test_skipped(&reduction, &[]);
  }

  #[test]
  fn downstream_disabled_keeps_the_first_remaining_module() {
    let reduction = Scenario::chain()
      .select("!module-b")
      .changed(&["module-b"])
      .set("buildDownstream", "false")
      .run();

    assert_short_circuit_on(&reduction, &["module-a"]);
    assert!(reduction.decision.properties(&id("module-a")).is_none());
  }

  #[test]
  fn downstream_disabled_builds_all_if_no_changes() {
    let reduction = Scenario::chain()
      .select("!module-b")
      .changed(&["module-b"])
      .set("buildDownstream", "false")
      .set("buildAllIfNoChanges", "true")
      .run();

    assert_unchanged(&reduction);
    assert_test_skipped(&reduction, &["module-a", "module-c"]);
  }

  #[test]
  fn with_upstream_the_deselected_module_stays_out() {
    let reduction = Scenario::chain()
      .select("!module-b")
      .changed(&["module-b"])
      .set("buildUpstream", "true")
      .run();

    assert_projects(&reduction, &["module-a", "module-c"]);
    assert_test_skipped(&reduction, &["module-a"]);
    assert!(reduction.decision.properties(&id("module-b")).is_none());
  }

  #[test]
  fn with_upstream_and_downstream_disabled_builds_the_upstream_module() {
    let reduction = Scenario::chain()
      .select("!module-b")
      .changed(&["module-b"])
      .set("buildUpstream", "true")
      .set("buildDownstream", "false")
      .run();

    assert_projects(&reduction, &["module-a"]);
    assert_test_skipped(&reduction, &["module-a"]);
    assert!(reduction.decision.properties(&id("module-b")).is_none());
  }
}

#[test]
fn deselection_wins_over_selection() {
  let reduction = Scenario::chain()
    .select("module-b,!module-b")
    .changed(&["module-a"])
    .run();

  assert!(reduction.selection.included().is_empty());
  assert!(reduction.selection.is_excluded(&id("module-b")));
  assert_projects(&reduction, &["module-a", "module-c"]);
}

