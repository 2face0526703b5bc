//! Scenario tests for build-set reduction.
//!
//! Each scenario describes a module inventory, the detected changes, the user's
//! selection and the configuration, and checks the resulting decision.

mod common;
mod deselected_tests;
mod properties_tests;
