//! Module wiring for the stack composition behavioural suite.

pub mod bdd_steps;
pub mod scenarios;
pub mod test_helpers;
