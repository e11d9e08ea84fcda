//! Step definitions and fixtures for remote execution scenarios.

mod bdd_steps;
mod scenarios;
mod test_helpers;
