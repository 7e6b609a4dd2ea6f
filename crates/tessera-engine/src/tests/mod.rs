//! Scenario tests for the tessera-engine crate.

mod helpers;
