//! Shared test infrastructure for rack-pdu.
//!
//! Provides a fixture device and `TestAgent`, a UDP responder that answers
//! community messages from a `MockDevice`.

// Not every test file uses every helper
#![allow(dead_code)]

pub mod agent;
pub mod fixtures;

pub use agent::TestAgent;
pub use fixtures::{fixture_device, fixture_pdu};
