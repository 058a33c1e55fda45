//! Domain logic for the Atelier backend.
//!
//! Pure types and functions shared by the persistence, provider, and API
//! crates: the error taxonomy, status state machines, the generation
//! aggregation rule, the dataset change gate, trigger-word generation,
//! photo validation, and webhook signature verification.
//!
//! This crate performs no I/O. Everything here is directly unit testable.

pub mod dataset;
pub mod error;
pub mod generation;
pub mod photos;
pub mod signing;
pub mod status;
pub mod training;
pub mod trigger_word;
pub mod types;
