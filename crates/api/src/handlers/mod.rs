//! HTTP handlers, one module per resource.

pub mod generation;
pub mod health;
pub mod photos;
pub mod training;
pub mod webhooks;
