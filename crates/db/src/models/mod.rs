//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct
//! matching the database row, plus the request DTOs that create or
//! mutate it. Status columns hold SMALLINT IDs referencing the seeded
//! lookup tables; the matching enums live in `atelier_core::status`.

pub mod generation_job;
pub mod generation_unit;
pub mod training_job;
pub mod training_photo;
pub mod user;
pub mod webhook_event;
