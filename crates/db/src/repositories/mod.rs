//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. State-machine transitions are
//! conditional updates guarded on the current status; callers learn from
//! the returned `bool` whether their transition actually applied.

pub mod generation_job_repo;
pub mod generation_unit_repo;
pub mod training_job_repo;
pub mod training_photo_repo;
pub mod user_repo;
pub mod webhook_event_repo;

pub use generation_job_repo::GenerationJobRepo;
pub use generation_unit_repo::GenerationUnitRepo;
pub use training_job_repo::TrainingJobRepo;
pub use training_photo_repo::TrainingPhotoRepo;
pub use user_repo::UserRepo;
pub use webhook_event_repo::WebhookEventRepo;
