//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod preference_repo;
pub mod purchase_repo;
pub mod result_repo;
pub mod stage_repo;

pub use job_repo::JobRepo;
pub use preference_repo::PreferenceRepo;
pub use purchase_repo::PurchaseRepo;
pub use result_repo::ResultRepo;
pub use stage_repo::StageRepo;
