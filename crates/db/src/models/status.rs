//! Status enums live in `sonogen-core`; re-exported here so repository code
//! reads `crate::models::status::*` like every other model.

pub use sonogen_core::status::{JobStage, JobStatus, PurchaseStatus, PurchaseTier, StatusId};
