//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where the API creates rows, a `Deserialize` create DTO.

pub mod job;
pub mod preference;
pub mod purchase;
pub mod result;
pub mod status;
