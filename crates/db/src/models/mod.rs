//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` struct matching the database row (never leaves this crate's API surface as JSON)
//! - Create/update input structs used by the repositories
//! - `Serialize` transfer objects handed to the service and HTTP layers

pub mod media;
pub mod project;
pub mod task;
pub mod user;
