//! Domain building blocks shared by every Taskboard crate.
//!
//! Nothing in here talks to the database or the network: errors, id and
//! timestamp aliases, the task status enum, the filter model, and the
//! attachment store seam.

pub mod error;
pub mod filter;
pub mod storage;
pub mod task;
pub mod types;
