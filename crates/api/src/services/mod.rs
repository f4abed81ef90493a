//! Application services sitting between handlers and repositories.

pub mod task;

pub use task::TaskService;
