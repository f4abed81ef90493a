//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or a connection inside a caller-owned transaction) as the first
//! argument.

pub mod media_repo;
pub mod project_repo;
pub mod task_repo;
pub mod user_repo;

pub use media_repo::MediaRepo;
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
