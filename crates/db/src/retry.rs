//! Bounded retry around transactional work.
//!
//! Postgres aborts one side of a deadlock (`40P01`) or a conflicting
//! serializable/repeatable-read transaction (`40001`). Both are safe to
//! re-run from scratch, so read transactions go through [`with_retry`] with
//! [`is_transient_conflict`] as the predicate.

use std::future::Future;

/// Attempts made by deadlock-sensitive transactions, the first try included.
pub const MAX_DEADLOCK_RETRIES: u32 = 5;

/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";

/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// `true` if `err` is a serialization failure or a detected deadlock.
pub fn is_transient_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED)
}

/// Run `op` up to `max_attempts` times while it fails with an error accepted
/// by `is_retryable`.
///
/// Any other error is returned immediately. When every attempt fails, the
/// last error is returned.
pub async fn with_retry<T, E, F, Fut, P>(
    max_attempts: u32,
    is_retryable: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                tracing::warn!(attempt, max_attempts, error = %err, "Transient conflict, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
