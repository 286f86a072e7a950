//! Running native operations from async code
//!
//! Native calls block and cannot be cancelled. `run_blocking` moves one onto
//! tokio's blocking pool and stops waiting after `limit`; the call itself runs
//! to completion in the background.

use crate::error::{ErrorKind, MarshalError, NativeError};
use crate::status::{codes, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Run `f` on the blocking pool, giving up after `limit`
///
/// Timing out yields an `Aborted` error with status `ERROR_TIMEOUT`.
pub async fn run_blocking<T, F>(operation: &str, limit: Duration, f: F) -> Result<T, MarshalError>
where
    F: FnOnce() -> Result<T, MarshalError> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(NativeError::new(
            ErrorKind::Aborted,
            StatusCode::win32(codes::ERROR_OPERATION_ABORTED),
            format!("blocking task did not complete: {}", join_error),
            operation,
        )
        .into()),
        Err(_) => {
            warn!(operation, ?limit, "native operation timed out");
            Err(NativeError::new(
                ErrorKind::Aborted,
                StatusCode::win32(codes::ERROR_TIMEOUT),
                format!("no result within {:?}", limit),
                operation,
            )
            .into())
        }
    }
}
