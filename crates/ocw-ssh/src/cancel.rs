//! Cancellation at await boundaries
//!
//! Dropping a future is the only native cancellation in async Rust, which
//! leaves callers with nothing to report. Racing each suspension point
//! against a [`CancellationToken`] turns cancellation into an ordinary
//! [`WorkspaceError`] naming the operation that was interrupted.

use std::future::Future;

use ocw_core::WorkspaceError;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `token` is cancelled first.
///
/// On cancellation the future is dropped and
/// `CommandFailed("<operation> was cancelled")` is returned.
pub async fn cancellable<F, T>(
    token: &CancellationToken,
    operation: &str,
    fut: F,
) -> Result<T, WorkspaceError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::debug!("{} cancelled", operation);
            Err(WorkspaceError::cancelled(operation))
        }
        out = fut => Ok(out),
    }
}
