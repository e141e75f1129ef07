use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::DomainError;

/// Runs `fut` under a time limit, aborting early when `cancel` fires.
pub(crate) async fn bounded<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    operation: &str,
    fut: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::cancelled(operation)),
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(DomainError::timeout(operation, limit)),
        },
    }
}
