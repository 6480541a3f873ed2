use std::future::Future;
use std::time::Duration;

use crate::error::ClockError;

pub mod geofence;
pub mod ledger;
pub mod overtime;

/// Runs one backend call under the store timeout. A slow store surfaces as
/// `StoreUnavailable` instead of hanging the request.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ClockError>
where
    F: Future<Output = Result<T, ClockError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClockError::StoreUnavailable(format!(
            "store call exceeded {} ms",
            limit.as_millis()
        ))),
    }
}
