use std::future::Future;

use crate::error::{CoreError, Result};
use crate::services::StoreError;

/// Run a read-modify-write cycle on its own task and wait for its result
///
/// Dropping the returned future only drops the result: a write that has
/// started keeps running until the store confirms or rejects it.
pub(crate) async fn complete_write<T, F>(write: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(write).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Write task did not complete: {}", e);
            Err(CoreError::Persistence(StoreError::Interrupted(e.to_string())))
        }
    }
}
