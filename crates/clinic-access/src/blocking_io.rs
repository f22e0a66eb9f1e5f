use crate::error::StoreResult;

/// Runs synchronous file work for a store on tokio's blocking pool.
pub(crate) async fn run_blocking<T, F>(operation: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation).await?
}
