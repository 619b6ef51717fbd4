use std::future::Future;

use tracing::warn;

/// Spawn a background unit of work whose outcome must never affect the
/// critical path. Failures are logged and dropped.
pub fn spawn_best_effort<F>(task: &'static str, fut: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!(task, "Best-effort task failed: {:#}", e);
        }
    });
}
