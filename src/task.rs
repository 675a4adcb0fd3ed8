// Handle to a spawned background loop: request stop, then wait until it has drained.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawns `run` with its own token; the token is also cancelled when `parent` is.
    pub fn spawn<F, Fut>(name: &'static str, parent: &CancellationToken, run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let join = tokio::spawn(run(token.clone()));
        Self { name, token, join }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request_stop(&self) {
        self.token.cancel();
    }

    /// Resolves once the loop has returned, including any final work it does on stop.
    pub async fn wait_drained(self) {
        if let Err(e) = self.join.await {
            tracing::warn!(task = self.name, error = %e, "background task ended abnormally");
        } else {
            tracing::debug!(task = self.name, "background task drained");
        }
    }
}
