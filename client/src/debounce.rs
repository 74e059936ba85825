//! Trailing-edge debounce for bursty inputs, used to hold off user-search
//! requests while keystrokes are still arriving.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs only the most recent call after a quiet period. Each new call
/// cancels the previous pending one, so a burst collapses into a single
/// execution of the last future.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Schedule `work` to run after the quiet period, cancelling anything
    /// still waiting from an earlier call.
    pub fn call<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        }));
    }

    /// Drop whatever is pending without running it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
