use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared short-circuit flag for one pipeline run.
///
/// The fail-fast collectors trip it on the first error, and a dropped
/// streaming receiver trips it from the forwarding side. Every feeder and
/// worker selects on [`aborted`](Self::aborted) around its queue operations,
/// so in-flight work stops promptly instead of running the rest of the input
/// to completion.
#[derive(Clone, Default)]
pub struct AbortToken {
    aborted: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl AbortToken {
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once the run is aborted.
    pub async fn aborted(&self) {
        while !self.is_aborted() {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking the flag, or an abort() landing
            // between the check and the await would be missed.
            notified.as_mut().enable();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}
