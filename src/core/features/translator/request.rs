use tokio::sync::watch;

/// Issues request generations; only the latest one may touch shared state.
pub struct RequestTracker {
    latest: watch::Sender<u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(0);
        Self { latest }
    }

    /// Start a new request, superseding every earlier one
    pub fn begin(&self) -> RequestToken {
        let mut id = 0;
        self.latest.send_modify(|generation| {
            *generation += 1;
            id = *generation;
        });
        RequestToken { id, latest: self.latest.subscribe() }
    }

    /// Supersede the current request without starting another
    pub fn invalidate(&self) {
        self.latest.send_modify(|generation| *generation += 1);
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle held by one in-flight request
#[derive(Clone)]
pub struct RequestToken {
    id: u64,
    latest: watch::Receiver<u64>,
}

impl RequestToken {
    /// A token nobody can supersede
    #[cfg(test)]
    pub fn detached() -> Self {
        let (_, latest) = watch::channel(0);
        Self { id: 0, latest }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        *self.latest.borrow() == self.id
    }

    /// Resolves once a newer generation exists. Never resolves for a
    /// detached token or after the tracker is gone.
    pub async fn cancelled(&self) {
        let mut latest = self.latest.clone();
        loop {
            if *latest.borrow_and_update() != self.id {
                return;
            }
            if latest.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn newer_request_supersedes_older() {
        let tracker = RequestTracker::new();
        let first = tracker.begin();
        assert!(first.is_current());

        let second = tracker.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());

        tracker.invalidate();
        assert!(!second.is_current());
    }

    #[tokio::test]
    async fn cancelled_resolves_on_supersede() {
        let tracker = RequestTracker::new();
        let token = tracker.begin();

        let waiter = tokio::spawn({
            let token = token.clone();
            async move { token.cancelled().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tracker.begin();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation observed")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn detached_token_is_never_cancelled() {
        let token = RequestToken::detached();
        assert!(token.is_current());
        let result = tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await;
        assert!(result.is_err());
    }
}
