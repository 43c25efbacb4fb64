use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

enum DebounceState {
    Idle,
    Pending { id: u64, handle: JoinHandle<()> },
}

/// Single-slot timer: scheduling replaces whatever was pending.
pub struct Debouncer {
    period: Duration,
    state: DebounceState,
    next_id: u64,
}

impl Debouncer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: DebounceState::Idle,
            next_id: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arm the timer. `fire` receives the timer id and must call
    /// [`complete`](Self::complete) with it before acting, since an abort
    /// cannot interrupt a task that has already woken.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, fire: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        self.next_id += 1;
        let id = self.next_id;
        let deadline = Instant::now() + self.period;
        let action = fire(id);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action.await;
        });

        self.state = DebounceState::Pending { id, handle };
    }

    /// Drop the pending timer, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { handle, .. } => {
                handle.abort();
                true
            }
            DebounceState::Idle => false,
        }
    }

    /// Called by the firing timer; true only if it is still the pending one
    pub fn complete(&mut self, id: u64) -> bool {
        match &self.state {
            DebounceState::Pending { id: pending, .. } if *pending == id => {
                // Detach rather than abort: the caller is this very task
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting(debouncer: &Arc<Mutex<Debouncer>>, fired: &Arc<AtomicUsize>) {
        let shared = Arc::clone(debouncer);
        let fired = Arc::clone(fired);
        debouncer.lock().unwrap().schedule(move |id| async move {
            if shared.lock().unwrap().complete(id) {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_quiet_period() {
        let debouncer = Arc::new(Mutex::new(Debouncer::new(Duration::from_millis(800))));
        let fired = Arc::new(AtomicUsize::new(0));

        counting(&debouncer, &fired);
        tokio::time::sleep(Duration::from_millis(500)).await;
        counting(&debouncer, &fired);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(debouncer.lock().unwrap().is_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.lock().unwrap().is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let debouncer = Arc::new(Mutex::new(Debouncer::new(Duration::from_millis(800))));
        let fired = Arc::new(AtomicUsize::new(0));

        counting(&debouncer, &fired);
        assert!(debouncer.lock().unwrap().cancel());
        assert!(!debouncer.lock().unwrap().cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!debouncer.lock().unwrap().is_pending());
    }

    #[test]
    fn stale_timer_cannot_complete() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        assert!(!debouncer.complete(1));
    }
}
