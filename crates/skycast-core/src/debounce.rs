//! Call-rate limiting for bursty inputs (typed search queries and the like).
//!
//! Both wrappers schedule work on the ambient tokio runtime. A call made
//! outside a runtime context is dropped with a warning instead of scheduled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Trailing-edge debounce: only the last call of a burst runs, `delay` after
/// that call. Every call restarts the timer.
pub struct Debouncer<A> {
    delay: Duration,
    func: Callback<A>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<F>(delay: Duration, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            delay,
            func: Arc::new(func),
            pending: Mutex::new(None),
        }
    }

    /// Restart the timer with `args`. Returns false when no runtime is
    /// available and nothing was scheduled.
    pub fn call(&self, args: A) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("Debounced call dropped: no tokio runtime");
            return false;
        };

        let func = Arc::clone(&self.func);
        let delay = self.delay;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            func(args);
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
        true
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct ThrottleState {
    last_run: Option<Instant>,
    pending: Option<JoinHandle<()>>,
}

/// Runs at most once per `delay`. A call outside the cooldown runs
/// immediately; a call inside it replaces any deferred call and runs when the
/// cooldown ends.
pub struct Throttle<A> {
    delay: Duration,
    func: Callback<A>,
    state: Arc<Mutex<ThrottleState>>,
}

impl<A: Send + 'static> Throttle<A> {
    pub fn new<F>(delay: Duration, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            delay,
            func: Arc::new(func),
            state: Arc::new(Mutex::new(ThrottleState::default())),
        }
    }

    pub fn call(&self, args: A) {
        let now = Instant::now();
        let mut state = self.state.lock();

        let elapsed = state.last_run.map(|last| now.duration_since(last));
        let remaining = match elapsed {
            Some(elapsed) if elapsed <= self.delay => self.delay - elapsed,
            _ => {
                state.last_run = Some(now);
                drop(state);
                (self.func)(args);
                return;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("Throttled call dropped: no tokio runtime");
            return;
        };

        if let Some(previous) = state.pending.take() {
            previous.abort();
        }

        let func = Arc::clone(&self.func);
        let shared = Arc::clone(&self.state);
        state.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            func(args);
            shared.lock().last_run = Some(Instant::now());
        }));
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.state.lock().pending.take() {
            handle.abort();
        }
    }
}

impl<A> Drop for Throttle<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.state.lock().pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |n| sink.lock().push(n))
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_runs_last_call_once() {
        let (calls, record) = recorder();
        let debounced = Debouncer::new(Duration::from_millis(300), record);

        for n in 1..=5 {
            debounced.call(n);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(calls.lock().is_empty());
        assert!(debounced.is_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*calls.lock(), vec![5]);
        assert!(!debounced.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_separate_bursts_each_fire() {
        let (calls, record) = recorder();
        let debounced = Debouncer::new(Duration::from_millis(100), record);

        debounced.call(1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        debounced.call(2);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(*calls.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_cancel_drops_pending_call() {
        let (calls, record) = recorder();
        let debounced = Debouncer::new(Duration::from_millis(100), record);

        debounced.call(7);
        debounced.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_leading_call_runs_immediately() {
        let (calls, record) = recorder();
        let throttled = Throttle::new(Duration::from_millis(100), record);

        throttled.call(1);
        assert_eq!(*calls.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_defers_latest_call_to_end_of_cooldown() {
        let (calls, record) = recorder();
        let throttled = Throttle::new(Duration::from_millis(100), record);

        throttled.call(1);
        throttled.call(2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttled.call(3);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*calls.lock(), vec![1]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*calls.lock(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_deferred_call_restarts_cooldown() {
        let (calls, record) = recorder();
        let throttled = Throttle::new(Duration::from_millis(100), record);

        throttled.call(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttled.call(2);

        // Deferred call fires at 100ms, so a call at 120ms is still cooling down
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert_eq!(*calls.lock(), vec![1, 2]);
        throttled.call(3);
        assert_eq!(*calls.lock(), vec![1, 2]);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(*calls.lock(), vec![1, 2]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(*calls.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_calls_outside_runtime_are_dropped() {
        let (calls, record) = recorder();
        let debounced = Debouncer::new(Duration::from_millis(100), record);
        assert!(!debounced.call(1));
        assert!(!debounced.is_pending());

        let (calls_throttled, record) = recorder();
        let throttled = Throttle::new(Duration::from_millis(100), record);
        throttled.call(1);
        throttled.call(2);

        assert!(calls.lock().is_empty());
        assert_eq!(*calls_throttled.lock(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_runs_again_after_cooldown() {
        let (calls, record) = recorder();
        let throttled = Throttle::new(Duration::from_millis(100), record);

        throttled.call(1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        throttled.call(2);

        assert_eq!(*calls.lock(), vec![1, 2]);
    }
}
