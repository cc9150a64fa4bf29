use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Production tick interval: one decrement per second.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Recovery countdown: fires `on_tick(remaining)` once per interval,
/// decrementing from the initial seconds, then fires `on_expire`
/// exactly once when the count reaches zero.
pub struct Countdown;

impl Countdown {
    pub fn start<T, E>(
        initial_seconds: u64,
        on_tick: T,
        on_expire: E,
    ) -> Result<CountdownHandle, String>
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        Self::start_with_interval(DEFAULT_TICK_INTERVAL, initial_seconds, on_tick, on_expire)
    }

    /// Starts the countdown with an explicit tick interval. Tests use
    /// a short interval; the recovery semantics are interval-agnostic.
    pub fn start_with_interval<T, E>(
        tick_interval: Duration,
        initial_seconds: u64,
        mut on_tick: T,
        on_expire: E,
    ) -> Result<CountdownHandle, String>
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancelled);

        let join_handle = thread::Builder::new()
            .name("chat-session-countdown".to_string())
            .spawn(move || {
                let mut remaining = initial_seconds;
                loop {
                    thread::sleep(tick_interval);
                    if cancel_flag.load(Ordering::SeqCst) {
                        return;
                    }

                    remaining = remaining.saturating_sub(1);
                    on_tick(remaining);

                    if remaining == 0 {
                        if !cancel_flag.load(Ordering::SeqCst) {
                            on_expire();
                        }
                        return;
                    }
                }
            })
            .map_err(|error| format!("Failed to spawn countdown thread: {error}"))?;

        Ok(CountdownHandle {
            cancelled,
            join_handle: Some(join_handle),
        })
    }
}

/// Handle to a running countdown. Cancelling is idempotent and safe
/// after expiry; dropping the handle cancels, so the timer never
/// outlives its owner.
pub struct CountdownHandle {
    cancelled: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Waits for the countdown thread to finish. Test-oriented; the
    /// runtime never blocks on the timer.
    pub fn join(mut self) {
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
