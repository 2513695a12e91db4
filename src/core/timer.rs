//! Cancellable one-shot finalize timer

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A single armed finalize timer.
///
/// The timer runs as a tokio task and calls `on_fire` with its generation
/// when the delay elapses, unless cancelled first. Consumers must still
/// compare the generation on receipt: a cancel can race with a fire that was
/// already delivered.
#[derive(Debug)]
pub struct FinalizeTimer {
    generation: u64,
    delay: Duration,
    deadline: Instant,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl FinalizeTimer {
    pub fn arm<F>(generation: u64, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let token = CancellationToken::new();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if !task_token.is_cancelled() {
                        on_fire(generation);
                    }
                }
            }
        });

        Self {
            generation,
            delay,
            deadline,
            token,
            handle,
        }
    }

    /// Cancel the timer. Cancelling a fired or cancelled timer is a no-op.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the timer task has exited, by firing or by cancellation
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Time left before the timer fires; zero once the deadline has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl Drop for FinalizeTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_with_generation() {
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicU64::new(0));
        let (f, s) = (fired.clone(), seen.clone());

        let timer = FinalizeTimer::arm(7, Duration::from_millis(50), move |generation| {
            f.fetch_add(1, Ordering::SeqCst);
            s.store(generation, Ordering::SeqCst);
        });
        assert_eq!(timer.generation(), 7);
        assert_eq!(timer.delay(), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert!(timer.is_finished());
        assert_eq!(timer.remaining(), Duration::ZERO);

        // Cancelling after the fact is harmless
        timer.cancel();
        assert!(timer.is_cancelled());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();

        let timer = FinalizeTimer::arm(1, Duration::from_millis(50), move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_timer_cancels_it() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();

        drop(FinalizeTimer::arm(1, Duration::from_millis(50), move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
