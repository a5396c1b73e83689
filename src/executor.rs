//! Bounded-parallelism execution of a batch of independent tasks.
//!
//! Each call builds its own pool-equivalent (a buffered stream) and drops it
//! when the batch completes, so nothing outlives the coordinator call.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `task` over every item with at most `limit` futures in flight.
///
/// Results come back in submission order regardless of completion order.
/// A `limit` of zero is treated as one.
pub async fn run_bounded<I, T, F, Fut, R>(items: I, limit: usize, task: F) -> Vec<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(task)
        .buffered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_submission_order() {
        let out = run_bounded(1..=10u64, 4, |n| async move {
            tokio::time::sleep(Duration::from_millis(20 - n)).await;
            n * 2
        })
        .await;
        assert_eq!(out, (1..=10u64).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        run_bounded(0..40, 5, |_| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn zero_limit_still_runs() {
        let out = run_bounded(vec![1, 2, 3], 0, |n| async move { n }).await;
        assert_eq!(out, vec![1, 2, 3]);
    }
}
