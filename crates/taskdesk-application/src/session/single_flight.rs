//! At most one in-flight run per operation key; late callers join it.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use taskdesk_core::{Result, TaskdeskError};

struct Slot<K, T> {
    key: K,
    id: u64,
    future: Shared<BoxFuture<'static, Result<T>>>,
}

/// Deduplicates concurrent runs of the same operation.
///
/// Each run is spawned onto the runtime, so it completes even when every
/// caller stops awaiting it. Only the most recent run is joinable. A run for
/// a different key replaces the slot; the replaced run still completes for
/// the callers already awaiting it.
pub(crate) struct SingleFlight<K, T> {
    slot: Mutex<Option<Slot<K, T>>>,
    next_id: AtomicU64,
}

impl<K, T> SingleFlight<K, T>
where
    K: Copy + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(0),
        })
    }

    /// Runs the future built by `make`, or joins the run already in flight
    /// for `key`. `make` is only called when a new run starts.
    pub(crate) async fn run<F, Fut>(self: &Arc<Self>, key: K, make: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let future = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(current) if current.key == key => current.future.clone(),
                _ => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let owner: Weak<Self> = Arc::downgrade(self);
                    let operation = make();
                    let handle = tokio::spawn(async move {
                        let output = operation.await;
                        if let Some(owner) = owner.upgrade() {
                            owner.finish(id);
                        }
                        output
                    });
                    let future = handle
                        .map(|joined| {
                            joined.unwrap_or_else(|e| {
                                Err(TaskdeskError::internal(format!("session task aborted: {e}")))
                            })
                        })
                        .boxed()
                        .shared();
                    *slot = Some(Slot {
                        key,
                        id,
                        future: future.clone(),
                    });
                    future
                }
            }
        };
        future.await
    }

    fn finish(&self, id: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.id == id) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let flights = SingleFlight::<u8, usize>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let call = || {
            let runs = runs.clone();
            flights.run(1, move || async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(runs.fetch_add(1, Ordering::SeqCst) + 1)
            })
        };

        let (a, b, c) = tokio::join!(call(), call(), call());
        assert_eq!((a.unwrap(), b.unwrap(), c.unwrap()), (1, 1, 1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_callers_start_new_runs() {
        let flights = SingleFlight::<u8, usize>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let counter = runs.clone();
            let value = flights
                .run(1, move || async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) })
                .await
                .unwrap();
            assert_eq!(value, expected);
        }
    }

    #[tokio::test]
    async fn test_different_keys_do_not_join() {
        let flights = SingleFlight::<u8, &'static str>::new();

        let (a, b) = tokio::join!(
            flights.run(1, || async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok("one")
            }),
            flights.run(2, || async { Ok("two") }),
        );
        assert_eq!((a.unwrap(), b.unwrap()), ("one", "two"));
    }

    #[tokio::test]
    async fn test_run_finishes_after_caller_is_dropped() {
        let flights = SingleFlight::<u8, usize>::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            flights.run(1, move || async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
            }),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The finished run left the slot, so the next call starts afresh.
        let counter = runs.clone();
        let value = flights
            .run(1, move || async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }
}
