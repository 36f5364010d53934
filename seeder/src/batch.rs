/// Batch processor
/// Runs an async handler over a sequence of items in fixed-size chunks with
/// bounded concurrency inside each chunk. Chunks run one after another.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("Concurrency must be greater than zero")]
    ZeroConcurrency,
}

/// Outcome counts of one `process` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub chunks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.panicked
    }
}

/// Chunked, bounded-concurrency executor. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct BatchProcessor {
    batch_size: usize,
    concurrency: usize,
}

impl BatchProcessor {
    /// Create a processor; zero sizes are rejected rather than defaulted
    pub fn new(batch_size: usize, concurrency: usize) -> Result<Self, BatchError> {
        if batch_size == 0 {
            return Err(BatchError::ZeroBatchSize);
        }
        if concurrency == 0 {
            return Err(BatchError::ZeroConcurrency);
        }
        Ok(BatchProcessor {
            batch_size,
            concurrency,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `handler` once per item.
    ///
    /// Items are split into consecutive chunks of `batch_size`. At most
    /// `concurrency` handler futures of a chunk are polled at once, and the next
    /// chunk starts only after every handler of the current one has settled.
    /// A handler returning `Err` or panicking only affects its own item.
    pub async fn process<T, E, F, Fut>(&self, items: Vec<T>, handler: F) -> BatchSummary
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let handler = &handler;
        let mut summary = BatchSummary::default();
        let total_chunks = items.len().div_ceil(self.batch_size);
        let mut remaining = items.into_iter().peekable();

        while remaining.peek().is_some() {
            let chunk: Vec<T> = remaining.by_ref().take(self.batch_size).collect();
            summary.chunks += 1;
            debug!(
                chunk = summary.chunks,
                total_chunks = total_chunks,
                items = chunk.len(),
                "Processing chunk"
            );

            let results: Vec<_> = stream::iter(chunk)
                .map(|item| AssertUnwindSafe(async move { handler(item).await }).catch_unwind())
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for result in results {
                match result {
                    Ok(Ok(())) => summary.succeeded += 1,
                    Ok(Err(e)) => {
                        debug!(error = %e, "Batch item failed");
                        summary.failed += 1;
                    }
                    Err(_) => {
                        error!(chunk = summary.chunks, "Batch item handler panicked");
                        summary.panicked += 1;
                    }
                }
            }
        }

        debug!(
            chunks = summary.chunks,
            succeeded = summary.succeeded,
            failed = summary.failed,
            panicked = summary.panicked,
            "Batch complete"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_zero_sizes_rejected() {
        assert_eq!(BatchProcessor::new(0, 2).unwrap_err(), BatchError::ZeroBatchSize);
        assert_eq!(BatchProcessor::new(2, 0).unwrap_err(), BatchError::ZeroConcurrency);
        assert!(BatchProcessor::new(1, 1).is_ok());
    }

    #[tokio::test]
    async fn test_empty_input_has_no_chunks() {
        let processor = BatchProcessor::new(10, 4).unwrap();
        let calls = AtomicUsize::new(0);
        let summary = processor
            .process(Vec::<u32>::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), String>(()) }
            })
            .await;
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_concurrency() {
        let processor = BatchProcessor::new(7, 3).unwrap();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let (in_flight, peak) = (&in_flight, &peak);

        let summary = processor
            .process((0..25u64).collect(), move |i| {
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1 + i % 4)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            })
            .await;

        assert_eq!(summary.succeeded, 25);
        assert_eq!(summary.chunks, 4);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_next_chunk_waits_for_slowest_item() {
        let processor = BatchProcessor::new(2, 2).unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));

        let delays = [("A", 30u64), ("B", 5), ("C", 1), ("D", 1)];
        processor
            .process(delays.to_vec(), |(name, delay)| {
                let events = events.clone();
                async move {
                    events.lock().unwrap().push(format!("start {}", name));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    events.lock().unwrap().push(format!("end {}", name));
                    Ok::<(), String>(())
                }
            })
            .await;

        let events = events.lock().unwrap().clone();
        let position = |label: &str| events.iter().position(|e| e == label).unwrap();
        let slowest_end = position("end A").max(position("end B"));
        assert!(position("start C") > slowest_end);
        assert!(position("start D") > slowest_end);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_siblings() {
        let processor = BatchProcessor::new(2, 2).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let summary = processor
            .process(vec![1, 2, 3, 4, 5], |i| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(i);
                    if i == 2 {
                        return Err(format!("item {} is broken", i));
                    }
                    Ok(())
                }
            })
            .await;

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 5);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let processor = BatchProcessor::new(3, 3).unwrap();
        let completed = AtomicUsize::new(0);
        let completed_ref = &completed;

        let summary = processor
            .process(vec![1, 2, 3, 4, 5, 6], move |i| {
                async move {
                    if i == 2 {
                        panic!("handler blew up");
                    }
                    completed_ref.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            })
            .await;

        assert_eq!(completed.load(Ordering::SeqCst), 5);
        assert_eq!(summary.panicked, 1);
        assert_eq!(summary.succeeded, 5);
        assert_eq!(summary.chunks, 2);
    }

    #[tokio::test]
    async fn test_handler_panicking_before_its_future_is_isolated() {
        let processor = BatchProcessor::new(4, 2).unwrap();
        let completed = AtomicUsize::new(0);
        let completed_ref = &completed;

        let summary = processor
            .process(vec![1, 2, 3, 4, 5], move |i| {
                if i == 4 {
                    panic!("handler failed to start");
                }
                async move {
                    completed_ref.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            })
            .await;

        assert_eq!(completed.load(Ordering::SeqCst), 4);
        assert_eq!(summary.panicked, 1);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.total(), 5);
    }
}
