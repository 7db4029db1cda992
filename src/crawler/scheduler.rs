//! Worker pool scheduler
//!
//! This module handles:
//! - The shared work queue, drained through one atomic claim cursor
//! - A fixed number of tokio worker tasks
//! - The randomized politeness delay after each item
//!
//! The cursor is the only coordination point between workers. Each index is
//! handed out exactly once, so every input URL is processed by exactly one
//! worker and yields exactly one output.

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_DELAY_MS_MAX, DEFAULT_DELAY_MS_MIN};
use crate::HarvestError;
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One input URL with its position in the input list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position in the input list
    pub index: usize,

    /// The URL exactly as supplied
    pub original_url: String,
}

/// Fixed list of work items behind an atomic claim cursor
#[derive(Debug)]
pub struct WorkQueue {
    items: Vec<WorkItem>,
    cursor: AtomicUsize,
}

impl WorkQueue {
    /// Builds a queue preserving input order
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| WorkItem {
                index,
                original_url: url.into(),
            })
            .collect();

        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claims the next unprocessed item, `None` once the queue is drained
    pub fn claim(&self) -> Option<&WorkItem> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.items.get(index)
    }

    /// Returns true if every item has been claimed
    pub fn is_drained(&self) -> bool {
        self.cursor.load(Ordering::SeqCst) >= self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Randomized pause a worker takes after each item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessDelay {
    min_ms: u64,
    max_ms: u64,
}

impl PolitenessDelay {
    /// Creates a delay drawn uniformly from `[min_ms, max_ms]`
    ///
    /// Bounds given in the wrong order are swapped.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    /// No pause between items
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn bounds(&self) -> (u64, u64) {
        (self.min_ms, self.max_ms)
    }

    /// Draws one delay
    pub fn sample(&self) -> Duration {
        if self.min_ms == self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

impl Default for PolitenessDelay {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY_MS_MIN, DEFAULT_DELAY_MS_MAX)
    }
}

/// Runs a handler over a work queue with a fixed number of workers
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
    delay: PolitenessDelay,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Number of workers, at least 1
    /// * `delay` - Pause each worker takes after finishing an item
    pub fn new(concurrency: usize, delay: PolitenessDelay) -> Self {
        Self {
            concurrency: concurrency.max(1),
            delay,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drains the queue and returns one output per item, in input order
    ///
    /// Spawns `min(concurrency, queue length)` workers. A worker that
    /// panics does not stop the others; once all workers have finished the
    /// first failure is returned as [`HarvestError::Worker`].
    ///
    /// # Arguments
    ///
    /// * `queue` - The work to do
    /// * `handler` - Processes one item; must not fail
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<T>)` - Outputs ordered by item index
    /// * `Err(HarvestError::Worker)` - A worker task died
    pub async fn run<T, F, Fut>(&self, queue: Arc<WorkQueue>, handler: F) -> Result<Vec<T>, HarvestError>
    where
        F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let worker_count = self.concurrency.min(queue.len());
        let handler = Arc::new(handler);

        tracing::info!(
            "Starting {} workers for {} URLs",
            worker_count,
            queue.len()
        );

        let handles: Vec<_> = (0..worker_count)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let handler = Arc::clone(&handler);
                let delay = self.delay;

                tokio::spawn(async move {
                    let mut outputs = Vec::new();

                    while let Some(item) = queue.claim() {
                        let index = item.index;
                        tracing::debug!("Worker {} claimed item {}", worker, index);

                        outputs.push((index, (*handler)(item.clone()).await));

                        if !queue.is_drained() {
                            tokio::time::sleep(delay.sample()).await;
                        }
                    }

                    outputs
                })
            })
            .collect();

        let mut outputs = Vec::with_capacity(queue.len());
        let mut failure = None;

        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(worker_outputs) => outputs.extend(worker_outputs),
                Err(e) => {
                    tracing::error!("Worker {} stopped unexpectedly: {}", worker, e);
                    failure.get_or_insert(HarvestError::Worker {
                        worker,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        outputs.sort_by_key(|(index, _)| *index);
        Ok(outputs.into_iter().map(|(_, output)| output).collect())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, PolitenessDelay::default())
    }
}
