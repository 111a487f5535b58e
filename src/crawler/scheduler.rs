//! Batch scheduler for detail-page work
//!
//! This module handles:
//! - Splitting the discovered links into fixed-size chunks
//! - Running one task per link, all of a chunk at once
//! - Waiting for the whole chunk before starting the next
//! - Pacing between chunks

use crate::config::CrawlerConfig;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;

/// Counters from one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub chunks: usize,
    pub succeeded: usize,
    /// Tasks that returned `None` or panicked
    pub dropped: usize,
}

/// Runs tasks in chunks with a hard barrier between chunks
///
/// The concurrency bound is the chunk size. Tasks are never retried
/// here; a failed task simply contributes nothing.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BatchScheduler {
    pub fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_delay())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Runs `task` once per item
    ///
    /// Results keep chunk order; within a chunk they arrive in completion
    /// order. The pacing delay is skipped after the final chunk.
    pub async fn run<I, T, F, Fut>(&self, items: &[I], task: F) -> (Vec<T>, BatchReport)
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Option<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut results = Vec::with_capacity(items.len());
        let mut report = BatchReport::default();
        let total_chunks = items.len().div_ceil(self.chunk_size);

        for (index, chunk) in items.chunks(self.chunk_size).enumerate() {
            tracing::debug!(
                "Starting chunk {}/{} ({} tasks)",
                index + 1,
                total_chunks,
                chunk.len()
            );

            let mut set = JoinSet::new();
            for item in chunk {
                set.spawn(task(item.clone()));
            }

            let before = results.len();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Some(value)) => {
                        results.push(value);
                        report.succeeded += 1;
                    }
                    Ok(None) => report.dropped += 1,
                    Err(e) => {
                        tracing::error!("Task in chunk {} panicked: {}", index + 1, e);
                        report.dropped += 1;
                    }
                }
            }
            report.chunks += 1;

            tracing::info!(
                "Chunk {}/{} done: {} of {} succeeded",
                index + 1,
                total_chunks,
                results.len() - before,
                chunk.len()
            );

            if index + 1 < total_chunks {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        (results, report)
    }
}
