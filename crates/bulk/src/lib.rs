use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum BulkError {
    #[error("Semaphore acquire error: {0}")]
    SemaphoreError(#[from] tokio::sync::AcquireError),
}

/// Per-item outcome of a batch, indexed by input position.
#[derive(Debug)]
pub struct BulkResult<T> {
    pub successful: Vec<(usize, T)>,
    pub failed: Vec<(usize, anyhow::Error)>,
}

impl<T> Default for BulkResult<T> {
    fn default() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BulkResult<T> {
    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Runs one job per item, keeping going past failures.
///
/// Results come back in input order. Every failed item is logged exactly once.
pub struct BulkExecutor {
    concurrency: usize,
    show_progress: bool,
}

impl BulkExecutor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn execute_with_results<T, R, Fut, F>(&self, items: Vec<T>, job: F) -> BulkResult<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if items.is_empty() {
            debug!("No items to process");
            return BulkResult::default();
        }

        let total = items.len();
        info!(
            total,
            concurrency = self.concurrency,
            "Starting bulk execution"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let progress = self.create_progress_bar(total);
        let job = &job;

        let results: Vec<(usize, Result<R>)> =
            stream::iter(items.into_iter().enumerate().map(|(idx, item)| {
                let semaphore = Arc::clone(&semaphore);
                let progress = progress.clone();
                async move {
                    let result = match semaphore.acquire().await {
                        Ok(_permit) => {
                            debug!(index = idx, "Processing item");
                            job(item).await
                        }
                        Err(e) => Err(BulkError::from(e).into()),
                    };
                    progress.inc(1);
                    (idx, result)
                }
            }))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = BulkResult::default();
        for (idx, result) in results {
            match result {
                Ok(value) => outcome.successful.push((idx, value)),
                Err(error) => {
                    warn!(index = idx, error = %format!("{error:#}"), "Item failed");
                    outcome.failed.push((idx, error));
                }
            }
        }

        if outcome.failed.is_empty() {
            progress.finish_with_message("All items completed successfully");
        } else {
            progress.finish_with_message(format!(
                "Completed: {} succeeded, {} failed",
                outcome.success_count(),
                outcome.failure_count()
            ));
        }

        info!(
            success = outcome.success_count(),
            failures = outcome.failure_count(),
            "Bulk execution completed"
        );

        outcome
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        let progress = if self.show_progress {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            progress.set_style(
                style
                    .progress_chars("#>-")
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
            );
        }

        progress
    }
}
