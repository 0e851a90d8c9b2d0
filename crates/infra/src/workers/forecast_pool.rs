//! Bounded pool running CPU-bound AI jobs off the async executor.
//!
//! - one `spawn_blocking` task per job, at most `workers` running at once
//! - jobs own their inputs; nothing mutable is shared between them
//! - dropping the `run` future aborts every job still waiting for a permit

use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use restock_ai::{AiJob, ForecastError};
use restock_core::{InsufficientData, ProductKey};

use crate::config::FailurePolicy;

/// Outcome of a completed pool run.
#[derive(Debug)]
pub struct PoolReport<O> {
    /// Successful outputs, in completion order.
    pub completed: Vec<O>,
    /// Jobs whose series turned out too short.
    pub skipped: Vec<InsufficientData>,
    /// Failures recorded under [`FailurePolicy::BestEffort`].
    pub failed: Vec<ForecastError>,
}

impl<O> Default for PoolReport<O> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    /// First failure under [`FailurePolicy::Strict`]; outstanding jobs were aborted.
    #[error(transparent)]
    Aborted(ForecastError),

    /// A pool task was cancelled or could not be scheduled.
    #[error("forecast worker failed: {0}")]
    Worker(String),
}

impl PoolError {
    /// Product the error is attributed to, when there is one.
    pub fn product_key(&self) -> Option<&ProductKey> {
        match self {
            PoolError::Aborted(ForecastError::ForecastFailure { product_key, .. }) => {
                Some(product_key)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ForecastPool {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.get())),
            workers: workers.get(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job, honouring `policy` on failure.
    pub async fn run<J>(
        &self,
        jobs: Vec<J>,
        policy: FailurePolicy,
    ) -> Result<PoolReport<J::Output>, PoolError>
    where
        J: AiJob,
    {
        let mut set = JoinSet::new();
        for job in jobs {
            let permits = self.permits.clone();
            set.spawn(async move {
                let key = job.product_key().clone();
                let outcome = match permits.acquire_owned().await {
                    Ok(permit) => {
                        let task_key = key.clone();
                        let joined = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            job.run()
                        })
                        .await;
                        match joined {
                            Ok(result) => result,
                            Err(e) if e.is_panic() => Err(ForecastError::failure(
                                &task_key,
                                format!("forecast task panicked: {}", panic_message(e)),
                            )),
                            Err(e) => Err(ForecastError::failure(&task_key, e.to_string())),
                        }
                    }
                    Err(_) => Err(ForecastError::failure(&key, "worker pool closed")),
                };
                (key, outcome)
            });
        }

        let mut report = PoolReport::default();
        while let Some(joined) = set.join_next().await {
            let (key, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    set.abort_all();
                    return Err(PoolError::Worker(e.to_string()));
                }
            };

            match outcome {
                Ok(output) => {
                    debug!(product = %key, "forecast job finished");
                    report.completed.push(output);
                }
                Err(ForecastError::InsufficientData(skip)) => report.skipped.push(skip),
                Err(err) => match policy {
                    FailurePolicy::Strict => {
                        warn!(product = %key, error = %err, "aborting remaining forecast jobs");
                        set.abort_all();
                        return Err(PoolError::Aborted(err));
                    }
                    FailurePolicy::BestEffort => {
                        warn!(product = %key, error = %err, "forecast job failed; continuing");
                        report.failed.push(err);
                    }
                },
            }
        }

        Ok(report)
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
