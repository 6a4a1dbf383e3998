//! Search submission with retry
//!
//! Transient backend failures are retried on a fixed interval until a
//! budget runs out; fatal failures stop the run immediately. A batch is
//! either fully accepted by the backend or the pipeline halts before the
//! relational commit, so the database never gets ahead of the index.

use crate::config::RetryConfig;
use crate::error::{ConvertError, Result};
use crate::search::{BackendError, SearchBackend, SearchOp};
use backoff::ExponentialBackoffBuilder;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Submitter {
    backend: Arc<dyn SearchBackend>,
    retry: RetryConfig,
}

impl Submitter {
    pub fn new(backend: Arc<dyn SearchBackend>, retry: RetryConfig) -> Self {
        Self { backend, retry }
    }

    /// Ship one batch, retrying transient failures on a fixed interval
    pub async fn submit(&self, ops: &[SearchOp]) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let interval = Duration::from_secs(self.retry.interval_secs);
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(interval)
            .with_multiplier(1.0)
            .with_randomization_factor(0.0)
            .with_max_interval(interval)
            .with_max_elapsed_time(Some(Duration::from_secs(self.retry.budget_secs)))
            .build();

        let attempts = AtomicU32::new(0);
        let outcome = backoff::future::retry(policy, || async {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            match self.backend.submit(ops).await {
                Ok(()) => Ok(()),
                Err(BackendError::Transient(reason)) => {
                    warn!(attempt, %reason, "Transient search failure, will retry");
                    Err(backoff::Error::transient(BackendError::Transient(reason)))
                }
                Err(fatal) => Err(backoff::Error::permanent(fatal)),
            }
        })
        .await;

        match outcome {
            Ok(()) => {
                info!(ops = ops.len(), "Batch accepted by search backend");
                Ok(())
            }
            Err(BackendError::Transient(reason)) => Err(ConvertError::BackendExhausted {
                attempts: attempts.load(Ordering::Relaxed),
                reason,
            }),
            Err(BackendError::Fatal(reason)) => Err(ConvertError::BackendRejected(reason)),
        }
    }
}
