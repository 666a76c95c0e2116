//! Concurrent, deadline-bounded parsing of report batches.
//!
//! [`ParseOrchestrator::parse_all`] runs one adapter call per input on a
//! shared rayon pool and collects the outcomes in input order. The whole
//! batch shares a single deadline; when it passes, the call fails with
//! [`ParseError::Timeout`] and tasks still running are abandoned.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};
use xts_report_core::ParseResult;

use crate::adapter::ReportAdapter;
use crate::error::{ParseError, Result};

/// Default deadline for one batch.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Runs adapters over input batches on a bounded worker pool.
#[derive(Debug, Clone)]
pub struct ParseOrchestrator {
    pool: Arc<ThreadPool>,
    timeout: Duration,
}

impl ParseOrchestrator {
    pub fn new(pool: Arc<ThreadPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Parses every input with `adapter`.
    ///
    /// Results are in input order. The first failing task decides the
    /// error: adapter errors are returned unchanged, a panicking task becomes
    /// [`ParseError::Failed`]. No partial results are returned on failure.
    pub fn parse_all<A: ReportAdapter>(
        &self,
        adapter: Arc<A>,
        inputs: Vec<A::Input>,
    ) -> Result<Vec<ParseResult>> {
        let total = inputs.len();
        let format = adapter.format();
        if total == 0 {
            return Ok(Vec::new());
        }

        debug!(format, total, timeout = ?self.timeout, "parsing reports");
        // `None` when the timeout is too large to represent: wait without a deadline.
        let deadline = Instant::now().checked_add(self.timeout);
        let (tx, rx) = mpsc::channel();

        for (index, input) in inputs.into_iter().enumerate() {
            let tx = tx.clone();
            let adapter = Arc::clone(&adapter);
            self.pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    let source = adapter.source_path(&input);
                    adapter
                        .parse(&input)
                        .map(|report| ParseResult::new(source, report))
                }));
                // The receiver is gone once the batch has failed or timed out.
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<ParseResult>> = (0..total).map(|_| None).collect();
        let mut received = 0;
        while received < total {
            let next = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok((index, Ok(Ok(result)))) => {
                    slots[index] = Some(result);
                    received += 1;
                }
                Ok((index, Ok(Err(err)))) => {
                    warn!(format, index, error = %err, "report parsing failed");
                    return Err(err);
                }
                Ok((index, Err(payload))) => {
                    let message = panic_message(&*payload);
                    warn!(format, index, panic = %message, "report parsing task panicked");
                    return Err(ParseError::Failed { format, message });
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(format, pending = total - received, total, "report parsing timed out");
                    return Err(ParseError::Timeout {
                        format,
                        timeout: self.timeout,
                        pending: total - received,
                        total,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ParseError::Failed {
                        format,
                        message: format!(
                            "{} parse task(s) exited without a result",
                            total - received
                        ),
                    });
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "parse task panicked".to_string()
    }
}

/// Builds the shared parse pool with `jobs` threads.
pub fn build_thread_pool(jobs: usize) -> Result<Arc<ThreadPool>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|index| format!("xts-report-parse-{index}"))
        .build()?;
    Ok(Arc::new(pool))
}

/// Adaptive default worker count for `input_count` inputs.
pub fn default_parallel_jobs(input_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    let adaptive_cap = if input_count >= 500 { 8 } else { 12 };
    cpu_count.min(adaptive_cap).max(1).min(input_count.max(1))
}
