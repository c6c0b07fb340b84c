//! Bounded worker pool for bulk verification
//!
//! FIFO dispatcher over an unbounded submit queue, with a semaphore
//! bounding the number of in-flight verifications. Each task is isolated:
//! its own reply channel, its own transient state, no shared mutable
//! surfaces beyond the rate limiter, the metrics sink and the read-only
//! tables. Panics are caught at the pool boundary and translated into the
//! system-error record rather than re-thrown to the submitter.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tracing::{debug, error};

use crate::status::{self, ResultRecord};
use crate::EmailVerifier;

pub type TaskFuture = Pin<Box<dyn Future<Output = ResultRecord> + Send>>;

/// The worker body. Abstracting it keeps the pool exercisable without
/// network access.
pub trait Verify: Send + Sync + 'static {
    fn verify(self: Arc<Self>, email: String) -> TaskFuture;

    /// Record emitted when a worker dies before producing a result.
    fn failure_record(&self, email: &str) -> ResultRecord;
}

impl Verify for EmailVerifier {
    fn verify(self: Arc<Self>, email: String) -> TaskFuture {
        Box::pin(async move { self.verify_to_record(&email).await })
    }

    fn failure_record(&self, email: &str) -> ResultRecord {
        status::system_error_record(email, self.tables())
    }
}

struct Job {
    email: String,
    reply: oneshot::Sender<ResultRecord>,
}

pub struct WorkerPool {
    runner: Arc<dyn Verify>,
    jobs: mpsc::UnboundedSender<Job>,
    cancel: watch::Sender<bool>,
    max_workers: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(runner: Arc<dyn Verify>, max_workers: usize) -> Self {
        assert!(max_workers > 0, "worker pool needs at least one worker");

        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel::<Job>();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak_in_flight = Arc::new(AtomicUsize::new(0));

        tokio::spawn(dispatch_loop(
            runner.clone(),
            jobs_rx,
            cancel_rx,
            max_workers,
            in_flight.clone(),
            peak_in_flight.clone(),
        ));

        Self {
            runner,
            jobs: jobs_tx,
            cancel: cancel_tx,
            max_workers,
            in_flight,
            peak_in_flight,
        }
    }

    /// Default worker count: `cpus - 1`, clamped to `[2, 4]`.
    pub fn default_max_workers() -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        cpus.saturating_sub(1).clamp(2, 4)
    }

    /// Queue one verification. The returned channel yields the result, or
    /// errors when the pool is terminated before the task starts.
    pub fn submit(&self, email: impl Into<String>) -> oneshot::Receiver<ResultRecord> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            email: email.into(),
            reply: reply_tx,
        };
        if self.jobs.send(job).is_err() {
            debug!("submission after terminate rejected");
        }
        reply_rx
    }

    /// Verify a batch. Results align to input order and carry the original
    /// address in the `email` field.
    pub async fn verify_batch(&self, emails: &[String]) -> Vec<ResultRecord> {
        let receivers: Vec<_> = emails.iter().map(|email| self.submit(email.clone())).collect();

        let mut results = Vec::with_capacity(emails.len());
        for (email, receiver) in emails.iter().zip(receivers) {
            let mut record = match receiver.await {
                Ok(record) => record,
                Err(_) => self.runner.failure_record(email),
            };
            record.email = Some(email.clone());
            results.push(record);
        }
        results
    }

    /// Stop the pool: queued jobs are cancelled (their futures reject),
    /// started jobs run to their natural completion or deadline.
    pub fn terminate(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest concurrent in-flight count observed over the pool lifetime.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

async fn dispatch_loop(
    runner: Arc<dyn Verify>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    mut cancel: watch::Receiver<bool>,
    max_workers: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
) {
    let semaphore = Arc::new(Semaphore::new(max_workers));

    loop {
        let job = tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
                continue;
            }
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        // terminate() may have fired while waiting for a free worker.
        if *cancel.borrow() {
            drop(job);
            break;
        }

        let runner = runner.clone();
        let in_flight = in_flight.clone();
        let peak_in_flight = peak_in_flight.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak_in_flight.fetch_max(current, Ordering::SeqCst);

            let email = job.email.clone();
            let worker = tokio::spawn(runner.clone().verify(job.email));
            let record = match worker.await {
                Ok(record) => record,
                Err(err) => {
                    error!(email = %email, "verification worker failed: {err}");
                    runner.failure_record(&email)
                }
            };

            in_flight.fetch_sub(1, Ordering::SeqCst);
            let _ = job.reply.send(record);
        });
    }

    // Cancelled: reject everything still queued.
    jobs.close();
    while let Ok(job) = jobs.try_recv() {
        drop(job);
    }
}
