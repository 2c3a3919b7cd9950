//! Bounded-concurrency task execution.
//!
//! Every submitted task runs to completion. A failing task never cancels its
//! siblings: the first error observed is kept, later ones are logged and
//! dropped, and the caller sees the error only once the whole batch has
//! drained. Callers must therefore expect partial side effects (some chunks
//! uploaded, others not) when a batch fails.

use crate::error::{TransferError, TransferResult};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Observer invoked after each task completes.
pub type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// What a batch of tasks is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferKind {
    Upload,
    Download,
    Delete,
}

impl TransferKind {
    /// Past-tense label for progress output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Uploaded",
            Self::Download => "Downloaded",
            Self::Delete => "Deleted",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Snapshot passed to the progress observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub kind: TransferKind,
    /// Tasks finished so far, successful or not.
    pub completed: u64,
    /// Total tasks, when known up front.
    pub total: Option<u64>,
}

/// Runs independent tasks with at most `concurrency` in flight.
#[derive(Clone)]
pub struct TransferEngine {
    concurrency: usize,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEngine")
            .field("concurrency", &self.concurrency)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl TransferEngine {
    /// A ceiling of zero is treated as one.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The same engine limited to one task at a time. Tasks then run in
    /// submission order.
    pub fn sequential(&self) -> Self {
        Self {
            concurrency: 1,
            progress: self.progress.clone(),
        }
    }

    /// Start an incremental batch. Use this when tasks are produced lazily,
    /// e.g. while a file is still being read.
    pub fn batch<R: Send + 'static>(&self, kind: TransferKind, total: Option<u64>) -> TransferBatch<R> {
        TransferBatch {
            kind,
            semaphore: Arc::new(Semaphore::new(self.concurrency)),
            tasks: JoinSet::new(),
            results: Vec::new(),
            first_error: None,
            completed: 0,
            total,
            progress: self.progress.clone(),
        }
    }

    /// Run a known set of tasks and wait for all of them.
    pub async fn run<R, Fut, I>(&self, kind: TransferKind, tasks: I) -> TransferReport<R>
    where
        R: Send + 'static,
        Fut: Future<Output = TransferResult<R>> + Send + 'static,
        I: IntoIterator<Item = Fut>,
    {
        let tasks: Vec<Fut> = tasks.into_iter().collect();
        let mut batch = self.batch(kind, Some(tasks.len() as u64));
        for task in tasks {
            batch.submit(task).await;
        }
        batch.finish().await
    }
}

/// An in-progress set of tasks sharing one concurrency ceiling.
///
/// Dropping a batch without calling [`TransferBatch::finish`] aborts the
/// tasks still running.
pub struct TransferBatch<R> {
    kind: TransferKind,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<(usize, TransferResult<R>)>,
    results: Vec<Option<R>>,
    first_error: Option<TransferError>,
    completed: u64,
    total: Option<u64>,
    progress: Option<ProgressFn>,
}

impl<R: Send + 'static> TransferBatch<R> {
    /// Number of tasks submitted so far.
    pub fn submitted(&self) -> usize {
        self.results.len()
    }

    /// Submit a task, waiting for a free slot first.
    ///
    /// The task's result is stored at its submission position regardless of
    /// when it completes.
    pub async fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = TransferResult<R>> + Send + 'static,
    {
        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
        }

        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(closed) => {
                // The semaphore is private and never closed.
                self.results.push(None);
                self.fail(TransferError::TaskFailed(closed.to_string()));
                return;
            }
        };

        let index = self.results.len();
        self.results.push(None);
        self.tasks.spawn(async move {
            let result = task.await;
            drop(permit);
            (index, result)
        });
    }

    /// Wait for every submitted task.
    pub async fn finish(mut self) -> TransferReport<R> {
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }

        tracing::debug!(
            kind = %self.kind,
            tasks = self.results.len(),
            failed = self.first_error.is_some(),
            "transfer batch finished"
        );

        TransferReport {
            results: self.results,
            first_error: self.first_error,
        }
    }

    fn record(&mut self, joined: Result<(usize, TransferResult<R>), JoinError>) {
        self.completed += 1;
        match joined {
            Ok((index, Ok(value))) => {
                tracing::trace!(kind = %self.kind, task = index, "task completed");
                self.results[index] = Some(value);
            }
            Ok((index, Err(err))) => {
                tracing::warn!(kind = %self.kind, task = index, error = %err, "task failed");
                self.fail(err);
            }
            Err(join_err) => {
                tracing::warn!(kind = %self.kind, error = %join_err, "task did not complete");
                self.fail(TransferError::TaskFailed(join_err.to_string()));
            }
        }

        if let Some(progress) = &self.progress {
            progress(Progress {
                kind: self.kind,
                completed: self.completed,
                total: self.total,
            });
        }
    }

    fn fail(&mut self, err: TransferError) {
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
    }
}

/// Outcome of a finished batch.
#[derive(Debug)]
pub struct TransferReport<R> {
    /// Per-task results in submission order; `None` where the task failed.
    pub results: Vec<Option<R>>,
    /// The first failure observed, if any.
    pub first_error: Option<TransferError>,
}

impl<R> TransferReport<R> {
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }

    /// All results in submission order, or the first error.
    pub fn into_result(self) -> TransferResult<Vec<R>> {
        if let Some(err) = self.first_error {
            return Err(err);
        }
        self.results
            .into_iter()
            .collect::<Option<Vec<R>>>()
            .ok_or_else(|| TransferError::TaskFailed("task finished without a result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn batch_should_panic() -> bool {
        true
    }

    fn failure(msg: &str) -> TransferError {
        TransferError::TaskFailed(msg.to_string())
    }

    #[tokio::test]
    async fn results_follow_submission_order() {
        let engine = TransferEngine::new(4);
        // Later tasks finish first.
        let tasks = (0..8u64).map(|i| async move {
            tokio::time::sleep(Duration::from_millis((8 - i) * 3)).await;
            Ok(i * 10)
        });
        let report = engine.run(TransferKind::Download, tasks).await;
        assert_eq!(report.into_result().unwrap(), vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[tokio::test]
    async fn respects_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let engine = TransferEngine::new(3);

        let tasks = (0..20).map(|_| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let report = engine.run(TransferKind::Upload, tasks).await;
        assert!(report.is_success());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn keeps_first_error_and_runs_everything() {
        let attempted = Arc::new(AtomicUsize::new(0));
        let engine = TransferEngine::new(2);

        let tasks = (0..10u64).map(|i| {
            let attempted = attempted.clone();
            async move {
                attempted.fetch_add(1, Ordering::SeqCst);
                // Task 2 fails well before task 7.
                tokio::time::sleep(Duration::from_millis(if i == 7 { 1 } else { 2 })).await;
                match i {
                    2 => Err(failure("first")),
                    7 => Err(failure("second")),
                    _ => Ok(i),
                }
            }
        });

        let report = engine.run(TransferKind::Upload, tasks).await;
        assert_eq!(attempted.load(Ordering::SeqCst), 10);
        assert!(report.results[2].is_none());
        assert!(report.results[7].is_none());
        assert_eq!(report.results.iter().filter(|r| r.is_some()).count(), 8);
        match report.into_result() {
            Err(TransferError::TaskFailed(msg)) => assert_eq!(msg, "first"),
            other => panic!("expected first failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let engine = TransferEngine::new(2);
        let mut batch = engine.batch::<u32>(TransferKind::Download, None);
        batch.submit(async { Ok(1) }).await;
        batch
            .submit(async {
                if batch_should_panic() {
                    panic!("boom");
                }
                Ok(2)
            })
            .await;
        let report = batch.finish().await;
        assert_eq!(report.results[0], Some(1));
        assert!(matches!(report.first_error, Some(TransferError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn sequential_runs_in_submission_order() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let engine = TransferEngine::new(8).sequential();
        assert_eq!(engine.concurrency(), 1);

        let tasks = (0..6u64).map(|i| {
            let started = started.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                started.lock().unwrap().push(i);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Earlier tasks take longer, so overlap would reorder them.
                tokio::time::sleep(Duration::from_millis((6 - i) * 2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        });

        let report = engine.run(TransferKind::Delete, tasks).await;
        assert_eq!(report.into_result().unwrap(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(*started.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_batch_succeeds() {
        let engine = TransferEngine::new(8);
        let report = engine
            .run(TransferKind::Delete, Vec::<std::future::Ready<TransferResult<()>>>::new())
            .await;
        assert!(report.into_result().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_ceiling_still_makes_progress() {
        let engine = TransferEngine::new(0);
        assert_eq!(engine.concurrency(), 1);
        let report = engine
            .run(TransferKind::Upload, (0..3).map(|i| async move { Ok(i) }))
            .await;
        assert_eq!(report.into_result().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reports_progress_per_task() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let engine = TransferEngine::new(2).with_progress(Arc::new(move |p: Progress| {
            sink.lock().unwrap().push((p.completed, p.total));
        }));

        let report = engine
            .run(TransferKind::Upload, (0..4).map(|i| async move { Ok(i) }))
            .await;
        assert!(report.is_success());

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(1, Some(4)), (2, Some(4)), (3, Some(4)), (4, Some(4))]
        );
    }
}
