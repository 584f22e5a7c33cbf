//! Debounced save scheduling.
//!
//! Mutations call [`SaveScheduler::mark_dirty`]; the worker spawned by
//! [`SaveScheduler::spawn`] waits for `interval` of quiet before flushing the
//! dirty categories. Forced flushes and the debounce timer are handled by the
//! same task, so they can never overlap.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::debug;

use crate::{
    dao::models::Category,
    error::{PersistError, SchedulerError},
    services::flush_worker,
};

/// Default quiet period before dirty categories are flushed.
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_millis(1_500);

/// Observable state of the debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Nothing scheduled.
    Idle,
    /// A flush fires at `deadline` unless re-armed or forced first.
    PendingFlush { deadline: Instant },
}

/// Persists the current in-memory state of one category.
pub trait Flusher: Send + Sync + 'static {
    /// Write the current state of `category` to the backend.
    fn flush(&self, category: Category) -> BoxFuture<'_, Result<(), PersistError>>;
}

/// Which categories a flush pass wrote and which failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Categories written by the pass.
    pub written: Vec<Category>,
    /// Categories whose write failed; they stay dirty.
    pub failed: Vec<Category>,
}

impl FlushReport {
    /// Whether the pass wrote nothing at all.
    pub fn is_noop(&self) -> bool {
        self.written.is_empty() && self.failed.is_empty()
    }
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    marks: AtomicU64,
    flushes: AtomicU64,
    failed_writes: AtomicU64,
}

impl SchedulerStats {
    /// `mark_dirty` calls received.
    pub fn marks(&self) -> u64 {
        self.marks.load(Ordering::SeqCst)
    }

    /// Flush passes that wrote or attempted at least one category.
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Category writes that failed.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::SeqCst)
    }

    pub(crate) fn record_mark(&self) {
        self.marks.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_flush(&self, report: &FlushReport) {
        if report.is_noop() {
            return;
        }
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.failed_writes
            .fetch_add(report.failed.len() as u64, Ordering::SeqCst);
    }
}

/// What a flush pass should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushScope {
    /// Only categories marked dirty.
    Dirty,
    /// Every category, dirty or not.
    All,
}

pub(crate) enum Command {
    MarkDirty(Category),
    Flush {
        scope: FlushScope,
        ack: oneshot::Sender<FlushReport>,
    },
    Shutdown {
        ack: oneshot::Sender<FlushReport>,
    },
}

/// Handle to the debounce worker. Cheap to share behind the save context.
pub struct SaveScheduler {
    commands: mpsc::UnboundedSender<Command>,
    phase: watch::Receiver<SchedulerPhase>,
    stats: Arc<SchedulerStats>,
    interval: Duration,
}

impl SaveScheduler {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn<F: Flusher>(interval: Duration, flusher: F) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (phase_tx, phase) = watch::channel(SchedulerPhase::Idle);
        let stats = Arc::new(SchedulerStats::default());

        let worker = tokio::spawn(flush_worker::run(
            receiver,
            flusher,
            interval,
            phase_tx,
            stats.clone(),
        ));

        let scheduler = Self {
            commands,
            phase,
            stats,
            interval,
        };
        (scheduler, worker)
    }

    /// Flag `category` as changed and restart the quiet period.
    ///
    /// Never blocks; calling it repeatedly before a flush is the same as calling it once.
    pub fn mark_dirty(&self, category: Category) {
        self.stats.record_mark();
        if self.commands.send(Command::MarkDirty(category)).is_err() {
            debug!(%category, "save scheduler stopped; dirty mark dropped");
        }
    }

    /// Cancel the pending timer and flush dirty categories now.
    pub async fn force_flush_now(&self) -> Result<FlushReport, SchedulerError> {
        self.request(FlushScope::Dirty).await
    }

    /// Cancel the pending timer and write every category, dirty or not.
    pub async fn flush_all(&self) -> Result<FlushReport, SchedulerError> {
        self.request(FlushScope::All).await
    }

    /// Flush dirty categories and stop the worker.
    pub async fn shutdown(&self) -> Result<FlushReport, SchedulerError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { ack })
            .map_err(|_| SchedulerError::Stopped)?;
        done.await.map_err(|_| SchedulerError::Stopped)
    }

    /// Current timer phase.
    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.borrow()
    }

    /// Subscribe to timer phase updates.
    pub fn phase_watcher(&self) -> watch::Receiver<SchedulerPhase> {
        self.phase.clone()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Quiet period applied by `mark_dirty`.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn request(&self, scope: FlushScope) -> Result<FlushReport, SchedulerError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::Flush { scope, ack })
            .map_err(|_| SchedulerError::Stopped)?;
        done.await.map_err(|_| SchedulerError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::dao::storage::StorageError;

    /// Records every flushed category; can be told to fail.
    #[derive(Clone, Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<(Category, Instant)>>>,
        failing: Arc<Mutex<bool>>,
    }

    impl Recorder {
        fn flushed(&self) -> Vec<Category> {
            self.log.lock().unwrap().iter().map(|(c, _)| *c).collect()
        }

        fn times(&self) -> Vec<Instant> {
            self.log.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }
    }

    impl Flusher for Recorder {
        fn flush(&self, category: Category) -> BoxFuture<'_, Result<(), PersistError>> {
            Box::pin(async move {
                if *self.failing.lock().unwrap() {
                    return Err(PersistError::Storage(StorageError::write(
                        category.to_string(),
                        std::io::Error::other("disk full"),
                    )));
                }
                self.log.lock().unwrap().push((category, Instant::now()));
                Ok(())
            })
        }
    }

    fn spawn(recorder: &Recorder) -> SaveScheduler {
        SaveScheduler::spawn(DEFAULT_SAVE_INTERVAL, recorder.clone()).0
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle() {
        let scheduler = spawn(&Recorder::default());
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_marks_flushes_once_after_the_last_one() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);
        let start = Instant::now();

        for _ in 0..5 {
            scheduler.mark_dirty(Category::Player);
            tokio::time::sleep(Duration::from_millis(1_000)).await;
        }
        // last mark at +4.0s, so nothing yet at +5.0s
        assert!(recorder.flushed().is_empty());
        match scheduler.phase() {
            SchedulerPhase::PendingFlush { deadline } => {
                assert!(deadline >= start + Duration::from_millis(5_500));
                assert!(deadline < start + Duration::from_millis(5_510));
            }
            SchedulerPhase::Idle => panic!("flush should still be pending"),
        }

        tokio::time::sleep(Duration::from_millis(1_000)).await;

        assert_eq!(recorder.flushed(), vec![Category::Player]);
        let flushed_after = recorder.times()[0] - start;
        assert!(flushed_after >= Duration::from_millis(5_500));
        assert!(flushed_after < Duration::from_millis(5_510));
        assert_eq!(scheduler.stats().flushes(), 1);
        assert_eq!(scheduler.stats().marks(), 5);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn only_dirty_categories_are_flushed() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);

        scheduler.mark_dirty(Category::Settings);
        scheduler.mark_dirty(Category::Settings);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(recorder.flushed(), vec![Category::Settings]);
    }

    #[tokio::test(start_paused = true)]
    async fn force_flush_cancels_the_timer_and_is_idempotent() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);

        scheduler.mark_dirty(Category::Player);
        scheduler.mark_dirty(Category::Settings);
        let first = scheduler.force_flush_now().await.unwrap();
        let second = scheduler.force_flush_now().await.unwrap();

        assert_eq!(first.written, vec![Category::Player, Category::Settings]);
        assert!(second.is_noop());
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.flushed().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn force_flush_when_idle_writes_nothing() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);

        let report = scheduler.force_flush_now().await.unwrap();

        assert!(report.is_noop());
        assert!(recorder.flushed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_all_writes_clean_categories_too() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);

        let report = scheduler.flush_all().await.unwrap();

        assert_eq!(report.written, Category::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_writes_are_retried_on_the_next_mark() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);

        recorder.set_failing(true);
        scheduler.mark_dirty(Category::Player);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(scheduler.stats().failed_writes(), 1);
        assert!(recorder.flushed().is_empty());

        recorder.set_failing(false);
        scheduler.mark_dirty(Category::Settings);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            recorder.flushed(),
            vec![Category::Player, Category::Settings]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_and_stops() {
        let recorder = Recorder::default();
        let scheduler = spawn(&recorder);

        scheduler.mark_dirty(Category::Player);
        let report = scheduler.shutdown().await.unwrap();

        assert_eq!(report.written, vec![Category::Player]);
        assert!(matches!(
            scheduler.force_flush_now().await,
            Err(SchedulerError::Stopped)
        ));
        scheduler.mark_dirty(Category::Player);
    }
}
