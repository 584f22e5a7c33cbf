use std::{collections::BTreeSet, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, sleep_until},
};
use tracing::{debug, error, info};

use crate::{
    dao::models::{Category, Record},
    error::PersistError,
    services::persistence::Persistence,
    state::{
        Records,
        scheduler::{Command, FlushReport, FlushScope, Flusher, SchedulerPhase, SchedulerStats},
    },
};

/// Debounce loop backing [`SaveScheduler`](crate::state::scheduler::SaveScheduler).
///
/// Every mark re-arms the deadline to `now + interval`; the flush fires once
/// the deadline passes without another mark. Failed categories stay dirty and
/// are retried by the next flush pass.
pub(crate) async fn run<F: Flusher>(
    mut commands: mpsc::UnboundedReceiver<Command>,
    flusher: F,
    interval: Duration,
    phase: watch::Sender<SchedulerPhase>,
    stats: Arc<SchedulerStats>,
) {
    let mut dirty = BTreeSet::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => tokio::select! {
                command = commands.recv() => command,
                _ = sleep_until(at) => {
                    deadline = None;
                    let report = flush(&flusher, &mut dirty, FlushScope::Dirty).await;
                    stats.record_flush(&report);
                    phase.send_replace(SchedulerPhase::Idle);
                    continue;
                }
            },
            None => commands.recv().await,
        };

        match command {
            Some(Command::MarkDirty(category)) => {
                dirty.insert(category);
                let at = Instant::now() + interval;
                deadline = Some(at);
                phase.send_replace(SchedulerPhase::PendingFlush { deadline: at });
            }
            Some(Command::Flush { scope, ack }) => {
                deadline = None;
                let report = flush(&flusher, &mut dirty, scope).await;
                stats.record_flush(&report);
                phase.send_replace(SchedulerPhase::Idle);
                let _ = ack.send(report);
            }
            Some(Command::Shutdown { ack }) => {
                let report = flush(&flusher, &mut dirty, FlushScope::Dirty).await;
                stats.record_flush(&report);
                phase.send_replace(SchedulerPhase::Idle);
                let _ = ack.send(report);
                info!("save scheduler stopped");
                break;
            }
            None => {
                // every handle dropped; flush what is left before exiting
                let report = flush(&flusher, &mut dirty, FlushScope::Dirty).await;
                stats.record_flush(&report);
                phase.send_replace(SchedulerPhase::Idle);
                debug!("save scheduler handles dropped; worker exiting");
                break;
            }
        }
    }
}

async fn flush<F: Flusher>(
    flusher: &F,
    dirty: &mut BTreeSet<Category>,
    scope: FlushScope,
) -> FlushReport {
    let targets: Vec<Category> = match scope {
        FlushScope::Dirty => dirty.iter().copied().collect(),
        FlushScope::All => Category::ALL.to_vec(),
    };

    let mut report = FlushReport::default();
    for category in targets {
        match flusher.flush(category).await {
            Ok(()) => {
                dirty.remove(&category);
                report.written.push(category);
            }
            Err(err) => {
                error!(%category, error = %err, "failed to flush save; will retry on next flush");
                dirty.insert(category);
                report.failed.push(category);
            }
        }
    }

    if !report.is_noop() {
        debug!(written = ?report.written, failed = ?report.failed, "flush pass complete");
    }
    report
}

/// Writes a snapshot of the live records through [`Persistence`].
///
/// The record lock is held only long enough to clone it.
pub(crate) struct RecordFlusher {
    records: Arc<Records>,
    persistence: Persistence,
}

impl RecordFlusher {
    pub(crate) fn new(records: Arc<Records>, persistence: Persistence) -> Self {
        Self {
            records,
            persistence,
        }
    }

    async fn write<T: Record>(&self, snapshot: T) -> Result<(), PersistError> {
        self.persistence.save(&snapshot).await
    }
}

impl Flusher for RecordFlusher {
    fn flush(&self, category: Category) -> BoxFuture<'_, Result<(), PersistError>> {
        Box::pin(async move {
            match category {
                Category::Player => {
                    let snapshot = self.records.player.read().await.clone();
                    self.write(snapshot).await
                }
                Category::Settings => {
                    let snapshot = self.records.settings.read().await.clone();
                    self.write(snapshot).await
                }
            }
        })
    }
}
