/// Resource change notifications.
pub mod events;
pub mod player;
pub mod scheduler;
/// Settings record behavior.
pub mod settings;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::SaveConfig,
    dao::{
        codec::{Obfuscator, SaveCodec},
        models::{BoosterKind, Category, PlayerState, ResourceKind, RewardItem, SettingsState},
        save_store::SaveStore,
    },
    services::{
        flush_worker::RecordFlusher,
        health_service,
        persistence::Persistence,
        reward_service::{self, RewardOutcome},
    },
};

pub use self::events::{ResourceHub, ResourceUpdated};
pub use self::scheduler::{FlushReport, SaveScheduler, SchedulerPhase, SchedulerStats};

/// Shared handle to the save layer.
pub type SharedContext = Arc<SaveContext>;

const RESOURCE_EVENTS_CAPACITY: usize = 32;

/// Live copies of every persisted record.
pub(crate) struct Records {
    pub(crate) player: RwLock<PlayerState>,
    pub(crate) settings: RwLock<SettingsState>,
}

/// Ownership root of the save layer.
///
/// Holds the in-memory records, persists them through the debounced
/// [`SaveScheduler`] and announces resource changes on a [`ResourceHub`].
/// Persistence failures never surface here: loads fall back to defaults and
/// failed flushes are logged and retried.
pub struct SaveContext {
    persistence: Persistence,
    records: Arc<Records>,
    scheduler: SaveScheduler,
    resources: ResourceHub,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SaveContext {
    /// Load every category from `store` and start the flush worker.
    pub async fn open(config: &SaveConfig, store: Arc<dyn SaveStore>) -> SharedContext {
        let codec = SaveCodec::new(
            Obfuscator::new(&config.obfuscation_key),
            config.obfuscated.clone(),
        );
        Self::open_with(Persistence::new(store, codec), config.save_interval).await
    }

    /// Like [`SaveContext::open`] with an already assembled [`Persistence`].
    pub async fn open_with(persistence: Persistence, save_interval: Duration) -> SharedContext {
        let player = persistence.load_tracked::<PlayerState>().await;
        let settings = persistence.load_tracked::<SettingsState>().await;
        let unpersisted: Vec<Category> = [
            (Category::Player, player.persisted),
            (Category::Settings, settings.persisted),
        ]
        .into_iter()
        .filter_map(|(category, persisted)| (!persisted).then_some(category))
        .collect();
        let (player, settings) = (player.record, settings.record);
        info!(
            level = player.current_level_id(),
            coin = player.coin(),
            health = player.health(),
            "save data loaded"
        );

        let records = Arc::new(Records {
            player: RwLock::new(player),
            settings: RwLock::new(settings),
        });
        let flusher = RecordFlusher::new(records.clone(), persistence.clone());
        let (scheduler, worker) = SaveScheduler::spawn(save_interval, flusher);
        for category in unpersisted {
            warn!(%category, "recovered defaults not written yet; queued for the next flush");
            scheduler.mark_dirty(category);
        }

        Arc::new(Self {
            persistence,
            records,
            scheduler,
            resources: ResourceHub::new(RESOURCE_EVENTS_CAPACITY),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Codec and backend used for every record.
    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Debounced flush scheduler.
    pub fn scheduler(&self) -> &SaveScheduler {
        &self.scheduler
    }

    /// Hub announcing resource quantity changes.
    pub fn resources(&self) -> &ResourceHub {
        &self.resources
    }

    /// Snapshot of the player record.
    pub async fn player(&self) -> PlayerState {
        self.records.player.read().await.clone()
    }

    /// Read the player record in place.
    pub async fn read_player<R>(&self, read: impl FnOnce(&PlayerState) -> R) -> R {
        let guard = self.records.player.read().await;
        read(&guard)
    }

    /// Snapshot of the settings record.
    pub async fn settings(&self) -> SettingsState {
        self.records.settings.read().await.clone()
    }

    /// Flag `category` for the next debounced flush.
    pub fn mark_dirty(&self, category: Category) {
        self.scheduler.mark_dirty(category);
    }

    /// Mutate the player record and schedule a flush.
    pub async fn update_player<R>(&self, update: impl FnOnce(&mut PlayerState) -> R) -> R {
        let result = self.mutate_player(update).await;
        self.mark_dirty(Category::Player);
        result
    }

    /// Mutate the settings record and schedule a flush.
    pub async fn update_settings<R>(&self, update: impl FnOnce(&mut SettingsState) -> R) -> R {
        let result = {
            let mut guard = self.records.settings.write().await;
            update(&mut guard)
        };
        self.mark_dirty(Category::Settings);
        result
    }

    pub(crate) async fn mutate_player<R>(&self, mutate: impl FnOnce(&mut PlayerState) -> R) -> R {
        let mut guard = self.records.player.write().await;
        mutate(&mut guard)
    }

    /// Mark the player dirty and announce `kind` when `changed`.
    fn player_change(&self, changed: bool, kind: ResourceKind) -> bool {
        if changed {
            self.mark_dirty(Category::Player);
            self.resources.publish(kind);
        }
        changed
    }

    pub(crate) fn commit_rewards(&self, outcome: &RewardOutcome, force_dirty: bool) {
        if outcome.granted || force_dirty {
            self.mark_dirty(Category::Player);
        }
        for kind in &outcome.touched {
            self.resources.publish(*kind);
        }
    }

    // Coins

    /// Add coins. Returns `false` when nothing changed.
    pub async fn add_coins(&self, amount: u32) -> bool {
        let changed = self.mutate_player(|p| p.add_coins(amount)).await;
        self.player_change(changed, ResourceKind::Coin)
    }

    /// Spend `amount` coins if the balance covers it; the balance is untouched otherwise.
    pub async fn try_spend_coins(&self, amount: u32) -> bool {
        let spent = self.mutate_player(|p| p.try_spend_coins(amount)).await;
        self.player_change(spent && amount > 0, ResourceKind::Coin);
        spent
    }

    /// Spend `amount` coins, flooring the balance at 0.
    pub async fn spend_coins(&self, amount: u32) {
        let changed = self
            .mutate_player(|p| {
                let before = p.coin();
                p.spend_coins(amount);
                before != p.coin()
            })
            .await;
        self.player_change(changed, ResourceKind::Coin);
    }

    // Boosters

    /// Add boosters of `kind`.
    pub async fn add_booster(&self, kind: BoosterKind, amount: u32) -> bool {
        let changed = self.mutate_player(|p| p.add_booster(kind, amount)).await;
        self.player_change(changed, ResourceKind::Booster)
    }

    /// Overwrite the count of `kind`, clamped at zero.
    pub async fn set_booster_count(&self, kind: BoosterKind, count: i64) {
        let changed = self
            .mutate_player(|p| {
                let before = p.booster_count(kind);
                p.set_booster_count(kind, count);
                before != p.booster_count(kind)
            })
            .await;
        self.player_change(changed, ResourceKind::Booster);
    }

    /// Use one booster. Returns `false` when none is held.
    pub async fn consume_booster(&self, kind: BoosterKind) -> bool {
        let consumed = self.mutate_player(|p| p.consume_booster(kind)).await;
        self.player_change(consumed, ResourceKind::Booster)
    }

    /// Spend one booster used during a level. Using one that is not owned does nothing.
    pub async fn on_booster_activated(&self, kind: BoosterKind) -> bool {
        let consumed = self.consume_booster(kind).await;
        if !consumed {
            debug!(?kind, "booster activated without stock");
        }
        consumed
    }

    // Ads and health

    /// Turn ads off for good. Returns `true` only the first time.
    pub async fn remove_ads(&self) -> bool {
        let flipped = self.mutate_player(PlayerState::remove_ads).await;
        self.player_change(flipped, ResourceKind::NoAds)
    }

    /// Spend a heart to start a level.
    pub async fn try_spend_heart(&self) -> bool {
        let spent = self.mutate_player(PlayerState::try_spend_heart).await;
        self.player_change(spent, ResourceKind::Heart)
    }

    /// Restore full health.
    pub async fn refill_health(&self) -> bool {
        let refilled = self.mutate_player(PlayerState::refill_health).await;
        self.player_change(refilled, ResourceKind::Heart)
    }

    /// Advance heart regeneration by `delta_secs`.
    pub async fn regenerate_health(&self, delta_secs: f64) -> bool {
        health_service::regenerate(self, delta_secs).await
    }

    /// Regenerate hearts for the wall-clock time elapsed since the last sync.
    pub async fn sync_health(&self, now_unix: i64) -> bool {
        health_service::sync(self, now_unix).await
    }

    // Progress

    /// Record the end of a level; a win moves the player to the next level.
    pub async fn on_level_finished(&self, win: bool) -> u32 {
        if !win {
            return self.read_player(PlayerState::current_level_id).await;
        }
        let level = self
            .update_player(|p| {
                p.advance_level();
                p.current_level_id()
            })
            .await;
        debug!(level, "level won");
        level
    }

    /// Record that the one-time rewards of `level` were granted.
    pub async fn mark_level_rewards_granted(&self, level: u32) -> bool {
        let marked = self
            .mutate_player(|p| p.mark_level_rewards_granted(level))
            .await;
        if marked {
            self.mark_dirty(Category::Player);
        }
        marked
    }

    /// Whether `level` already granted its one-time rewards.
    pub async fn has_granted_level_rewards(&self, level: u32) -> bool {
        self.read_player(|p| p.has_granted_level_rewards(level))
            .await
    }

    /// Consume the daily free spin. Returns `false` when today's was already used.
    pub async fn claim_free_spin(&self, now_unix: i64) -> bool {
        let claimed = self.mutate_player(|p| p.claim_free_spin(now_unix)).await;
        if claimed {
            self.mark_dirty(Category::Player);
        }
        claimed
    }

    // Rewards

    /// Apply a reward batch scaled by `multiplier`, scheduling one flush for the whole batch.
    ///
    /// Returns whether anything was granted.
    pub async fn apply_rewards(&self, items: &[RewardItem], multiplier: i32) -> bool {
        let outcome = self
            .mutate_player(|p| reward_service::apply_rewards(p, items, multiplier))
            .await;
        self.commit_rewards(&outcome, false);
        outcome.granted
    }

    // Settings

    /// Set music volume, clamped to `[0, 1]`.
    pub async fn set_music_volume(&self, volume: f32) {
        self.update_settings(|s| s.set_music_volume(volume)).await;
    }

    /// Set effects volume, clamped to `[0, 1]`.
    pub async fn set_sfx_volume(&self, volume: f32) {
        self.update_settings(|s| s.set_sfx_volume(volume)).await;
    }

    /// Toggle music.
    pub async fn set_music_enabled(&self, enabled: bool) {
        self.update_settings(|s| s.set_music_enabled(enabled)).await;
    }

    /// Toggle sound effects.
    pub async fn set_sfx_enabled(&self, enabled: bool) {
        self.update_settings(|s| s.set_sfx_enabled(enabled)).await;
    }

    /// Toggle vibration.
    pub async fn set_vibration_enabled(&self, enabled: bool) {
        self.update_settings(|s| s.set_vibration_enabled(enabled))
            .await;
    }

    /// Toggle notifications.
    pub async fn set_notifications_enabled(&self, enabled: bool) {
        self.update_settings(|s| s.set_notifications_enabled(enabled))
            .await;
    }

    // Persistence

    /// Write every category now, dirty or not. Returns `false` if any write failed.
    pub async fn save(&self) -> bool {
        match self.scheduler.flush_all().await {
            Ok(report) => report.failed.is_empty(),
            Err(err) => {
                warn!(error = %err, "save requested after the scheduler stopped");
                false
            }
        }
    }

    /// Flush pending changes immediately.
    pub async fn force_flush_now(&self) -> FlushReport {
        match self.scheduler.force_flush_now().await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "flush requested after the scheduler stopped");
                FlushReport::default()
            }
        }
    }

    /// Replace every record with its default and persist it.
    pub async fn reset(&self) {
        *self.records.player.write().await = PlayerState::default();
        *self.records.settings.write().await = SettingsState::default();
        if !self.save().await {
            error!("failed to persist reset save data; will retry on next flush");
            Category::ALL.iter().for_each(|c| self.mark_dirty(*c));
        }
        for kind in [ResourceKind::Coin, ResourceKind::Booster, ResourceKind::Heart] {
            self.resources.publish(kind);
        }
        info!("save data reset to defaults");
    }

    /// Delete every save file, then reset to persisted defaults.
    pub async fn wipe(&self) {
        if let Err(err) = self.persistence.store().clear().await {
            error!(error = %err, "failed to clear save storage");
        }
        self.reset().await;
    }

    /// App moved to the background.
    pub async fn on_suspend(&self) -> FlushReport {
        self.force_flush_now().await
    }

    /// App is quitting: flush pending changes and stop the worker.
    pub async fn on_quit(&self) -> FlushReport {
        let report = match self.scheduler.shutdown().await {
            Ok(report) => report,
            Err(err) => {
                debug!(error = %err, "scheduler already stopped");
                FlushReport::default()
            }
        };
        if let Some(worker) = self.worker.lock().await.take() {
            if let Err(err) = worker.await {
                error!(error = %err, "flush worker terminated abnormally");
            }
        }
        report
    }
}
