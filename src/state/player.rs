//! Mutation rules for [`PlayerState`].
//!
//! Every operation here is pure: it clamps, applies, and reports whether
//! something changed. Persistence scheduling and notifications are the
//! caller's job (see [`SaveContext`](crate::state::SaveContext)).

use std::collections::HashSet;

use time::{Date, OffsetDateTime};

use crate::dao::models::{BoosterKind, BoosterStack, Category, PlayerState, Record};

/// Health capacity; health never exceeds it.
pub const MAX_HEALTH: u32 = 5;
/// Seconds needed to regenerate one heart.
pub const HEART_REGEN_INTERVAL_SECS: f64 = 1800.0;
/// Length of a day in seconds.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Boosters reset by [`PlayerState::clear_boosters`].
const CLEARABLE_BOOSTERS: [BoosterKind; 3] = [
    BoosterKind::Timer,
    BoosterKind::Shuffle,
    BoosterKind::ClearAFoodType,
];

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_level_id: 0,
            coin: 0,
            health: MAX_HEALTH,
            remain_time_for_next_heart: 0.0,
            is_remove_ads: false,
            boosters: Vec::new(),
            granted_one_time_reward_ids: Vec::new(),
            last_free_bonus_spin_timestamp: 0,
            last_health_sync_timestamp: 0,
            granted_lookup: HashSet::new(),
        }
    }
}

impl Record for PlayerState {
    const CATEGORY: Category = Category::Player;

    fn normalize(&mut self) {
        let mut merged: Vec<BoosterStack> = Vec::with_capacity(self.boosters.len());
        for stack in self.boosters.drain(..) {
            match merged
                .iter_mut()
                .find(|entry| entry.booster_type == stack.booster_type)
            {
                Some(entry) => entry.amount = entry.amount.saturating_add(stack.amount),
                None => merged.push(stack),
            }
        }
        self.boosters = merged;

        let mut seen = HashSet::with_capacity(self.granted_one_time_reward_ids.len());
        self.granted_one_time_reward_ids
            .retain(|id| seen.insert(*id));
        self.granted_lookup = seen;

        self.health = self.health.min(MAX_HEALTH);
        if !self.remain_time_for_next_heart.is_finite() {
            self.remain_time_for_next_heart = 0.0;
        }
        self.remain_time_for_next_heart = self
            .remain_time_for_next_heart
            .clamp(0.0, HEART_REGEN_INTERVAL_SECS);
        if self.is_full_health() {
            self.remain_time_for_next_heart = 0.0;
        }
    }
}

impl PlayerState {
    /// Index of the level the player is currently on.
    pub fn current_level_id(&self) -> u32 {
        self.current_level_id
    }

    /// Coin balance.
    pub fn coin(&self) -> u32 {
        self.coin
    }

    /// Hearts available.
    pub fn health(&self) -> u32 {
        self.health
    }

    /// Seconds left before the next heart regenerates; 0 while health is full.
    pub fn remain_time_for_next_heart(&self) -> f64 {
        self.remain_time_for_next_heart
    }

    /// Whether ads were removed.
    pub fn is_remove_ads(&self) -> bool {
        self.is_remove_ads
    }

    /// Owned boosters in acquisition order, at most one entry per kind.
    pub fn boosters(&self) -> &[BoosterStack] {
        &self.boosters
    }

    /// Levels whose one-time rewards were already handed out.
    pub fn granted_level_reward_ids(&self) -> &[u32] {
        &self.granted_one_time_reward_ids
    }

    /// Unix time of the last free spin, 0 if never.
    pub fn last_free_bonus_spin_timestamp(&self) -> i64 {
        self.last_free_bonus_spin_timestamp
    }

    /// Unix time of the last regeneration sync, 0 if never.
    pub fn last_health_sync_timestamp(&self) -> i64 {
        self.last_health_sync_timestamp
    }

    /// Whether health is at the cap.
    pub fn is_full_health(&self) -> bool {
        self.health >= MAX_HEALTH
    }

    // Level progress

    /// Set the current level, clamping negatives to 0.
    pub fn set_current_level(&mut self, level: i64) {
        self.current_level_id = clamp_to_u32(level);
    }

    /// Move on to the next level after a win.
    pub fn advance_level(&mut self) {
        self.current_level_id = self.current_level_id.saturating_add(1);
    }

    // Coins

    /// Add `amount` coins. Returns `false` when nothing was added.
    pub fn add_coins(&mut self, amount: u32) -> bool {
        if amount == 0 {
            return false;
        }
        self.coin = self.coin.saturating_add(amount);
        true
    }

    /// Spend `amount` coins if the balance covers it.
    ///
    /// Spending nothing always succeeds; an insufficient balance leaves it untouched.
    pub fn try_spend_coins(&mut self, amount: u32) -> bool {
        if amount == 0 {
            return true;
        }
        if self.coin < amount {
            return false;
        }
        self.coin -= amount;
        true
    }

    /// Spend `amount` coins, flooring the balance at 0.
    pub fn spend_coins(&mut self, amount: u32) {
        self.coin = self.coin.saturating_sub(amount);
    }

    /// Overwrite the balance, clamping negatives to 0.
    pub fn set_coins(&mut self, value: i64) {
        self.coin = clamp_to_u32(value);
    }

    /// Zero the balance.
    pub fn clear_coins(&mut self) {
        self.coin = 0;
    }

    // Boosters

    /// Units of `kind` owned; absent kinds count as 0.
    pub fn booster_count(&self, kind: BoosterKind) -> u32 {
        self.boosters
            .iter()
            .find(|stack| stack.booster_type == kind)
            .map_or(0, |stack| stack.amount)
    }

    /// Add `amount` units of `kind`. Returns `false` when nothing was added.
    pub fn add_booster(&mut self, kind: BoosterKind, amount: u32) -> bool {
        if amount == 0 {
            return false;
        }
        let stack = self.stack_mut(kind);
        stack.amount = stack.amount.saturating_add(amount);
        true
    }

    /// Overwrite the count of `kind`, clamping negatives to 0.
    pub fn set_booster_count(&mut self, kind: BoosterKind, count: i64) {
        self.stack_mut(kind).amount = clamp_to_u32(count);
    }

    /// Use one unit of `kind`. Returns `false` when none was owned.
    pub fn consume_booster(&mut self, kind: BoosterKind) -> bool {
        match self
            .boosters
            .iter_mut()
            .find(|stack| stack.booster_type == kind)
        {
            Some(stack) if stack.amount > 0 => {
                stack.amount -= 1;
                true
            }
            _ => false,
        }
    }

    /// Zero the standard in-level boosters.
    pub fn clear_boosters(&mut self) {
        for kind in CLEARABLE_BOOSTERS {
            self.set_booster_count(kind, 0);
        }
    }

    fn stack_mut(&mut self, kind: BoosterKind) -> &mut BoosterStack {
        let index = match self
            .boosters
            .iter()
            .position(|stack| stack.booster_type == kind)
        {
            Some(index) => index,
            None => {
                self.boosters.push(BoosterStack {
                    booster_type: kind,
                    amount: 0,
                });
                self.boosters.len() - 1
            }
        };
        &mut self.boosters[index]
    }

    // Ads

    /// Permanently disable ads. Returns `true` when the flag flipped.
    pub fn remove_ads(&mut self) -> bool {
        let flipped = !self.is_remove_ads;
        self.is_remove_ads = true;
        flipped
    }

    // Health

    /// Overwrite health, clamped to `[0, MAX_HEALTH]`.
    ///
    /// Dropping below full starts a fresh regeneration countdown; reaching
    /// full stops it.
    pub fn set_health(&mut self, value: i64) {
        let was_full = self.is_full_health();
        self.health = clamp_to_u32(value).min(MAX_HEALTH);
        if self.is_full_health() {
            self.remain_time_for_next_heart = 0.0;
        } else if was_full {
            self.remain_time_for_next_heart = HEART_REGEN_INTERVAL_SECS;
        }
    }

    /// Spend one heart to enter a level. Returns `false` when out of hearts.
    pub fn try_spend_heart(&mut self) -> bool {
        if self.health == 0 {
            return false;
        }
        self.set_health(i64::from(self.health) - 1);
        true
    }

    /// Restore health to full.
    pub fn refill_health(&mut self) -> bool {
        if self.is_full_health() {
            return false;
        }
        self.set_health(i64::from(MAX_HEALTH));
        true
    }

    /// Advance regeneration by `delta_secs` of elapsed real time.
    ///
    /// Whole regen intervals grant hearts directly, the remainder eats into
    /// the countdown, and a countdown that runs out grants one more heart.
    /// Returns `true` when health or the countdown changed.
    pub fn regenerate(&mut self, delta_secs: f64) -> bool {
        if self.is_full_health() {
            let changed = self.health != MAX_HEALTH || self.remain_time_for_next_heart != 0.0;
            self.health = MAX_HEALTH;
            self.remain_time_for_next_heart = 0.0;
            return changed;
        }
        if !delta_secs.is_finite() || delta_secs <= 0.0 {
            return false;
        }

        let before = (self.health, self.remain_time_for_next_heart);
        let mut remaining = delta_secs;

        let ticks = (remaining / HEART_REGEN_INTERVAL_SECS).floor();
        if ticks >= 1.0 {
            let missing = f64::from(MAX_HEALTH - self.health);
            self.health += ticks.min(missing) as u32;
            remaining -= ticks * HEART_REGEN_INTERVAL_SECS;
        }

        if !self.is_full_health() {
            self.remain_time_for_next_heart -= remaining;
            if self.remain_time_for_next_heart <= 0.0 {
                self.health += 1;
                self.remain_time_for_next_heart += HEART_REGEN_INTERVAL_SECS;
            }
        }

        if self.is_full_health() {
            self.health = MAX_HEALTH;
            self.remain_time_for_next_heart = 0.0;
        }

        before != (self.health, self.remain_time_for_next_heart)
    }

    /// Regenerate for the time elapsed since the last sync and stamp `now_unix`.
    ///
    /// The first sync only records the timestamp. A clock that moved
    /// backwards counts as no elapsed time. Returns `true` when the record
    /// changed, a new stamp alone included.
    pub fn regenerate_since(&mut self, now_unix: i64) -> bool {
        let last = self.last_health_sync_timestamp;
        self.last_health_sync_timestamp = now_unix;
        if last <= 0 {
            return last != now_unix;
        }
        let elapsed = now_unix.saturating_sub(last).max(0);
        let regenerated = self.regenerate(elapsed as f64);
        regenerated || last != now_unix
    }

    // One-time rewards

    /// Record that the one-time rewards of `level` were granted.
    ///
    /// Returns `false` when they already were; the id list never holds duplicates.
    pub fn mark_level_rewards_granted(&mut self, level: u32) -> bool {
        if !self.granted_lookup.insert(level) {
            return false;
        }
        self.granted_one_time_reward_ids.push(level);
        true
    }

    /// Whether `level` already granted its one-time rewards.
    pub fn has_granted_level_rewards(&self, level: u32) -> bool {
        self.granted_lookup.contains(&level)
    }

    // Daily free spin

    /// Whether the free bonus spin is available at `now_unix` (once per UTC day).
    pub fn can_claim_free_spin(&self, now_unix: i64) -> bool {
        let last = self.last_free_bonus_spin_timestamp;
        if last <= 0 {
            return true;
        }
        match (utc_day(last), utc_day(now_unix)) {
            (Some(last_day), Some(today)) => today > last_day,
            _ => now_unix.saturating_sub(last) >= SECONDS_PER_DAY,
        }
    }

    /// Consume today's free spin. Returns `false` when it was already used.
    pub fn claim_free_spin(&mut self, now_unix: i64) -> bool {
        if !self.can_claim_free_spin(now_unix) {
            return false;
        }
        self.last_free_bonus_spin_timestamp = now_unix;
        true
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

fn utc_day(unix: i64) -> Option<Date> {
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .map(|moment| moment.date())
}
