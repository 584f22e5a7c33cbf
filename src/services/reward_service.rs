use tracing::{debug, info};

use crate::{
    catalog::{ConfigCatalog, EventRewardKind},
    dao::models::{BoosterKind, PlayerState, ResourceKind, RewardItem},
    state::SaveContext,
};

/// Result of applying a reward batch to a player record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardOutcome {
    /// Whether any item changed the record.
    pub granted: bool,
    /// Resource kinds that changed, in first-touched order.
    pub touched: Vec<ResourceKind>,
}

impl RewardOutcome {
    fn touch(&mut self, kind: ResourceKind) {
        self.granted = true;
        if !self.touched.contains(&kind) {
            self.touched.push(kind);
        }
    }
}

/// Apply `items` to `player`, scaling every amount by `multiplier` (at least 1).
///
/// Non-positive amounts and unknown kinds are skipped. Removing ads counts as
/// granted only when it flips the flag.
pub fn apply_rewards(player: &mut PlayerState, items: &[RewardItem], multiplier: i32) -> RewardOutcome {
    let multiplier = multiplier.max(1);
    let mut outcome = RewardOutcome::default();

    for item in items {
        let amount = effective_amount(item.amount, multiplier);
        match item.resource_type {
            ResourceKind::Coin => {
                if amount > 0 && player.add_coins(amount) {
                    outcome.touch(ResourceKind::Coin);
                }
            }
            ResourceKind::Booster => {
                if item.booster_type == BoosterKind::None {
                    debug!(amount = item.amount, "booster reward without a booster kind; skipped");
                    continue;
                }
                if amount > 0 && player.add_booster(item.booster_type, amount) {
                    outcome.touch(ResourceKind::Booster);
                }
            }
            ResourceKind::NoAds => {
                if player.remove_ads() {
                    outcome.touch(ResourceKind::NoAds);
                }
            }
            ResourceKind::Heart | ResourceKind::None => {
                debug!(kind = ?item.resource_type, "unsupported reward kind; skipped");
            }
        }
    }

    outcome
}

fn effective_amount(amount: i32, multiplier: i32) -> u32 {
    let scaled = i64::from(amount) * i64::from(multiplier);
    u32::try_from(scaled.max(0)).unwrap_or(u32::MAX)
}

/// Grant the rewards configured for `day`. Returns `false` when the day is unknown or empty.
pub async fn claim_daily_reward(context: &SaveContext, catalog: &ConfigCatalog, day: u32) -> bool {
    let Some(config) = catalog.daily_reward(day) else {
        debug!(day, "no daily reward configured");
        return false;
    };
    let granted = context.apply_rewards(&config.rewards, 1).await;
    if granted {
        info!(day, "daily reward claimed");
    }
    granted
}

/// Grant the rewards attached to an in-game event, scaled by `multiplier`.
pub async fn grant_event_rewards(
    context: &SaveContext,
    catalog: &ConfigCatalog,
    kind: EventRewardKind,
    multiplier: i32,
) -> bool {
    let Some(config) = catalog.event_rewards(kind) else {
        debug!(?kind, "no event rewards configured");
        return false;
    };
    context.apply_rewards(&config.rewards, multiplier).await
}

/// Grant one-time rewards for `level` unless they were granted before.
///
/// The level is recorded as granted in the same mutation as the rewards, so
/// both land in the same flush.
pub async fn grant_level_rewards_once(context: &SaveContext, level: u32, items: &[RewardItem]) -> bool {
    let outcome = context
        .mutate_player(|player| {
            if !player.mark_level_rewards_granted(level) {
                return None;
            }
            Some(apply_rewards(player, items, 1))
        })
        .await;

    match outcome {
        Some(outcome) => {
            context.commit_rewards(&outcome, true);
            outcome.granted
        }
        None => {
            debug!(level, "level rewards already granted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::SaveConfig, dao::save_store::memory::MemorySaveStore, state::SharedContext,
    };

    #[test]
    fn coins_and_boosters_are_added() {
        let mut player = PlayerState::default();
        let outcome = apply_rewards(
            &mut player,
            &[RewardItem::coin(50), RewardItem::booster(BoosterKind::Shuffle, 2)],
            1,
        );

        assert!(outcome.granted);
        assert_eq!(outcome.touched, vec![ResourceKind::Coin, ResourceKind::Booster]);
        assert_eq!(player.coin(), 50);
        assert_eq!(player.booster_count(BoosterKind::Shuffle), 2);
    }

    #[test]
    fn multiplier_scales_and_is_floored_at_one() {
        let mut player = PlayerState::default();
        apply_rewards(&mut player, &[RewardItem::coin(10)], 3);
        apply_rewards(&mut player, &[RewardItem::coin(10)], 0);
        apply_rewards(&mut player, &[RewardItem::coin(10)], -4);

        assert_eq!(player.coin(), 50);
    }

    #[test]
    fn non_positive_and_unknown_items_grant_nothing() {
        let mut player = PlayerState::default();
        let items = [
            RewardItem::coin(0),
            RewardItem::coin(-20),
            RewardItem::booster(BoosterKind::None, 3),
            RewardItem {
                resource_type: ResourceKind::Heart,
                booster_type: BoosterKind::None,
                amount: 1,
            },
            RewardItem::default(),
        ];

        let outcome = apply_rewards(&mut player, &items, 1);

        assert!(!outcome.granted);
        assert!(outcome.touched.is_empty());
        assert_eq!(player, PlayerState::default());
    }

    #[test]
    fn removing_ads_counts_as_granted_only_when_it_flips() {
        let mut player = PlayerState::default();

        let first = apply_rewards(&mut player, &[RewardItem::no_ads()], 1);
        let second = apply_rewards(&mut player, &[RewardItem::no_ads()], 1);

        assert!(first.granted);
        assert_eq!(first.touched, vec![ResourceKind::NoAds]);
        assert!(!second.granted);
        assert!(player.is_remove_ads());
    }

    async fn context() -> SharedContext {
        SaveContext::open(&SaveConfig::default(), Arc::new(MemorySaveStore::new())).await
    }

    fn catalog() -> ConfigCatalog {
        ConfigCatalog::from_json(
            r#"{
                "dailyRewards": [
                    {"dayId": 0, "rewards": [{"resourceType": "COIN", "amount": 100}]},
                    {"dayId": 1, "rewards": []}
                ],
                "eventRewards": [
                    {"eventRewardType": "WIN_LEVEL", "rewards": [{"resourceType": "COIN", "amount": 20}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn daily_reward_is_granted_from_the_catalog() {
        let context = context().await;
        let catalog = catalog();

        assert!(claim_daily_reward(&context, &catalog, 0).await);
        assert!(!claim_daily_reward(&context, &catalog, 1).await);
        assert!(!claim_daily_reward(&context, &catalog, 9).await);
        assert_eq!(context.player().await.coin(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn event_rewards_honor_the_multiplier() {
        let context = context().await;
        let catalog = catalog();

        assert!(grant_event_rewards(&context, &catalog, EventRewardKind::WinLevel, 2).await);
        assert!(!grant_event_rewards(&context, &catalog, EventRewardKind::WatchAdsWinLevel, 2).await);
        assert_eq!(context.player().await.coin(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn level_rewards_are_granted_once() {
        let context = context().await;
        let items = [RewardItem::booster(BoosterKind::Timer, 1)];

        assert!(grant_level_rewards_once(&context, 3, &items).await);
        assert!(!grant_level_rewards_once(&context, 3, &items).await);

        let player = context.player().await;
        assert_eq!(player.booster_count(BoosterKind::Timer), 1);
        assert!(player.has_granted_level_rewards(3));
        assert_eq!(context.scheduler().stats().marks(), 1);
    }

    #[test]
    fn huge_multiplier_saturates() {
        let mut player = PlayerState::default();
        apply_rewards(&mut player, &[RewardItem::coin(i32::MAX)], i32::MAX);
        assert_eq!(player.coin(), u32::MAX);
    }
}
