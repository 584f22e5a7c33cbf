use indexmap::IndexMap;
use serde::Serialize;

use crate::dao::models::{BoosterKind, ResourceKind, RewardItem};

/// Reward list folded into per-resource totals for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    /// Coins granted.
    pub coin: u32,
    /// Booster totals in first-seen order.
    pub boosters: IndexMap<BoosterKind, u32>,
    /// Whether ads are removed.
    pub remove_ads: bool,
}

impl RewardSummary {
    /// Fold reward items into totals.
    pub fn from_items(items: &[RewardItem]) -> Self {
        let mut summary = Self::default();
        for item in items {
            let amount = item.amount.max(0) as u32;
            match item.resource_type {
                ResourceKind::Coin => summary.coin = summary.coin.saturating_add(amount),
                ResourceKind::Booster if item.booster_type != BoosterKind::None => {
                    let total = summary.boosters.entry(item.booster_type).or_insert(0);
                    *total = total.saturating_add(amount);
                }
                ResourceKind::NoAds => summary.remove_ads = true,
                _ => {}
            }
        }
        summary
    }

    /// Nothing would be granted.
    pub fn is_empty(&self) -> bool {
        self.coin == 0 && !self.remove_ads && self.boosters.values().all(|&amount| amount == 0)
    }
}
