use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Independently persisted slice of save data, one file per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Progress, currencies, boosters and health.
    Player,
    /// Audio and notification preferences.
    Settings,
}

impl Category {
    /// Every category, in flush order.
    pub const ALL: [Category; 2] = [Category::Player, Category::Settings];

    /// File stem used for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Player => "player",
            Category::Settings => "settings",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of resource a reward or a price entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    /// Unset.
    #[default]
    None,
    /// Soft currency.
    Coin,
    /// A booster, kind given separately.
    Booster,
    /// Lives used to enter levels.
    Heart,
    /// Permanent ad removal.
    NoAds,
}

/// Boosters the player can hold and activate during a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoosterKind {
    /// Not a booster.
    #[default]
    None,
    /// Freezes the level timer.
    Timer,
    /// Reshuffles the grills.
    Shuffle,
    /// Removes every unit of one food.
    ClearAFoodType,
    /// Completes one match.
    MagicPick,
}

/// A single reward (or price) line: a resource, an optional booster and an amount.
///
/// `amount` is signed because design data occasionally carries negative
/// adjustments; reward application clamps them away.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardItem {
    /// Which resource the line grants.
    pub resource_type: ResourceKind,
    /// Booster granted when `resource_type` is [`ResourceKind::Booster`].
    pub booster_type: BoosterKind,
    /// Quantity before any multiplier.
    pub amount: i32,
}

impl RewardItem {
    /// Coin reward of `amount`.
    pub fn coin(amount: i32) -> Self {
        Self {
            resource_type: ResourceKind::Coin,
            booster_type: BoosterKind::None,
            amount,
        }
    }

    /// Booster reward of `amount` units of `kind`.
    pub fn booster(kind: BoosterKind, amount: i32) -> Self {
        Self {
            resource_type: ResourceKind::Booster,
            booster_type: kind,
            amount,
        }
    }

    /// Permanent ads removal.
    pub fn no_ads() -> Self {
        Self {
            resource_type: ResourceKind::NoAds,
            booster_type: BoosterKind::None,
            amount: 1,
        }
    }
}

/// Owned count of one booster kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoosterStack {
    /// Booster held.
    pub booster_type: BoosterKind,
    /// Count held.
    pub amount: u32,
}

/// Player progress, currencies, boosters and health persisted under [`Category::Player`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    pub(crate) current_level_id: u32,
    pub(crate) coin: u32,
    pub(crate) health: u32,
    pub(crate) remain_time_for_next_heart: f64,
    pub(crate) is_remove_ads: bool,
    pub(crate) boosters: Vec<BoosterStack>,
    pub(crate) granted_one_time_reward_ids: Vec<u32>,
    pub(crate) last_free_bonus_spin_timestamp: i64,
    pub(crate) last_health_sync_timestamp: i64,
    #[serde(skip)]
    pub(crate) granted_lookup: HashSet<u32>,
}

/// Player preferences persisted under [`Category::Settings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsState {
    pub(crate) music_volume: f32,
    pub(crate) sfx_volume: f32,
    pub(crate) music_enabled: bool,
    pub(crate) sfx_enabled: bool,
    pub(crate) vibration_enabled: bool,
    pub(crate) notifications_enabled: bool,
}

/// A mutable aggregate mirrored to a single save file.
pub trait Record: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    /// Category (and therefore file) the record lives in.
    const CATEGORY: Category;

    /// Restore invariants and rebuild runtime-only indices after decoding.
    fn normalize(&mut self) {}
}
