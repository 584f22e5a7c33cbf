//! Design-data records as they appear in the catalog document.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::dao::models::{BoosterKind, ResourceKind, RewardItem};

use super::table::Keyed;

/// Visual theme of a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConceptKind {
    /// No concept set.
    #[default]
    None,
    /// Default kitchen.
    Classic,
    /// Beach stall.
    Beach,
    /// Farm market.
    Farm,
}

/// In-game moments that hand out configured rewards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventRewardKind {
    /// No event.
    #[default]
    None,
    /// Level won.
    WinLevel,
    /// Level won with the rewarded-ad bonus.
    WatchAdsWinLevel,
}

/// Store product family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IapKind {
    /// Mixed bundle.
    #[default]
    Bundle,
    /// Coin pack.
    Coin,
    /// Ad removal.
    NoAds,
    /// Booster pack.
    Booster,
}

/// Numeric food identifier. The set of foods is open-ended design data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoodKind(pub u16);

/// One grill slot of a level layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GrillConfig {
    /// Slot index within the level.
    pub grill_id: u32,
    /// Food locking the slot until cleared.
    pub locked_food_type: Option<FoodKind>,
    /// Foods placed on the grill, bottom first.
    pub food_list: Vec<FoodKind>,
}

/// Layout and tuning of a single level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct LevelConfig {
    /// Level number; negative ids are ignored.
    #[serde(rename = "levelID")]
    pub level_id: i32,
    /// Distinct food kinds in the level.
    pub food_type_num: u32,
    /// Total food units.
    pub food_amount: u32,
    /// Grill count.
    pub grill_num: u32,
    /// Grills that start empty.
    pub grill_empty: u32,
    /// Time limit in seconds.
    #[validate(range(min = 0.0))]
    pub duration: f32,
    /// Visual concept the level is drawn with.
    pub concept_type: ConceptKind,
    /// Grill slots.
    #[validate(nested)]
    pub grill_records: Vec<GrillConfig>,
}

impl LevelConfig {
    /// Food units actually placed on the grills.
    pub fn placed_food(&self) -> usize {
        self.grill_records.iter().map(|grill| grill.food_list.len()).sum()
    }
}

impl Keyed for LevelConfig {
    type Key = u32;

    fn key(&self) -> Option<u32> {
        u32::try_from(self.level_id).ok()
    }
}

/// Unlock rule and label of a booster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct BoosterConfig {
    /// Booster this entry describes.
    pub booster_type: BoosterKind,
    /// First level where the booster is offered.
    pub unlock_level: u32,
    /// Display name.
    #[validate(length(min = 1))]
    pub booster_name: String,
}

impl Keyed for BoosterConfig {
    type Key = BoosterKind;

    fn key(&self) -> Option<BoosterKind> {
        (self.booster_type != BoosterKind::None).then_some(self.booster_type)
    }
}

/// Display data of one food.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct FoodConfig {
    /// Food id.
    #[serde(rename = "type")]
    pub kind: FoodKind,
    /// Display name.
    pub display_name: String,
    /// Score granted per match.
    #[validate(range(min = 0))]
    pub base_score: i32,
}

impl Keyed for FoodConfig {
    type Key = FoodKind;

    fn key(&self) -> Option<FoodKind> {
        Some(self.kind)
    }
}

/// Store product and what buying it grants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct IapConfig {
    /// Display name of the bundle.
    pub bundle_name: String,
    /// Store product id.
    pub bundle_id: String,
    /// Purchase kind.
    pub iap_type: IapKind,
    /// Store description.
    pub description: String,
    /// Localized price label.
    pub price: String,
    /// Items granted on purchase.
    pub reward_list: Vec<RewardItem>,
}

impl Keyed for IapConfig {
    type Key = String;

    fn key(&self) -> Option<String> {
        let id = self.bundle_id.trim();
        (!id.is_empty()).then(|| id.to_owned())
    }
}

/// Shop entry for a resource, priced in other resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceConfig {
    /// Resource sold.
    pub resource_type: ResourceKind,
    /// Booster sold when the resource is a booster.
    pub booster_type: BoosterKind,
    /// Shop description.
    pub description: String,
    /// Cost, as resource amounts.
    pub price_in_resources: Vec<RewardItem>,
}

impl ResourceConfig {
    /// Sum of the coin items in the price list.
    pub fn coin_price(&self) -> u32 {
        self.price_in_resources
            .iter()
            .filter(|item| item.resource_type == ResourceKind::Coin)
            .map(|item| item.amount.max(0) as u32)
            .fold(0, u32::saturating_add)
    }
}

impl Keyed for ResourceConfig {
    type Key = (ResourceKind, BoosterKind);

    fn key(&self) -> Option<Self::Key> {
        match self.resource_type {
            ResourceKind::None => None,
            ResourceKind::Booster => Some((ResourceKind::Booster, self.booster_type)),
            other => Some((other, BoosterKind::None)),
        }
    }
}

/// Theme assets and the foods served in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ConceptConfig {
    /// Concept this entry styles.
    pub concept_type: ConceptKind,
    /// Foods styled for this concept.
    #[validate(nested)]
    pub food_data: Vec<FoodConfig>,
}

impl ConceptConfig {
    /// Food styled for this concept.
    pub fn food(&self, kind: FoodKind) -> Option<&FoodConfig> {
        self.food_data.iter().find(|food| food.kind == kind)
    }
}

impl Keyed for ConceptConfig {
    type Key = ConceptKind;

    fn key(&self) -> Option<ConceptKind> {
        Some(self.concept_type)
    }
}

/// Rewards for one day of the login calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyRewardConfig {
    /// Zero-based day.
    pub day_id: u32,
    /// Items granted.
    pub rewards: Vec<RewardItem>,
}

impl Keyed for DailyRewardConfig {
    type Key = u32;

    fn key(&self) -> Option<u32> {
        Some(self.day_id)
    }
}

/// Rewards attached to an in-game event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRewardConfig {
    /// Triggering event.
    pub event_reward_type: EventRewardKind,
    /// Items granted, before any multiplier.
    pub rewards: Vec<RewardItem>,
}

impl Keyed for EventRewardConfig {
    type Key = EventRewardKind;

    fn key(&self) -> Option<EventRewardKind> {
        Some(self.event_reward_type)
    }
}

const DEFAULT_GALLERY_START: i64 = 10;
const DEFAULT_GALLERY_EVERY: i64 = 10;

/// Level range in which a gallery picture fills up every `required_number_of_level` wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "validate_band"))]
pub struct GalleryRewardBand {
    /// First level of the band.
    #[validate(range(min = 0))]
    pub start_level: i32,
    /// Last level of the band, inclusive.
    pub end_level: i32,
    /// Levels needed per gallery unlock.
    #[validate(range(min = 1))]
    pub required_number_of_level: i32,
}

fn validate_band(band: &GalleryRewardBand) -> Result<(), ValidationError> {
    if band.end_level < band.start_level {
        let mut err = ValidationError::new("gallery_band_order");
        err.message = Some(
            format!(
                "Gallery band ends before it starts ({} < {})",
                band.end_level, band.start_level
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Gallery unlock bands by level range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryRewardConfig {
    /// Bands, first match wins.
    #[validate(nested)]
    pub items: Vec<GalleryRewardBand>,
}

impl GalleryRewardConfig {
    /// Fill ratio of the gallery picture after finishing `level`, in `[0, 1]`.
    ///
    /// Levels outside every band use a start of 10 and a cycle of 10.
    pub fn current_progress(&self, level: i64) -> f32 {
        if level == 0 {
            return 0.0;
        }

        let (start, every) = self
            .items
            .iter()
            .find(|band| level >= i64::from(band.start_level) && level <= i64::from(band.end_level))
            .map(|band| {
                (
                    i64::from(band.start_level),
                    i64::from(band.required_number_of_level),
                )
            })
            .unwrap_or((DEFAULT_GALLERY_START, DEFAULT_GALLERY_EVERY));
        let every = if every > 0 { every } else { DEFAULT_GALLERY_EVERY };

        let cycle = (level - start) % every;
        let progress = (cycle + 1) as f32 / every as f32;
        progress.clamp(0.0, 1.0)
    }

    /// Progress before `level`; a completed picture reads as empty.
    pub fn previous_progress(&self, level: i64) -> f32 {
        let progress = self.current_progress(level - 1);
        if progress >= 1.0 { 0.0 } else { progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery() -> GalleryRewardConfig {
        GalleryRewardConfig {
            items: vec![
                GalleryRewardBand {
                    start_level: 5,
                    end_level: 14,
                    required_number_of_level: 5,
                },
                GalleryRewardBand {
                    start_level: 15,
                    end_level: 40,
                    required_number_of_level: 4,
                },
            ],
        }
    }

    #[test]
    fn gallery_progress_inside_a_band() {
        let gallery = gallery();
        assert_eq!(gallery.current_progress(5), 0.2);
        assert_eq!(gallery.current_progress(7), 0.6);
        assert_eq!(gallery.current_progress(9), 1.0);
        assert_eq!(gallery.current_progress(10), 0.2);
        assert_eq!(gallery.current_progress(16), 0.5);
    }

    #[test]
    fn gallery_progress_defaults_outside_bands() {
        let gallery = gallery();
        assert_eq!(gallery.current_progress(0), 0.0);
        assert_eq!(gallery.current_progress(41), 0.2);
        // below the default start the cycle goes negative and clamps
        assert_eq!(GalleryRewardConfig::default().current_progress(3), 0.0);
    }

    #[test]
    fn previous_progress_wraps_a_full_picture_to_empty() {
        let gallery = gallery();
        assert_eq!(gallery.previous_progress(10), 0.0);
        assert_eq!(gallery.previous_progress(8), 0.6);
    }

    #[test]
    fn band_ending_before_start_is_rejected() {
        let band = GalleryRewardBand {
            start_level: 20,
            end_level: 10,
            required_number_of_level: 3,
        };
        assert!(band.validate().is_err());
    }

    #[test]
    fn zero_cycle_is_rejected() {
        let band = GalleryRewardBand {
            start_level: 1,
            end_level: 10,
            required_number_of_level: 0,
        };
        assert!(band.validate().is_err());
    }

    #[test]
    fn booster_price_sums_coin_items_only() {
        let resource = ResourceConfig {
            resource_type: ResourceKind::Booster,
            booster_type: BoosterKind::Timer,
            description: String::new(),
            price_in_resources: vec![
                RewardItem::coin(100),
                RewardItem::coin(20),
                RewardItem::booster(BoosterKind::Shuffle, 1),
            ],
        };
        assert_eq!(resource.coin_price(), 120);
        assert_eq!(
            resource.key(),
            Some((ResourceKind::Booster, BoosterKind::Timer))
        );
    }

    #[test]
    fn iap_without_bundle_id_has_no_key() {
        let iap = IapConfig {
            bundle_id: "  ".into(),
            ..IapConfig::default()
        };
        assert_eq!(iap.key(), None);
    }

    #[test]
    fn level_fields_use_editor_names() {
        let level: LevelConfig = serde_json::from_str(
            r#"{"levelID": 3, "grillNum": 4, "conceptType": "BEACH",
                "grillRecords": [{"grillId": 0, "foodList": [1, 2, 2]}, {"grillId": 1, "foodList": [3]}]}"#,
        )
        .unwrap();
        assert_eq!(level.key(), Some(3));
        assert_eq!(level.concept_type, ConceptKind::Beach);
        assert_eq!(level.placed_food(), 4);
    }
}
