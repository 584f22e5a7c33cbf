//! Read-only design data: levels, boosters, foods, store products and reward tables.
//!
//! The catalog is loaded once from a single JSON document, validated, and
//! then only queried. Every lookup returns `None` for unknown keys.

pub mod records;
/// Aggregated views over reward lists.
pub mod summary;
/// Keyed record tables with a lazy index.
pub mod table;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::dao::models::{BoosterKind, ResourceKind};

pub use self::records::{
    BoosterConfig, ConceptConfig, ConceptKind, DailyRewardConfig, EventRewardConfig,
    EventRewardKind, FoodConfig, FoodKind, GalleryRewardBand, GalleryRewardConfig, GrillConfig,
    IapConfig, IapKind, LevelConfig, ResourceConfig,
};
pub use self::summary::RewardSummary;
pub use self::table::{Keyed, Table};

/// Price used for a booster the catalog does not list.
pub const DEFAULT_BOOSTER_PRICE: u32 = 150;

/// Errors raised while loading the catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog document is not valid JSON")]
    Parse(#[source] serde_json::Error),
    #[error("catalog document failed validation: {0}")]
    Invalid(#[source] ValidationErrors),
}

/// Raw document layout, validated before it is indexed.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
struct CatalogDocument {
    #[validate(nested)]
    levels: Vec<LevelConfig>,
    #[validate(nested)]
    boosters: Vec<BoosterConfig>,
    #[validate(nested)]
    foods: Vec<FoodConfig>,
    #[validate(nested)]
    iap: Vec<IapConfig>,
    #[validate(nested)]
    resources: Vec<ResourceConfig>,
    #[validate(nested)]
    concepts: Vec<ConceptConfig>,
    #[validate(nested)]
    daily_rewards: Vec<DailyRewardConfig>,
    #[validate(nested)]
    event_rewards: Vec<EventRewardConfig>,
    #[validate(nested)]
    gallery: GalleryRewardConfig,
}

/// Indexed design data.
#[derive(Debug)]
pub struct ConfigCatalog {
    levels: Table<LevelConfig>,
    boosters: Table<BoosterConfig>,
    foods: Table<FoodConfig>,
    iap: Table<IapConfig>,
    resources: Table<ResourceConfig>,
    concepts: Table<ConceptConfig>,
    daily_rewards: Table<DailyRewardConfig>,
    event_rewards: Table<EventRewardConfig>,
    gallery: GalleryRewardConfig,
}

impl Default for ConfigCatalog {
    fn default() -> Self {
        Self::from_document(CatalogDocument::default())
    }
}

impl ConfigCatalog {
    /// Read, parse and validate the catalog at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            levels = catalog.levels.len(),
            boosters = catalog.boosters.len(),
            foods = catalog.foods.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(raw).map_err(CatalogError::Parse)?;
        document.validate().map_err(CatalogError::Invalid)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: CatalogDocument) -> Self {
        Self {
            levels: Table::new("levels", document.levels),
            boosters: Table::new("boosters", document.boosters),
            foods: Table::new("foods", document.foods),
            iap: Table::new("iap", document.iap),
            resources: Table::new("resources", document.resources),
            concepts: Table::new("concepts", document.concepts),
            daily_rewards: Table::new("daily_rewards", document.daily_rewards),
            event_rewards: Table::new("event_rewards", document.event_rewards),
            gallery: document.gallery,
        }
    }

    /// Level layout by id.
    pub fn level(&self, id: u32) -> Option<&LevelConfig> {
        self.levels.get(&id)
    }

    /// Number of level records in the document.
    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }

    /// Booster definition by kind.
    pub fn booster(&self, kind: BoosterKind) -> Option<&BoosterConfig> {
        self.boosters.get(&kind)
    }

    /// Food definition by kind.
    pub fn food(&self, kind: FoodKind) -> Option<&FoodConfig> {
        self.foods.get(&kind)
    }

    /// Number of distinct foods.
    pub fn total_foods(&self) -> usize {
        self.foods.len()
    }

    /// In-app purchase bundle by store id.
    pub fn iap(&self, bundle_id: &str) -> Option<&IapConfig> {
        self.iap.get(&bundle_id.trim().to_owned())
    }

    /// Shop entry for a resource, boosters keyed by their own kind.
    pub fn resource(&self, kind: ResourceKind, booster: BoosterKind) -> Option<&ResourceConfig> {
        let booster = if kind == ResourceKind::Booster {
            booster
        } else {
            BoosterKind::None
        };
        self.resources.get(&(kind, booster))
    }

    /// Coin price of one `kind` booster, or [`DEFAULT_BOOSTER_PRICE`] when unlisted.
    pub fn booster_price(&self, kind: BoosterKind) -> u32 {
        self.resource(ResourceKind::Booster, kind)
            .map_or(DEFAULT_BOOSTER_PRICE, ResourceConfig::coin_price)
    }

    /// Visual concept by kind.
    pub fn concept(&self, kind: ConceptKind) -> Option<&ConceptConfig> {
        self.concepts.get(&kind)
    }

    /// Food record as served in `concept`.
    pub fn concept_food(&self, concept: ConceptKind, food: FoodKind) -> Option<&FoodConfig> {
        self.concept(concept)?.food(food)
    }

    /// Rewards for a daily-login day.
    pub fn daily_reward(&self, day: u32) -> Option<&DailyRewardConfig> {
        self.daily_rewards.get(&day)
    }

    /// Rewards attached to an in-game event.
    pub fn event_rewards(&self, kind: EventRewardKind) -> Option<&EventRewardConfig> {
        self.event_rewards.get(&kind)
    }

    /// Gallery unlock bands.
    pub fn gallery(&self) -> &GalleryRewardConfig {
        &self.gallery
    }

    /// Replace the level table, dropping its index.
    pub fn replace_levels(&mut self, levels: Vec<LevelConfig>) {
        self.levels.replace(levels);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::dao::models::RewardItem;

    const DOCUMENT: &str = r#"{
        "levels": [
            {"levelID": 0, "grillNum": 3, "duration": 90.0, "conceptType": "CLASSIC"},
            {"levelID": 1, "grillNum": 4, "duration": 80.0},
            {"levelID": -4, "grillNum": 9},
            {"levelID": 1, "grillNum": 5, "duration": 75.0}
        ],
        "boosters": [
            {"boosterType": "TIMER", "unlockLevel": 3, "boosterName": "Timer"},
            {"boosterType": "SHUFFLE", "unlockLevel": 5, "boosterName": "Shuffle"}
        ],
        "foods": [
            {"type": 1, "displayName": "Sausage", "baseScore": 10},
            {"type": 2, "displayName": "Corn", "baseScore": 5}
        ],
        "iap": [
            {"bundleId": "", "bundleName": "Broken"},
            {"bundleId": "com.grill.starter", "bundleName": "Starter", "iapType": "BUNDLE",
             "price": "$0.99", "rewardList": [{"resourceType": "COIN", "amount": 500}]}
        ],
        "resources": [
            {"resourceType": "BOOSTER", "boosterType": "TIMER",
             "priceInResources": [{"resourceType": "COIN", "amount": 200}]},
            {"resourceType": "BOOSTER", "boosterType": "SHUFFLE",
             "priceInResources": [{"resourceType": "COIN", "amount": 120}]},
            {"resourceType": "COIN", "description": "Coins"}
        ],
        "concepts": [
            {"conceptType": "BEACH", "foodData": [{"type": 7, "displayName": "Shrimp", "baseScore": 12}]}
        ],
        "dailyRewards": [
            {"dayId": 0, "rewards": [{"resourceType": "COIN", "amount": 100}]},
            {"dayId": 1, "rewards": [{"resourceType": "BOOSTER", "boosterType": "MAGIC_PICK", "amount": 1}]}
        ],
        "eventRewards": [
            {"eventRewardType": "WIN_LEVEL", "rewards": [{"resourceType": "COIN", "amount": 20}]}
        ],
        "gallery": {"items": [{"startLevel": 10, "endLevel": 30, "requiredNumberOfLevel": 5}]}
    }"#;

    fn catalog() -> ConfigCatalog {
        ConfigCatalog::from_json(DOCUMENT).unwrap()
    }

    #[test]
    fn levels_skip_invalid_ids_and_keep_the_last_duplicate() {
        let catalog = catalog();
        assert_eq!(catalog.total_levels(), 4);
        assert_eq!(catalog.level(0).map(|l| l.concept_type), Some(ConceptKind::Classic));
        assert_eq!(catalog.level(1).map(|l| l.grill_num), Some(5));
        assert!(catalog.level(99).is_none());
    }

    #[test]
    fn lookups_by_kind() {
        let catalog = catalog();
        assert_eq!(catalog.booster(BoosterKind::Shuffle).map(|b| b.unlock_level), Some(5));
        assert!(catalog.booster(BoosterKind::MagicPick).is_none());
        assert_eq!(catalog.food(FoodKind(2)).map(|f| f.base_score), Some(5));
        assert_eq!(
            catalog
                .concept_food(ConceptKind::Beach, FoodKind(7))
                .map(|f| f.display_name.as_str()),
            Some("Shrimp")
        );
        assert!(catalog.concept_food(ConceptKind::Farm, FoodKind(7)).is_none());
        assert!(catalog.resource(ResourceKind::Coin, BoosterKind::Timer).is_some());
    }

    #[test]
    fn iap_records_without_bundle_id_are_unreachable() {
        let catalog = catalog();
        let starter = catalog.iap("com.grill.starter").unwrap();
        assert_eq!(starter.reward_list, vec![RewardItem::coin(500)]);
        assert!(catalog.iap("").is_none());
    }

    #[test]
    fn booster_price_falls_back_when_unlisted() {
        let catalog = catalog();
        assert_eq!(catalog.booster_price(BoosterKind::Timer), 200);
        assert_eq!(catalog.booster_price(BoosterKind::Shuffle), 120);
        assert_eq!(catalog.booster_price(BoosterKind::MagicPick), DEFAULT_BOOSTER_PRICE);
    }

    #[test]
    fn reward_tables() {
        let catalog = catalog();
        assert_eq!(catalog.daily_reward(0).map(|d| d.rewards.len()), Some(1));
        assert!(catalog.daily_reward(6).is_none());
        assert!(catalog.event_rewards(EventRewardKind::WinLevel).is_some());
        assert!(catalog.event_rewards(EventRewardKind::WatchAdsWinLevel).is_none());
        assert_eq!(catalog.gallery().current_progress(12), 0.6);
    }

    #[test]
    fn replacing_levels_rebuilds_the_index() {
        let mut catalog = catalog();
        catalog.replace_levels(vec![LevelConfig {
            level_id: 42,
            ..LevelConfig::default()
        }]);
        assert!(catalog.level(0).is_none());
        assert!(catalog.level(42).is_some());
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let negative_duration = r#"{"levels": [{"levelID": 0, "duration": -1.0}]}"#;
        assert!(matches!(
            ConfigCatalog::from_json(negative_duration),
            Err(CatalogError::Invalid(_))
        ));
        assert!(matches!(
            ConfigCatalog::from_json("{levels"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn empty_document_is_an_empty_catalog() {
        let catalog = ConfigCatalog::from_json("{}").unwrap();
        assert_eq!(catalog.total_levels(), 0);
        assert_eq!(catalog.booster_price(BoosterKind::Timer), DEFAULT_BOOSTER_PRICE);
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let catalog = ConfigCatalog::load(file.path()).await.unwrap();
        assert_eq!(catalog.total_foods(), 2);

        let missing = ConfigCatalog::load(file.path().with_extension("missing")).await;
        assert!(matches!(missing, Err(CatalogError::Read { .. })));
    }
}
