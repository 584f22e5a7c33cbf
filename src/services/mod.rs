/// Debounce loop that writes dirty records in the background.
pub mod flush_worker;
/// Heart regeneration over elapsed time.
pub mod health_service;
/// Load, save and default-reset of records per category.
pub mod persistence;
/// Reward batches, daily rewards and one-time level rewards.
pub mod reward_service;
