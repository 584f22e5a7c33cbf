use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

use crate::{
    dao::models::{Category, PlayerState, ResourceKind},
    state::SaveContext,
};

/// Advance heart regeneration by `delta_secs`, flushing and announcing the result once.
///
/// Returns `true` when the record changed. A `Heart` event is published only
/// when health itself moved.
pub async fn regenerate(context: &SaveContext, delta_secs: f64) -> bool {
    let (changed, before, after) = context
        .mutate_player(|player| {
            let before = player.health();
            (player.regenerate(delta_secs), before, player.health())
        })
        .await;
    announce(context, changed, before, after)
}

/// Regenerate for the wall-clock time since the last sync and stamp `now_unix`.
///
/// A clock that moved backwards counts as no elapsed time. A sync that only
/// moves the stamp is persisted without an event.
pub async fn sync(context: &SaveContext, now_unix: i64) -> bool {
    let (changed, before, after) = context
        .mutate_player(|player| {
            let before = player.health();
            (player.regenerate_since(now_unix), before, player.health())
        })
        .await;
    announce(context, changed, before, after)
}

fn announce(context: &SaveContext, changed: bool, before: u32, after: u32) -> bool {
    if changed {
        context.mark_dirty(Category::Player);
    }
    if before != after {
        debug!(health = after, "health regenerated");
        context.resources().publish(ResourceKind::Heart);
    }
    changed
}

/// Current wall-clock time as a unix timestamp.
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Time until the next heart, or `None` when health is full.
pub fn next_heart_in(player: &PlayerState) -> Option<Duration> {
    if player.is_full_health() {
        return None;
    }
    Some(Duration::from_secs_f64(
        player.remain_time_for_next_heart().max(0.0),
    ))
}
