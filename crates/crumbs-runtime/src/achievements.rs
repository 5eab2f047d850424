//! Achievement evaluation.
//!
//! Predicates are re-run in catalog order over every achievement the player
//! does not hold yet. Unlocks are append-only.

use crate::events::GameEvent;
use crate::machine::Game;
use crumbs_core::catalog::{self, Achievement};
use crumbs_core::{AchievementContext, Millis, NotifyPolicy, PlayerState};
use tracing::info;

/// Build the predicate input from the persisted state and session values.
pub fn context(state: &PlayerState, current_stock: u32, fever_active: bool) -> AchievementContext<'_> {
    AchievementContext {
        stats: &state.stats,
        current_level: state.current_level,
        prestige_tickets: state.prestige_tickets,
        mastery: &state.mastery,
        current_stock,
        fever_active,
    }
}

/// Achievements whose predicate holds but which are not unlocked yet, in
/// catalog order.
pub fn newly_met(ctx: &AchievementContext<'_>, unlocked: &[String]) -> Vec<&'static Achievement> {
    catalog::achievements()
        .iter()
        .filter(|a| !unlocked.iter().any(|id| id == a.id))
        .filter(|a| a.is_met(ctx))
        .collect()
}

/// The subset of a batch that should be announced under `policy`.
pub fn to_announce<'a>(
    batch: &'a [&'static Achievement],
    policy: NotifyPolicy,
) -> &'a [&'static Achievement] {
    match policy {
        NotifyPolicy::All => batch,
        NotifyPolicy::LastOnly => &batch[batch.len().saturating_sub(1)..],
    }
}

impl Game {
    /// Unlock every newly met achievement and schedule a debounced save.
    pub(crate) fn check_achievements(&mut self, now: Millis) {
        let batch = {
            let ctx = context(&self.state, self.stock, self.is_fever_active());
            newly_met(&ctx, &self.state.achievements)
        };
        if batch.is_empty() {
            return;
        }
        for a in &batch {
            info!(id = a.id, "achievement unlocked");
            self.state.achievements.push(a.id.to_string());
        }
        for a in to_announce(&batch, self.config.achievement_notify) {
            self.events.push(GameEvent::AchievementUnlocked {
                id: a.id,
                name: a.name,
                description: a.description,
                icon: a.icon,
            });
        }
        self.request_debounced_save(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRolls;
    use crumbs_core::GameConfig;

    const T0: u64 = 1_000;

    fn unlocked_ids(events: &[GameEvent]) -> Vec<&'static str> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::AchievementUnlocked { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn game_with_policy(state: PlayerState, policy: NotifyPolicy) -> Game {
        let config = GameConfig {
            achievement_notify: policy,
            ..GameConfig::default()
        };
        Game::new(state, config, Box::new(ScriptedRolls::default()), T0)
    }

    fn veteran() -> PlayerState {
        let mut s = PlayerState::default();
        s.stats.total_clicks = 99;
        s
    }

    #[test]
    fn batch_follows_catalog_order() {
        let mut s = PlayerState::default();
        s.stats.total_clicks = 100;
        let ctx = context(&s, 5, false);
        let ids: Vec<_> = newly_met(&ctx, &[]).iter().map(|a| a.id).collect();
        assert_eq!(ids, ["FIRST_TAP", "CLICK_10", "CLICK_100"]);

        let held = vec!["CLICK_10".to_string()];
        let ids: Vec<_> = newly_met(&ctx, &held).iter().map(|a| a.id).collect();
        assert_eq!(ids, ["FIRST_TAP", "CLICK_100"]);
    }

    #[test]
    fn all_policy_announces_every_unlock() {
        let mut g = game_with_policy(veteran(), NotifyPolicy::All);
        g.tap(T0, 0.0, 0.0).unwrap();
        assert_eq!(
            g.state().achievements,
            ["FIRST_TAP", "CLICK_10", "CLICK_100"]
        );
        assert_eq!(
            unlocked_ids(&g.drain_events()),
            ["FIRST_TAP", "CLICK_10", "CLICK_100"]
        );
    }

    #[test]
    fn last_only_policy_still_unlocks_everything() {
        let mut g = game_with_policy(veteran(), NotifyPolicy::LastOnly);
        g.tap(T0, 0.0, 0.0).unwrap();
        assert_eq!(g.state().achievements.len(), 3);
        assert_eq!(unlocked_ids(&g.drain_events()), ["CLICK_100"]);
    }

    #[test]
    fn unlock_schedules_debounced_save() {
        let mut g = game_with_policy(PlayerState::default(), NotifyPolicy::All);
        g.tap(T0, 0.0, 0.0).unwrap();
        assert!(!g.save_due(T0 + 499));
        assert!(g.save_due(T0 + 500));
    }

    #[test]
    fn sold_out_tracks_session_stock() {
        let mut g = game_with_policy(PlayerState::default(), NotifyPolicy::All);
        g.advance(T0);
        assert!(!g.state().has_achievement("SOLD_OUT"));
        g.stock = 0;
        g.advance(T0 + 1);
        assert!(g.state().has_achievement("SOLD_OUT"));
    }

    #[test]
    fn empty_batch_announces_nothing() {
        assert!(to_announce(&[], NotifyPolicy::LastOnly).is_empty());
        assert!(to_announce(&[], NotifyPolicy::All).is_empty());
    }
}
