//! Headless greedy player used by `--simulate` and the benches.
//!
//! Once per simulated second the bot advances timers, taps, then spends:
//! prestige when it pays at the final level, upgrade attempts while stock and
//! money allow, then the cheapest affordable upgrade or helper, repeatedly.
//! Queued events are discarded at the end of each second.

use crate::machine::{Game, UpgradeOutcome};
use crumbs_core::Millis;
use crumbs_econ::prestige_reward;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// Purchases per simulated second, so a rich state cannot spin forever.
const MAX_PURCHASES_PER_SECOND: usize = 64;

#[derive(Clone, Copy, Debug)]
pub struct AutoplayConfig {
    pub seconds: u64,
    pub taps_per_second: u32,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            seconds: 3_600,
            taps_per_second: 5,
        }
    }
}

/// KPIs of a headless run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub seconds: u64,
    pub taps: u64,
    pub upgrades_succeeded: u64,
    pub upgrades_failed: u64,
    pub upgrades_bought: u64,
    pub helpers_hired: u64,
    pub mastery_stars: u64,
    pub prestiges: u64,
    pub final_level: u32,
    pub final_money: Decimal,
    pub total_earned: Decimal,
    pub prestige_tickets: u64,
    pub achievements: usize,
}

enum Purchase {
    Upgrade(&'static str),
    Helper(&'static str),
}

/// Play `game` from `start` for `cfg.seconds` simulated seconds.
pub fn run(game: &mut Game, start: Millis, cfg: &AutoplayConfig) -> RunSummary {
    let mut summary = RunSummary::default();
    // Rejected only when stopped, which ends the run below anyway.
    let _ = game.complete_tutorial();

    for second in 1..=cfg.seconds {
        if game.is_stopped() {
            break;
        }
        let now = start.saturating_add(second.saturating_mul(1_000));
        game.advance(now);

        for i in 0..cfg.taps_per_second {
            let x = (i % 7) as f32 * 10.0;
            if game.tap(now, x, 0.0).is_ok() {
                summary.taps += 1;
            }
        }

        if game.state().current_level >= crumbs_core::MAX_LEVEL
            && prestige_reward(game.state()) > 0
            && game.prestige(now).is_ok()
        {
            summary.prestiges += 1;
        }

        while let Ok(outcome) = game.attempt_upgrade(now) {
            match outcome {
                UpgradeOutcome::Succeeded { .. } => summary.upgrades_succeeded += 1,
                UpgradeOutcome::Failed { .. } => summary.upgrades_failed += 1,
            }
        }

        for _ in 0..MAX_PURCHASES_PER_SECOND {
            let bought = match cheapest_affordable(game, now) {
                Some(Purchase::Upgrade(id)) => game.buy_upgrade(id, now).map(|_| summary.upgrades_bought += 1),
                Some(Purchase::Helper(id)) => game.buy_helper(id, now).map(|_| summary.helpers_hired += 1),
                None => break,
            };
            if bought.is_err() {
                break;
            }
        }

        if game.state().current_level >= crumbs_core::MAX_LEVEL {
            let levels: Vec<u32> = game.state().unlocked_levels.iter().copied().collect();
            for level in levels {
                if game.upgrade_mastery(level, now).is_ok() {
                    summary.mastery_stars += 1;
                }
            }
        }

        // Nobody listens to a headless run.
        game.drain_events();
    }

    let s = game.state();
    summary.seconds = cfg.seconds;
    summary.final_level = s.current_level;
    summary.final_money = s.money;
    summary.total_earned = s.stats.total_money_earned;
    summary.prestige_tickets = s.prestige_tickets;
    summary.achievements = s.achievements.len();
    debug!(?summary, "autoplay finished");
    summary
}

fn cheapest_affordable(game: &Game, now: Millis) -> Option<Purchase> {
    let view = game.view(now);
    let upgrades = view
        .upgrades
        .iter()
        .filter_map(|u| u.cost.map(|c| (c, Purchase::Upgrade(u.id))));
    let helpers = view
        .helpers
        .iter()
        .map(|h| (h.cost, Purchase::Helper(h.id)));
    upgrades
        .chain(helpers)
        .filter(|(cost, _)| *cost <= view.money)
        .min_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, p)| p)
}
