use crate::events::GameEvent;
use crate::rng::{RollSource, SeededRolls};
use crate::timers::{FeverWindow, Timers};
use crate::ActionError;
use crumbs_core::catalog::{FEVER_DURATION_MS, FEVER_GAUGE_MAX, FEVER_GAUGE_PER_TAP, MAX_MASTERY_STARS};
use crumbs_core::{GameConfig, Millis, PlayerState};
use crumbs_econ::{
    click_yield, current_max_stock, effective_success_rate, helper_cost_for, mastery_cost_for,
    next_level, prestige_reward, upgrade_cost_for,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Result of an upgrade attempt that passed its preconditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// `level` is now the current level.
    Succeeded { level: u32 },
    /// The roll for `level` missed.
    Failed { level: u32 },
}

/// The progression state machine.
///
/// Owns the player state plus the session-only stock and fever state.
/// Every intent either applies completely or returns an [`ActionError`]
/// without touching anything.
pub struct Game {
    pub(crate) state: PlayerState,
    pub(crate) stock: u32,
    pub(crate) fever: Option<FeverWindow>,
    pub(crate) fever_generation: u64,
    pub(crate) timers: Timers,
    pub(crate) rolls: Box<dyn RollSource>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) config: GameConfig,
    pub(crate) last_save_failed: bool,
    pub(crate) stopped: bool,
}

impl Game {
    /// Start a game at `now` with a full stock.
    pub fn new(state: PlayerState, config: GameConfig, rolls: Box<dyn RollSource>, now: Millis) -> Self {
        let stock = current_max_stock(&state);
        let timers = Timers::start(&state, &config, now);
        Self {
            state,
            stock,
            fever: None,
            fever_generation: 0,
            timers,
            rolls,
            events: Vec::new(),
            config,
            last_save_failed: false,
            stopped: false,
        }
    }

    /// Replace the whole run with `state`, keeping the roll source and config.
    pub(crate) fn restart(&mut self, state: PlayerState, now: Millis) {
        self.stock = current_max_stock(&state);
        self.timers = Timers::start(&state, &self.config, now);
        self.state = state;
        self.fever = None;
        self.fever_generation += 1;
        self.events.clear();
        self.last_save_failed = false;
    }

    /// Like [`Game::new`] with rolls drawn from `config.rng_seed`.
    pub fn seeded(state: PlayerState, config: GameConfig, now: Millis) -> Self {
        let rolls = SeededRolls::from_seed_opt(config.rng_seed);
        Self::new(state, config, Box::new(rolls), now)
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn fever(&self) -> Option<FeverWindow> {
        self.fever
    }

    pub fn is_fever_active(&self) -> bool {
        self.fever.is_some()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the most recent save attempt failed.
    pub fn last_save_failed(&self) -> bool {
        self.last_save_failed
    }

    /// Take all queued notifications.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Stop the game. Intents fail with [`ActionError::Stopped`] and
    /// [`Game::advance`] does nothing afterwards.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.fever = None;
            info!("game stopped");
        }
    }

    fn ensure_running(&self) -> Result<(), ActionError> {
        if self.stopped {
            Err(ActionError::Stopped)
        } else {
            Ok(())
        }
    }

    fn ensure_affordable(&self, cost: Decimal) -> Result<(), ActionError> {
        if self.state.money < cost {
            return Err(ActionError::InsufficientFunds {
                needed: cost,
                available: self.state.money,
            });
        }
        Ok(())
    }

    /// Add `amount` to money and lifetime earnings as one update.
    pub(crate) fn credit(&mut self, amount: Decimal) {
        self.state.money = self.state.money.saturating_add(amount);
        self.state.stats.total_money_earned = self.state.stats.total_money_earned.saturating_add(amount);
    }

    /// Tap the dessert at screen position (`x`, `y`). Returns the crumbs earned.
    pub fn tap(&mut self, now: Millis, x: f32, y: f32) -> Result<Decimal, ActionError> {
        self.ensure_running()?;
        let amount = click_yield(&self.state, self.is_fever_active());
        self.credit(amount);
        self.state.stats.total_clicks = self.state.stats.total_clicks.saturating_add(1);
        self.events.push(GameEvent::Tapped { amount, x, y });
        debug!(%amount, clicks = self.state.stats.total_clicks, "tap");

        if self.fever.is_none() {
            self.state.fever_gauge += FEVER_GAUGE_PER_TAP;
            if self.state.fever_gauge >= FEVER_GAUGE_MAX {
                self.state.fever_gauge = 0;
                self.start_fever(now);
            }
        }
        self.check_achievements(now);
        Ok(amount)
    }

    fn start_fever(&mut self, now: Millis) {
        self.fever_generation += 1;
        let window = FeverWindow {
            generation: self.fever_generation,
            ends_at: now.saturating_add(FEVER_DURATION_MS),
        };
        self.fever = Some(window);
        info!(generation = window.generation, ends_at = window.ends_at, "fever started");
        self.events.push(GameEvent::FeverStarted {
            generation: window.generation,
            ends_at: window.ends_at,
        });
    }

    /// Try to reach the next level.
    ///
    /// Preconditions are checked in order: not at the final level, enough
    /// crumbs, stock left. Once they pass the cost and one stock unit are
    /// spent whatever the roll says.
    pub fn attempt_upgrade(&mut self, now: Millis) -> Result<UpgradeOutcome, ActionError> {
        self.ensure_running()?;
        let target = next_level(&self.state).ok_or(ActionError::MaxLevelReached)?;
        self.ensure_affordable(target.base_cost)?;
        if self.stock == 0 {
            return Err(ActionError::OutOfStock);
        }

        self.state.money -= target.base_cost;
        self.stock = self.stock.saturating_sub(1);
        let rate = effective_success_rate(target, &self.state);
        let roll = self.rolls.roll();

        let outcome = if roll <= rate {
            self.state.current_level = target.level;
            self.state.unlocked_levels.insert(target.level);
            info!(level = target.level, roll, rate, "upgrade succeeded");
            self.events.push(GameEvent::UpgradeSucceeded { level: target.level });
            self.request_save();
            UpgradeOutcome::Succeeded { level: target.level }
        } else {
            self.state.stats.failed_upgrades = self.state.stats.failed_upgrades.saturating_add(1);
            debug!(level = target.level, roll, rate, "upgrade failed");
            self.events.push(GameEvent::UpgradeFailed { level: target.level });
            UpgradeOutcome::Failed { level: target.level }
        };
        self.check_achievements(now);
        Ok(outcome)
    }

    /// Buy one level of upgrade `id`. Returns the new upgrade level.
    pub fn buy_upgrade(&mut self, id: &str, now: Millis) -> Result<u32, ActionError> {
        self.ensure_running()?;
        let cost = upgrade_cost_for(&self.state, id)?
            .ok_or_else(|| ActionError::AlreadyMaxed(id.to_string()))?;
        self.ensure_affordable(cost)?;

        let owned = self.state.upgrade_level(id);
        self.state.money -= cost;
        self.state.upgrades.insert(id.to_string(), owned + 1);
        info!(upgrade = id, level = owned + 1, %cost, "upgrade bought");
        self.request_save();
        self.check_achievements(now);
        Ok(owned + 1)
    }

    /// Hire one helper `id`. Returns the new owned count.
    pub fn buy_helper(&mut self, id: &str, now: Millis) -> Result<u64, ActionError> {
        self.ensure_running()?;
        let cost = helper_cost_for(&self.state, id)?;
        self.ensure_affordable(cost)?;

        let count = self.state.helper_count(id).saturating_add(1);
        self.state.money -= cost;
        self.state.helpers.insert(id.to_string(), count);
        info!(helper = id, count, %cost, "helper hired");
        self.request_save();
        self.check_achievements(now);
        Ok(count)
    }

    /// Add a mastery star to an unlocked `level`. Returns the new star count.
    pub fn upgrade_mastery(&mut self, level: u32, now: Millis) -> Result<u8, ActionError> {
        self.ensure_running()?;
        let cost = mastery_cost_for(level)?;
        if !self.state.is_unlocked(level) {
            return Err(ActionError::LevelLocked(level));
        }
        let stars = self.state.stars(level);
        if stars >= MAX_MASTERY_STARS {
            return Err(ActionError::AlreadyMaxed(format!("mastery of level {level}")));
        }
        self.ensure_affordable(cost)?;

        self.state.money -= cost;
        self.state.mastery.insert(level, stars + 1);
        info!(level, stars = stars + 1, %cost, "mastery star bought");
        self.request_save();
        self.check_achievements(now);
        Ok(stars + 1)
    }

    /// Trade the current run for prestige tickets. Returns the tickets granted.
    ///
    /// Lifetime stats, achievements, mastery and tickets carry over.
    pub fn prestige(&mut self, now: Millis) -> Result<u64, ActionError> {
        self.ensure_running()?;
        let reward = prestige_reward(&self.state);
        if reward == 0 {
            return Err(ActionError::NoPrestigeReward);
        }

        let s = &mut self.state;
        s.prestige_tickets = s.prestige_tickets.saturating_add(reward);
        s.money = Decimal::ZERO;
        s.current_level = 1;
        s.unlocked_levels = BTreeSet::from([1]);
        s.upgrades = BTreeMap::new();
        s.helpers = BTreeMap::new();
        s.fever_gauge = 0;
        let tickets = s.prestige_tickets;
        // Stock is session-only; never leave it above the reset ceiling.
        self.stock = self.stock.min(current_max_stock(&self.state));

        info!(reward, tickets, "prestige");
        self.events.push(GameEvent::Prestiged { reward, tickets });
        self.request_save();
        self.check_achievements(now);
        Ok(reward)
    }

    /// Mark the tutorial as done. Idempotent.
    pub fn complete_tutorial(&mut self) -> Result<(), ActionError> {
        self.ensure_running()?;
        if !self.state.tutorial_completed {
            self.state.tutorial_completed = true;
            self.request_save();
        }
        Ok(())
    }
}
