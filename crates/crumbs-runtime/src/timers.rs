//! Deadline-driven timed subsystems: fever expiry, restock, passive income
//! and the save schedule.
//!
//! Nothing here owns a real timer. Each subsystem stores its next deadline and
//! [`Game::advance`] applies every one that has passed, in a fixed order:
//! fever expiry, restock, passive income, then achievement evaluation.

use crate::events::GameEvent;
use crate::machine::Game;
use crumbs_core::{GameConfig, Millis, PlayerState};
use crumbs_econ::{passive_yield_per_second, restock_interval_ms, restock_range, total_cps};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

/// An active fever, keyed by the activation that started it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FeverWindow {
    pub generation: u64,
    pub ends_at: Millis,
}

#[derive(Clone, Debug)]
pub(crate) struct Timers {
    pub(crate) next_restock_at: Millis,
    pub(crate) next_passive_at: Millis,
    pub(crate) next_autosave_at: Millis,
    /// A significant transition asked for a save on the next flush.
    pub(crate) save_requested: bool,
    /// Debounced save deadline (achievement unlocks).
    pub(crate) save_debounced_at: Option<Millis>,
}

impl Timers {
    pub(crate) fn start(state: &PlayerState, config: &GameConfig, now: Millis) -> Self {
        Self {
            next_restock_at: now.saturating_add(restock_interval_ms(state)),
            next_passive_at: now.saturating_add(config.passive_tick_ms),
            next_autosave_at: now.saturating_add(config.autosave_interval_ms),
            save_requested: false,
            save_debounced_at: None,
        }
    }
}

impl Game {
    /// Apply every timed subsystem whose deadline is at or before `now`.
    ///
    /// A no-op once the game has stopped.
    pub fn advance(&mut self, now: Millis) {
        if self.stopped {
            return;
        }
        if let Some(window) = self.fever {
            self.fire_fever_timer(window.generation, now);
        }
        self.restock_if_due(now);
        self.passive_tick_if_due(now);
        self.check_achievements(now);
    }

    /// Fever expiry callback for activation `generation`.
    ///
    /// Clears fever only if `generation` is still the active one and its
    /// deadline has passed; a stale or early firing changes nothing.
    /// Returns whether fever ended.
    pub fn fire_fever_timer(&mut self, generation: u64, now: Millis) -> bool {
        match self.fever {
            Some(w) if w.generation == generation && now >= w.ends_at => {
                self.fever = None;
                info!(generation, "fever ended");
                self.events.push(GameEvent::FeverEnded { generation });
                true
            }
            _ => false,
        }
    }

    fn restock_if_due(&mut self, now: Millis) {
        if now < self.timers.next_restock_at {
            return;
        }
        let (lo, hi) = restock_range(&self.state);
        self.stock = self.rolls.pick(lo, hi);
        let next = now.saturating_add(restock_interval_ms(&self.state));
        self.timers.next_restock_at = next;
        debug!(stock = self.stock, next_restock_at = next, "restocked");
        self.events.push(GameEvent::Restocked {
            stock: self.stock,
            next_restock_at: next,
        });
    }

    fn passive_tick_if_due(&mut self, now: Millis) {
        if now < self.timers.next_passive_at {
            return;
        }
        // One credit per due tick; missed ticks are not back-filled.
        let tick_ms = self.config.passive_tick_ms;
        self.timers.next_passive_at = now.saturating_add(tick_ms);
        if total_cps(&self.state) <= Decimal::ZERO {
            return;
        }
        let amount = passive_yield_per_second(&self.state, self.is_fever_active())
            .checked_mul(Decimal::from(tick_ms))
            .map_or(Decimal::MAX, |scaled| scaled / Decimal::from(1_000));
        self.credit(amount);
        debug!(%amount, "passive income");
    }

    /// Milliseconds until the next restock.
    pub fn restock_in_ms(&self, now: Millis) -> Millis {
        self.timers.next_restock_at.saturating_sub(now)
    }

    /// Milliseconds of fever left, 0 when inactive.
    pub fn fever_remaining_ms(&self, now: Millis) -> Millis {
        self.fever.map_or(0, |w| w.ends_at.saturating_sub(now))
    }

    pub(crate) fn request_save(&mut self) {
        self.timers.save_requested = true;
    }

    /// Schedule a save `save_debounce_ms` from now unless one is already sooner.
    pub(crate) fn request_debounced_save(&mut self, now: Millis) {
        let at = now.saturating_add(self.config.save_debounce_ms);
        self.timers.save_debounced_at = Some(match self.timers.save_debounced_at {
            Some(existing) => existing.min(at),
            None => at,
        });
    }

    /// Whether a save should be written at `now`: an immediate request, an
    /// elapsed debounce, or the periodic autosave.
    pub fn save_due(&self, now: Millis) -> bool {
        self.timers.save_requested
            || self.timers.save_debounced_at.is_some_and(|at| now >= at)
            || now >= self.timers.next_autosave_at
    }

    /// Record a save attempt and restart the autosave period.
    pub(crate) fn note_save(&mut self, now: Millis, result: Result<(), String>) {
        self.timers.save_requested = false;
        self.timers.save_debounced_at = None;
        self.timers.next_autosave_at = now.saturating_add(self.config.autosave_interval_ms);
        match result {
            Ok(()) => {
                self.last_save_failed = false;
                self.events.push(GameEvent::Saved { at: now });
            }
            Err(reason) => {
                self.last_save_failed = true;
                self.events.push(GameEvent::SaveFailed { reason });
            }
        }
    }
}
