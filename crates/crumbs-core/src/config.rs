//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// How newly unlocked achievements are surfaced when several unlock at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Every newly unlocked achievement produces a notification.
    #[default]
    All,
    /// Only the last achievement of an evaluation pass is announced.
    LastOnly,
}

/// Game session configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for the roll source; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Event loop poll period in milliseconds.
    pub poll_interval_ms: u64,
    /// Passive income period in milliseconds.
    pub passive_tick_ms: u64,
    /// Periodic autosave period in milliseconds.
    pub autosave_interval_ms: u64,
    /// Delay between an achievement unlock and its save.
    pub save_debounce_ms: u64,
    pub achievement_notify: NotifyPolicy,
    /// Key of the save slot in the store.
    pub storage_key: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            poll_interval_ms: 1_000,
            passive_tick_ms: 1_000,
            autosave_interval_ms: 5_000,
            save_debounce_ms: 500,
            achievement_notify: NotifyPolicy::All,
            storage_key: "dujjonequ_save".to_string(),
        }
    }
}
