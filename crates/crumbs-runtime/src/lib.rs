#![deny(warnings)]

//! Game runtime: the progression state machine, its timed subsystems and the
//! achievement evaluator.
//!
//! [`Game`] exclusively owns the [`PlayerState`] and exposes one method per
//! player intent. Timers are deadline-driven: callers pass the current time
//! to [`Game::advance`] from a coarse poll loop. [`Session`] wires a game to a
//! save store and applies the save schedule.
//!
//! [`PlayerState`]: crumbs_core::PlayerState

pub mod achievements;
pub mod autoplay;
mod events;
mod machine;
pub mod rng;
mod session;
mod timers;
mod view;

pub use events::GameEvent;
pub use machine::{Game, UpgradeOutcome};
pub use rng::{RollSource, ScriptedRolls, SeededRolls};
pub use session::Session;
pub use timers::FeverWindow;
pub use view::{AchievementRow, HelperRow, HudView, MasteryRow, NextLevelView, UpgradeRow};

use crumbs_econ::EconError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a player intent was rejected. A rejected intent never mutates state.
#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error("out of stock")]
    OutOfStock,
    #[error("already at the final level")]
    MaxLevelReached,
    /// Upgrade or mastery already at its cap.
    #[error("{0} is already maxed")]
    AlreadyMaxed(String),
    #[error("level {0} is locked")]
    LevelLocked(u32),
    #[error("no prestige reward available")]
    NoPrestigeReward,
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
    #[error("unknown helper: {0}")]
    UnknownHelper(String),
    /// The session was shut down.
    #[error("game has stopped")]
    Stopped,
}

impl From<EconError> for ActionError {
    fn from(e: EconError) -> Self {
        match e {
            EconError::UnknownUpgrade(id) => ActionError::UnknownUpgrade(id),
            EconError::UnknownHelper(id) => ActionError::UnknownHelper(id),
            EconError::UnknownLevel(level) => ActionError::LevelLocked(level),
        }
    }
}
