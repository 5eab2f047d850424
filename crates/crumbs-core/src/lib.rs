#![deny(warnings)]

//! Core domain models and invariants for Crumbs.
//!
//! This crate defines the static content catalog (levels, upgrades, helpers,
//! achievements), the persisted [`PlayerState`] aggregate, and validation
//! helpers that guarantee its invariants. Everything here is plain data; the
//! formulas live in `crumbs-econ` and the transitions in `crumbs-runtime`.

pub mod catalog;
pub mod config;
pub mod state;

pub use catalog::{
    Achievement, AchievementContext, HelperDef, LevelData, RecipeStage, UpgradeDef, UpgradeKind,
    VisualParams, MAX_LEVEL,
};
pub use config::{GameConfig, NotifyPolicy};
pub use state::{validate_player_state, Inventory, PlayerState, Stats};

use thiserror::Error;

/// Milliseconds since the Unix epoch. All timed logic is expressed in this unit.
pub type Millis = u64;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Level outside [1, MAX_LEVEL].
    #[error("level {0} is out of range")]
    LevelOutOfRange(u32),
    /// Money must be non-negative.
    #[error("negative money is invalid")]
    NegativeMoney,
    /// Level 1 must always be unlocked.
    #[error("unlocked levels must contain level 1")]
    MissingBaseLevel,
    /// The current level must be part of the unlocked set.
    #[error("current level {0} is not unlocked")]
    CurrentLevelLocked(u32),
    /// Upgrade id not present in the catalog.
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
    /// Upgrade level exceeds its catalog cap.
    #[error("upgrade {id} at level {level} exceeds max {max}")]
    UpgradeOverMax { id: String, level: u32, max: u32 },
    /// Helper id not present in the catalog.
    #[error("unknown helper: {0}")]
    UnknownHelper(String),
    /// Mastery stars exceed the per-level cap.
    #[error("mastery for level {level} has {stars} stars")]
    MasteryOverMax { level: u32, stars: u8 },
    /// Fever gauge outside [0, 100].
    #[error("fever gauge {0} is out of range")]
    GaugeOutOfRange(u32),
    /// Catalog ids must be unique.
    #[error("duplicate catalog id: {0}")]
    DuplicateId(String),
    /// Catalog levels must be numbered 1..=MAX_LEVEL in order.
    #[error("catalog levels are not contiguous at {0}")]
    NonContiguousLevels(u32),
    /// Success rate must be within [0, 1].
    #[error("success rate for level {0} must be within [0,1]")]
    InvalidSuccessRate(u32),
    /// Cost multipliers must be >= 1 so prices never shrink.
    #[error("cost multiplier for {0} must be >= 1")]
    InvalidCostMultiplier(String),
}
