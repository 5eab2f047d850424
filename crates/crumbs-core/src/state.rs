//! The persisted player aggregate.

use crate::catalog::{self, FEVER_GAUGE_MAX, MAX_LEVEL, MAX_MASTERY_STARS};
use crate::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Decorative ingredient counters. No operation consumes them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub chocolate: u64,
    pub pistachio: u64,
    pub gold_leaf: u64,
}

/// Lifetime counters. Prestige does not reset these.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_clicks: u64,
    pub total_money_earned: Decimal,
    pub failed_upgrades: u64,
}

/// Single source of truth for a player's progress.
///
/// Keys serialize in camelCase to stay compatible with existing saves.
/// `fever_gauge` is session-only and is never written out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    /// Current recipe level in [1, MAX_LEVEL].
    pub current_level: u32,
    /// Spendable crumbs (>= 0).
    pub money: Decimal,
    /// Levels reached at least once since the last prestige. Always contains 1.
    pub unlocked_levels: BTreeSet<u32>,
    pub inventory: Inventory,
    pub stats: Stats,
    /// Unlocked achievement ids in unlock order.
    pub achievements: Vec<String>,
    pub tutorial_completed: bool,
    /// Upgrade id -> purchased level.
    pub upgrades: BTreeMap<String, u32>,
    /// Helper id -> owned count.
    pub helpers: BTreeMap<String, u64>,
    #[serde(skip)]
    pub fever_gauge: u32,
    #[serde(default)]
    pub prestige_tickets: u64,
    /// Level -> mastery stars in [0, 3].
    #[serde(default)]
    pub mastery: BTreeMap<u32, u8>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_level: 1,
            money: Decimal::ZERO,
            unlocked_levels: BTreeSet::from([1]),
            inventory: Inventory::default(),
            stats: Stats::default(),
            achievements: Vec::new(),
            tutorial_completed: false,
            upgrades: BTreeMap::new(),
            helpers: BTreeMap::new(),
            fever_gauge: 0,
            prestige_tickets: 0,
            mastery: BTreeMap::new(),
        }
    }
}

impl PlayerState {
    /// Purchased level of an upgrade, 0 when never bought.
    pub fn upgrade_level(&self, id: &str) -> u32 {
        self.upgrades.get(id).copied().unwrap_or(0)
    }

    /// Owned count of a helper.
    pub fn helper_count(&self, id: &str) -> u64 {
        self.helpers.get(id).copied().unwrap_or(0)
    }

    /// Mastery stars earned on a level.
    pub fn stars(&self, level: u32) -> u8 {
        self.mastery.get(&level).copied().unwrap_or(0)
    }

    /// Sum of mastery stars across all levels.
    pub fn total_stars(&self) -> u32 {
        self.mastery.values().map(|&s| u32::from(s)).sum()
    }

    pub fn is_unlocked(&self, level: u32) -> bool {
        self.unlocked_levels.contains(&level)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }
}

/// Validate every invariant of a player state against the catalog.
pub fn validate_player_state(state: &PlayerState) -> Result<(), ValidationError> {
    if !(1..=MAX_LEVEL).contains(&state.current_level) {
        return Err(ValidationError::LevelOutOfRange(state.current_level));
    }
    if state.money < Decimal::ZERO || state.stats.total_money_earned < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if !state.unlocked_levels.contains(&1) {
        return Err(ValidationError::MissingBaseLevel);
    }
    if let Some(&bad) = state
        .unlocked_levels
        .iter()
        .find(|l| !(1..=MAX_LEVEL).contains(*l))
    {
        return Err(ValidationError::LevelOutOfRange(bad));
    }
    if !state.unlocked_levels.contains(&state.current_level) {
        return Err(ValidationError::CurrentLevelLocked(state.current_level));
    }
    for (id, &level) in &state.upgrades {
        let def = catalog::upgrade(id).ok_or_else(|| ValidationError::UnknownUpgrade(id.clone()))?;
        if level > def.max_level {
            return Err(ValidationError::UpgradeOverMax {
                id: id.clone(),
                level,
                max: def.max_level,
            });
        }
    }
    if let Some(id) = state.helpers.keys().find(|id| catalog::helper(id).is_none()) {
        return Err(ValidationError::UnknownHelper(id.clone()));
    }
    for (&level, &stars) in &state.mastery {
        if !(1..=MAX_LEVEL).contains(&level) {
            return Err(ValidationError::LevelOutOfRange(level));
        }
        if stars > MAX_MASTERY_STARS {
            return Err(ValidationError::MasteryOverMax { level, stars });
        }
    }
    if state.fever_gauge > FEVER_GAUGE_MAX {
        return Err(ValidationError::GaugeOutOfRange(state.fever_gauge));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_state_is_valid() {
        let s = PlayerState::default();
        validate_player_state(&s).unwrap();
        assert_eq!(s.current_level, 1);
        assert!(s.is_unlocked(1));
        assert_eq!(s.upgrade_level("CLICK_POWER"), 0);
        assert_eq!(s.helper_count("apprentice"), 0);
    }

    #[test]
    fn serializes_with_camel_case_keys_and_skips_gauge() {
        let mut s = PlayerState::default();
        s.fever_gauge = 40;
        s.mastery.insert(2, 1);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"currentLevel\":1"));
        assert!(json.contains("\"unlockedLevels\":[1]"));
        assert!(json.contains("\"totalMoneyEarned\""));
        assert!(!json.contains("feverGauge"));

        let back: PlayerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fever_gauge, 0);
        assert_eq!(back.stars(2), 1);
    }

    #[test]
    fn older_payload_without_prestige_fields_loads() {
        let json = r#"{
            "currentLevel": 3, "money": 1250, "unlockedLevels": [1,2,3],
            "inventory": {"chocolate":0,"pistachio":0,"goldLeaf":0},
            "stats": {"totalClicks":5,"totalMoneyEarned":4000,"failedUpgrades":1},
            "achievements": ["FIRST_TAP"], "tutorialCompleted": true,
            "upgrades": {}, "helpers": {}
        }"#;
        let s: PlayerState = serde_json::from_str(json).unwrap();
        assert_eq!(s.money, Decimal::from(1250));
        assert_eq!(s.prestige_tickets, 0);
        assert!(s.mastery.is_empty());
        validate_player_state(&s).unwrap();
    }

    #[test]
    fn rejects_broken_invariants() {
        let mut s = PlayerState::default();
        s.current_level = 4;
        assert_eq!(
            validate_player_state(&s),
            Err(ValidationError::CurrentLevelLocked(4))
        );

        let mut s = PlayerState::default();
        s.unlocked_levels.clear();
        assert_eq!(validate_player_state(&s), Err(ValidationError::MissingBaseLevel));

        let mut s = PlayerState::default();
        s.money = Decimal::from(-1);
        assert_eq!(validate_player_state(&s), Err(ValidationError::NegativeMoney));

        let mut s = PlayerState::default();
        s.upgrades.insert("CHANCE_BOOST".into(), 11);
        assert!(matches!(
            validate_player_state(&s),
            Err(ValidationError::UpgradeOverMax { max: 10, .. })
        ));

        let mut s = PlayerState::default();
        s.helpers.insert("robot".into(), 1);
        assert_eq!(
            validate_player_state(&s),
            Err(ValidationError::UnknownHelper("robot".into()))
        );

        let mut s = PlayerState::default();
        s.mastery.insert(1, 4);
        assert_eq!(
            validate_player_state(&s),
            Err(ValidationError::MasteryOverMax { level: 1, stars: 4 })
        );
    }

    proptest! {
        #[test]
        fn reachable_levels_validate(level in 1u32..=MAX_LEVEL, money in 0i64..i64::MAX) {
            let mut s = PlayerState::default();
            s.current_level = level;
            s.unlocked_levels.extend(1..=level);
            s.money = Decimal::from(money);
            prop_assert!(validate_player_state(&s).is_ok());
        }

        #[test]
        fn levels_past_max_are_rejected(level in (MAX_LEVEL + 1)..1_000u32) {
            let mut s = PlayerState::default();
            s.current_level = level;
            s.unlocked_levels.insert(level);
            prop_assert_eq!(
                validate_player_state(&s),
                Err(ValidationError::LevelOutOfRange(level))
            );
        }
    }
}
