//! Save payload codec and the load/save entry points.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION` is bumped whenever fields are added.
//! - `MIN_COMPATIBLE_VERSION` only moves on breaking changes (a field changes
//!   meaning or disappears). Payloads in between load with missing fields
//!   defaulted; payloads without a `version` key are treated as version 1.

use crate::store::SaveStore;
use crate::PersistenceError;
use chrono::{DateTime, TimeZone, Utc};
use crumbs_core::{validate_player_state, PlayerState};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Current payload format version.
pub const SAVE_VERSION: u64 = 2;

/// Oldest payload version that can still be loaded.
pub const MIN_COMPATIBLE_VERSION: u64 = 1;

const VERSION_KEY: &str = "version";
const LAST_SAVED_KEY: &str = "lastSaved";

/// Where a loaded state came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// No save existed; defaults were used.
    Fresh,
    /// A valid save was restored.
    Restored,
    /// A save existed but was rejected; defaults were used.
    Recovered(String),
}

/// Result of [`load`]. Always carries a playable state.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub state: PlayerState,
    pub last_saved: Option<DateTime<Utc>>,
    pub origin: LoadOrigin,
}

/// Serialize `state` into a flat JSON payload stamped with `saved_at`.
pub fn encode(state: &PlayerState, saved_at: DateTime<Utc>) -> Result<String, PersistenceError> {
    let mut value = serde_json::to_value(state)?;
    if let Value::Object(map) = &mut value {
        map.insert(VERSION_KEY.to_string(), Value::from(SAVE_VERSION));
        map.insert(
            LAST_SAVED_KEY.to_string(),
            Value::from(saved_at.timestamp_millis()),
        );
    }
    Ok(serde_json::to_string(&value)?)
}

/// Parse and validate a payload.
///
/// Runs the coarse shape check first, then typed decoding, then the
/// [`PlayerState`] invariant validator.
pub fn decode(payload: &str) -> Result<(PlayerState, Option<DateTime<Utc>>), PersistenceError> {
    let value: Value = serde_json::from_str(payload).map_err(invalid)?;
    let obj = value
        .as_object()
        .ok_or_else(|| PersistenceError::InvalidSaveData("payload is not an object".into()))?;
    check_shape(obj)?;

    let version = match obj.get(VERSION_KEY) {
        None => MIN_COMPATIBLE_VERSION,
        Some(v) => v.as_u64().ok_or_else(|| {
            PersistenceError::InvalidSaveData("version is not an unsigned integer".into())
        })?,
    };
    if !(MIN_COMPATIBLE_VERSION..=SAVE_VERSION).contains(&version) {
        return Err(PersistenceError::InvalidSaveData(format!(
            "unsupported save version {version}"
        )));
    }
    let last_saved = obj
        .get(LAST_SAVED_KEY)
        .and_then(Value::as_i64)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    let state: PlayerState = serde_json::from_value(value).map_err(invalid)?;
    validate_player_state(&state).map_err(invalid)?;
    Ok((state, last_saved))
}

fn invalid<E: std::fmt::Display>(e: E) -> PersistenceError {
    PersistenceError::InvalidSaveData(e.to_string())
}

/// Required fields and their coarse JSON types.
fn check_shape(obj: &Map<String, Value>) -> Result<(), PersistenceError> {
    let checks: [(&str, fn(&Value) -> bool); 9] = [
        ("currentLevel", Value::is_number),
        ("money", |v| v.is_number() || v.is_string()),
        ("unlockedLevels", Value::is_array),
        ("inventory", Value::is_object),
        ("stats", Value::is_object),
        ("achievements", Value::is_array),
        ("tutorialCompleted", Value::is_boolean),
        ("upgrades", Value::is_object),
        ("helpers", Value::is_object),
    ];
    for (key, ok) in checks {
        match obj.get(key) {
            Some(v) if ok(v) => {}
            Some(_) => {
                return Err(PersistenceError::InvalidSaveData(format!(
                    "field `{key}` has the wrong type"
                )))
            }
            None => {
                return Err(PersistenceError::InvalidSaveData(format!(
                    "missing field `{key}`"
                )))
            }
        }
    }
    Ok(())
}

/// Load the save under `key`, falling back to defaults on any problem.
pub fn load(store: &dyn SaveStore, key: &str) -> Loaded {
    let payload = match store.read(key) {
        Ok(Some(p)) => p,
        Ok(None) => {
            debug!(key, "no save found, starting fresh");
            return fresh(LoadOrigin::Fresh);
        }
        Err(e) => {
            warn!(key, error = %e, "save unreadable, starting fresh");
            return fresh(LoadOrigin::Recovered(e.to_string()));
        }
    };
    match decode(&payload) {
        Ok((state, last_saved)) => {
            info!(key, level = state.current_level, "save restored");
            Loaded {
                state,
                last_saved,
                origin: LoadOrigin::Restored,
            }
        }
        Err(e) => {
            warn!(key, error = %e, "invalid save data, starting fresh");
            fresh(LoadOrigin::Recovered(e.to_string()))
        }
    }
}

fn fresh(origin: LoadOrigin) -> Loaded {
    Loaded {
        state: PlayerState::default(),
        last_saved: None,
        origin,
    }
}

/// Persist `state` under `key`. Returns the timestamp written into the payload.
pub fn save(
    store: &mut dyn SaveStore,
    key: &str,
    state: &PlayerState,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, PersistenceError> {
    let payload = encode(state, now)?;
    store.write(key, &payload)?;
    info!(key, bytes = payload.len(), "saved");
    Ok(now)
}

/// Delete the save under `key`.
pub fn reset(store: &mut dyn SaveStore, key: &str) -> Result<(), PersistenceError> {
    store.remove(key)?;
    info!(key, "save reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    const KEY: &str = "test_save";

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap()
    }

    fn progressed() -> PlayerState {
        let mut s = PlayerState::default();
        s.current_level = 4;
        s.unlocked_levels.extend([2, 3, 4]);
        s.money = Decimal::new(123_456_789_012_345_678, 0) * Decimal::from(100);
        s.stats.total_clicks = 42;
        s.stats.total_money_earned = Decimal::from(9_999_999);
        s.stats.failed_upgrades = 3;
        s.achievements = vec!["FIRST_TAP".into(), "CLICK_10".into()];
        s.tutorial_completed = true;
        s.upgrades.insert("CLICK_POWER".into(), 3);
        s.helpers.insert("apprentice".into(), 12);
        s.prestige_tickets = 2;
        s.mastery.insert(2, 3);
        s.inventory.gold_leaf = 7;
        s
    }

    #[test]
    fn save_then_load_roundtrips() {
        let mut store = MemoryStore::new();
        let state = progressed();
        save(&mut store, KEY, &state, at(1_700_000_000_000)).unwrap();
        let loaded = load(&store, KEY);
        assert_eq!(loaded.origin, LoadOrigin::Restored);
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.last_saved, Some(at(1_700_000_000_000)));
    }

    #[test]
    fn fever_gauge_is_not_persisted() {
        let mut store = MemoryStore::new();
        let mut state = progressed();
        state.fever_gauge = 64;
        save(&mut store, KEY, &state, at(0)).unwrap();
        assert!(!store.get(KEY).unwrap().contains("feverGauge"));
        assert_eq!(load(&store, KEY).state.fever_gauge, 0);
    }

    #[test]
    fn missing_save_is_fresh() {
        let store = MemoryStore::new();
        let loaded = load(&store, KEY);
        assert_eq!(loaded.origin, LoadOrigin::Fresh);
        assert_eq!(loaded.state, PlayerState::default());
        assert!(loaded.last_saved.is_none());
    }

    #[test]
    fn corrupt_payloads_recover_to_defaults() {
        let cases = [
            "not json at all",
            "[1,2,3]",
            r#"{"currentLevel":"one","money":0,"unlockedLevels":[1],"inventory":{},"stats":{},"achievements":[],"tutorialCompleted":false,"upgrades":{},"helpers":{}}"#,
            r#"{"currentLevel":1,"money":0,"unlockedLevels":[1],"inventory":{},"stats":{},"achievements":[],"upgrades":{},"helpers":{}}"#,
            r#"{"currentLevel":1,"money":0,"unlockedLevels":[1],"inventory":null,"stats":{},"achievements":[],"tutorialCompleted":false,"upgrades":{},"helpers":{}}"#,
        ];
        for payload in cases {
            let mut store = MemoryStore::new();
            store.insert(KEY, payload);
            let loaded = load(&store, KEY);
            assert!(
                matches!(loaded.origin, LoadOrigin::Recovered(_)),
                "payload accepted: {payload}"
            );
            assert_eq!(loaded.state, PlayerState::default());
        }
    }

    #[test]
    fn invariant_violations_are_rejected() {
        let mut state = PlayerState::default();
        state.current_level = 7;
        let payload = encode(&state, at(0)).unwrap();
        assert!(matches!(
            decode(&payload),
            Err(PersistenceError::InvalidSaveData(_))
        ));
    }

    #[test]
    fn future_versions_are_rejected() {
        let payload = encode(&PlayerState::default(), at(0))
            .unwrap()
            .replace("\"version\":2", "\"version\":99");
        assert!(decode(&payload).is_err());
    }

    #[test]
    fn legacy_payload_without_version_loads() {
        let payload = r#"{
            "currentLevel": 2, "money": 350, "unlockedLevels": [1, 2],
            "inventory": {"chocolate": 0, "pistachio": 0, "goldLeaf": 0},
            "stats": {"totalClicks": 40, "totalMoneyEarned": 650, "failedUpgrades": 0},
            "achievements": [], "lastSaved": 1700000000000,
            "tutorialCompleted": false, "upgrades": {}, "helpers": {}
        }"#;
        let (state, last_saved) = decode(payload).unwrap();
        assert_eq!(state.current_level, 2);
        assert_eq!(state.money, Decimal::from(350));
        assert_eq!(last_saved, Some(at(1_700_000_000_000)));
    }

    #[test]
    fn write_failure_is_reported() {
        let mut store = MemoryStore::failing();
        let err = save(&mut store, KEY, &progressed(), at(0)).unwrap_err();
        assert!(matches!(err, PersistenceError::WriteFailure(_)));
    }

    #[test]
    fn reset_removes_the_slot() {
        let mut store = MemoryStore::new();
        save(&mut store, KEY, &progressed(), at(0)).unwrap();
        reset(&mut store, KEY).unwrap();
        assert_eq!(load(&store, KEY).origin, LoadOrigin::Fresh);
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_persisted_fields(
            level in 1u32..=10,
            money in 0u64..u64::MAX,
            clicks in 0u64..1_000_000,
            tickets in 0u64..100,
            stars in 0u8..=3,
            helpers in 0u64..10_000,
        ) {
            let mut s = PlayerState::default();
            s.current_level = level;
            s.unlocked_levels.extend(1..=level);
            s.money = Decimal::from(money) / Decimal::from(7);
            s.stats.total_clicks = clicks;
            s.prestige_tickets = tickets;
            s.mastery.insert(level, stars);
            s.helpers.insert("chocolatier".into(), helpers);
            let payload = encode(&s, at(1)).unwrap();
            let (back, _) = decode(&payload).unwrap();
            prop_assert_eq!(back, s);
        }
    }
}
