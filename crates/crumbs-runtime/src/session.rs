use crate::events::GameEvent;
use crate::machine::{Game, UpgradeOutcome};
use crate::rng::RollSource;
use crate::view::HudView;
use crate::ActionError;
use chrono::{DateTime, TimeZone, Utc};
use crumbs_core::{GameConfig, Millis, PlayerState};
use persistence::{LoadOrigin, PersistenceError, SaveStore};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// A [`Game`] bound to a save store.
///
/// Every intent and tick is followed by a save if one is due. Write failures
/// never interrupt play; they set [`Game::last_save_failed`] and the next
/// scheduled save retries.
pub struct Session<S: SaveStore> {
    game: Game,
    store: S,
    key: String,
    origin: LoadOrigin,
    last_saved: Option<DateTime<Utc>>,
}

impl<S: SaveStore> Session<S> {
    /// Load the save from `store` and start a seeded game at `now`.
    pub fn open(store: S, config: GameConfig, now: Millis) -> Self {
        Self::build(store, config, now, |state, config| Game::seeded(state, config, now))
    }

    /// Like [`Session::open`] with an explicit roll source.
    pub fn with_rolls(store: S, config: GameConfig, rolls: Box<dyn RollSource>, now: Millis) -> Self {
        Self::build(store, config, now, |state, config| Game::new(state, config, rolls, now))
    }

    fn build<F>(store: S, config: GameConfig, now: Millis, start: F) -> Self
    where
        F: FnOnce(PlayerState, GameConfig) -> Game,
    {
        let key = config.storage_key.clone();
        let loaded = persistence::load(&store, &key);
        info!(key = %key, origin = ?loaded.origin, now, "session opened");
        Self {
            game: start(loaded.state, config),
            store,
            key,
            origin: loaded.origin,
            last_saved: loaded.last_saved,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// How the starting state was obtained.
    pub fn load_origin(&self) -> &LoadOrigin {
        &self.origin
    }

    /// Timestamp of the last successful save, loaded or written.
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn view(&self, now: Millis) -> HudView {
        self.game.view(now)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.game.drain_events()
    }

    pub fn tap(&mut self, now: Millis, x: f32, y: f32) -> Result<Decimal, ActionError> {
        let r = self.game.tap(now, x, y);
        self.flush_if_due(now);
        r
    }

    pub fn attempt_upgrade(&mut self, now: Millis) -> Result<UpgradeOutcome, ActionError> {
        let r = self.game.attempt_upgrade(now);
        self.flush_if_due(now);
        r
    }

    pub fn buy_upgrade(&mut self, id: &str, now: Millis) -> Result<u32, ActionError> {
        let r = self.game.buy_upgrade(id, now);
        self.flush_if_due(now);
        r
    }

    pub fn buy_helper(&mut self, id: &str, now: Millis) -> Result<u64, ActionError> {
        let r = self.game.buy_helper(id, now);
        self.flush_if_due(now);
        r
    }

    pub fn upgrade_mastery(&mut self, level: u32, now: Millis) -> Result<u8, ActionError> {
        let r = self.game.upgrade_mastery(level, now);
        self.flush_if_due(now);
        r
    }

    pub fn prestige(&mut self, now: Millis) -> Result<u64, ActionError> {
        let r = self.game.prestige(now);
        self.flush_if_due(now);
        r
    }

    pub fn complete_tutorial(&mut self, now: Millis) -> Result<(), ActionError> {
        let r = self.game.complete_tutorial();
        self.flush_if_due(now);
        r
    }

    /// Advance timers to `now`, then save if due.
    pub fn tick(&mut self, now: Millis) {
        self.game.advance(now);
        self.flush_if_due(now);
    }

    fn flush_if_due(&mut self, now: Millis) {
        if !self.game.is_stopped() && self.game.save_due(now) {
            // Failures are recorded on the game; nothing else to do here.
            let _ = self.save_now(now);
        }
    }

    /// Write the current state immediately.
    pub fn save_now(&mut self, now: Millis) -> Result<(), PersistenceError> {
        let at = to_datetime(now);
        match persistence::save(&mut self.store, &self.key, self.game.state(), at) {
            Ok(saved_at) => {
                self.last_saved = Some(saved_at);
                self.game.note_save(now, Ok(()));
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "save failed, keeping in-memory state");
                self.game.note_save(now, Err(e.to_string()));
                Err(e)
            }
        }
    }

    /// Flush a final save and stop the game. Safe to call more than once.
    pub fn shutdown(&mut self, now: Millis) -> Result<(), PersistenceError> {
        if self.game.is_stopped() {
            return Ok(());
        }
        let saved = self.save_now(now);
        self.game.stop();
        saved
    }

    /// Delete the save and start over from defaults.
    pub fn reset(&mut self, now: Millis) -> Result<(), PersistenceError> {
        persistence::reset(&mut self.store, &self.key)?;
        self.game.restart(PlayerState::default(), now);
        self.origin = LoadOrigin::Fresh;
        self.last_saved = None;
        Ok(())
    }

    /// Consume the session, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }
}

fn to_datetime(ms: Millis) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRolls;
    use persistence::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const T0: u64 = 1_700_000_000_000;

    fn config() -> GameConfig {
        GameConfig {
            storage_key: "slot".into(),
            ..GameConfig::default()
        }
    }

    fn open(store: MemoryStore, rolls: Vec<f64>) -> Session<MemoryStore> {
        Session::with_rolls(store, config(), Box::new(ScriptedRolls::rolls(rolls)), T0)
    }

    fn seeded_store(state: &PlayerState) -> MemoryStore {
        let mut store = MemoryStore::new();
        let payload = persistence::encode(state, to_datetime(T0 - 60_000)).unwrap();
        store.insert("slot", &payload);
        store
    }

    #[test]
    fn fresh_store_starts_from_defaults() {
        let s = open(MemoryStore::new(), vec![]);
        assert_eq!(s.load_origin(), &LoadOrigin::Fresh);
        assert_eq!(s.game().state(), &PlayerState::default());
        assert!(s.last_saved().is_none());
    }

    #[test]
    fn restores_existing_save() {
        let mut state = PlayerState::default();
        state.money = Decimal::from(4_242);
        let s = open(seeded_store(&state), vec![]);
        assert_eq!(s.load_origin(), &LoadOrigin::Restored);
        assert_eq!(s.game().state().money, Decimal::from(4_242));
        assert_eq!(s.last_saved(), Some(to_datetime(T0 - 60_000)));
    }

    #[test]
    fn corrupt_save_recovers_to_defaults() {
        let mut store = MemoryStore::new();
        store.insert("slot", "{\"currentLevel\": ");
        let s = open(store, vec![]);
        assert!(matches!(s.load_origin(), LoadOrigin::Recovered(_)));
        assert_eq!(s.game().state(), &PlayerState::default());
    }

    #[test]
    fn level_up_saves_immediately() {
        let mut state = PlayerState::default();
        state.money = Decimal::from(1_000);
        let mut s = open(seeded_store(&state), vec![0.1]);
        s.attempt_upgrade(T0 + 10).unwrap();
        let (saved, _) = persistence::decode(s.store().get("slot").unwrap()).unwrap();
        assert_eq!(saved.current_level, 2);
        assert_eq!(s.last_saved(), Some(to_datetime(T0 + 10)));
    }

    #[test]
    fn achievement_save_waits_for_debounce() {
        let mut s = open(MemoryStore::new(), vec![]);
        s.tap(T0, 0.0, 0.0).unwrap();
        assert!(s.store().get("slot").is_none());
        s.tick(T0 + 500);
        let (saved, _) = persistence::decode(s.store().get("slot").unwrap()).unwrap();
        assert_eq!(saved.achievements, ["FIRST_TAP"]);
    }

    #[test]
    fn write_failure_is_flagged_and_play_continues() {
        let mut s = open(MemoryStore::failing(), vec![]);
        s.tick(T0 + 5_000);
        assert!(s.game().last_save_failed());
        assert!(s
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::SaveFailed { .. })));
        assert!(s.tap(T0 + 5_001, 0.0, 0.0).is_ok());
        assert!(s.view(T0 + 5_001).last_save_failed);
    }

    #[test]
    fn next_autosave_clears_failure_flag() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let mut s = open(store, vec![]);
        s.tick(T0 + 5_000);
        assert!(s.game().last_save_failed());
        let mut store = s.into_store();
        store.set_fail_writes(false);
        let mut s = open(store, vec![]);
        s.tick(T0 + 5_000);
        assert!(!s.game().last_save_failed());
        assert!(s.store().get("slot").is_some());
    }

    #[test]
    fn shutdown_flushes_and_stops() {
        let mut s = open(MemoryStore::new(), vec![]);
        s.game.state.money = Decimal::from(77);
        s.shutdown(T0 + 1).unwrap();
        let (saved, _) = persistence::decode(s.store().get("slot").unwrap()).unwrap();
        assert_eq!(saved.money, Decimal::from(77));
        assert_eq!(s.tap(T0 + 2, 0.0, 0.0), Err(ActionError::Stopped));
        assert!(s.shutdown(T0 + 3).is_ok());
        // Stopped sessions never write again.
        s.tick(T0 + 60_000);
        let (saved, _) = persistence::decode(s.store().get("slot").unwrap()).unwrap();
        assert_eq!(saved.money, Decimal::from(77));
    }

    #[test]
    fn reset_discards_progress() {
        let mut state = PlayerState::default();
        state.money = Decimal::from(9);
        let mut s = open(seeded_store(&state), vec![]);
        s.reset(T0).unwrap();
        assert!(s.store().get("slot").is_none());
        assert_eq!(s.game().state(), &PlayerState::default());
        assert_eq!(s.load_origin(), &LoadOrigin::Fresh);
    }

    struct CountingRolls(Arc<AtomicUsize>);

    impl RollSource for CountingRolls {
        fn roll(&mut self) -> f64 {
            0.0
        }

        fn pick(&mut self, lo: u32, _hi: u32) -> u32 {
            self.0.fetch_add(1, Ordering::SeqCst);
            lo
        }
    }

    #[test]
    fn reset_keeps_injected_rolls() {
        let picks = Arc::new(AtomicUsize::new(0));
        let rolls = Box::new(CountingRolls(Arc::clone(&picks)));
        let mut s = Session::with_rolls(MemoryStore::new(), config(), rolls, T0);
        s.reset(T0).unwrap();
        assert!(!s.game().last_save_failed());

        s.tick(T0 + 60_000);
        assert_eq!(picks.load(Ordering::SeqCst), 1);
        assert_eq!(s.game().stock(), 10);
    }
}
