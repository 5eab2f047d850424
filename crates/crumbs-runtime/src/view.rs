use crate::machine::Game;
use crumbs_core::catalog::{self, LevelData, MAX_MASTERY_STARS};
use crumbs_core::Millis;
use crumbs_econ::{
    click_yield, current_max_stock, effective_success_rate, helper_cost, mastery_cost, next_level,
    passive_yield_per_second, prestige_multiplier, prestige_reward, total_cps, upgrade_cost_for,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Read-only snapshot of everything the presentation layer displays.
#[derive(Clone, Debug, Serialize)]
pub struct HudView {
    pub money: Decimal,
    pub level: &'static LevelData,
    /// `None` at the final level.
    pub next_level: Option<NextLevelView>,
    pub stock: u32,
    pub max_stock: u32,
    pub restock_in_ms: Millis,
    pub fever_gauge: u32,
    pub fever_active: bool,
    pub fever_remaining_ms: Millis,
    pub cps: Decimal,
    /// Helper income per second, before tick scaling.
    pub passive_yield: Decimal,
    pub click_yield: Decimal,
    pub prestige_tickets: u64,
    pub prestige_multiplier: Decimal,
    pub prestige_reward: u64,
    pub upgrades: Vec<UpgradeRow>,
    pub helpers: Vec<HelperRow>,
    pub mastery: Vec<MasteryRow>,
    pub achievements: Vec<AchievementRow>,
    pub tutorial_completed: bool,
    pub last_save_failed: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct NextLevelView {
    pub level: u32,
    pub name: &'static str,
    pub cost: Decimal,
    /// Success chance after upgrades, capped.
    pub success_rate: f64,
    pub affordable: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpgradeRow {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub level: u32,
    pub max_level: u32,
    /// `None` once maxed.
    pub cost: Option<Decimal>,
    pub affordable: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct HelperRow {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub owned: u64,
    pub cost: Decimal,
    pub affordable: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct MasteryRow {
    pub level: u32,
    pub unlocked: bool,
    pub stars: u8,
    /// `None` when locked or at three stars.
    pub cost: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AchievementRow {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub unlocked: bool,
}

impl Game {
    /// Build the HUD read model at `now`.
    pub fn view(&self, now: Millis) -> HudView {
        let s = &self.state;
        let fever = self.is_fever_active();
        // Validated states always have catalog data for the current level.
        let level = catalog::level_data(s.current_level).unwrap_or(&catalog::levels()[0]);

        let next_level = next_level(s).map(|next| NextLevelView {
            level: next.level,
            name: next.name,
            cost: next.base_cost,
            success_rate: effective_success_rate(next, s),
            affordable: s.money >= next.base_cost,
        });

        let upgrades = catalog::upgrades()
            .iter()
            .map(|def| {
                // Catalog ids always resolve.
                let cost = upgrade_cost_for(s, def.id).ok().flatten();
                UpgradeRow {
                    id: def.id,
                    name: def.name,
                    icon: def.icon,
                    level: s.upgrade_level(def.id),
                    max_level: def.max_level,
                    cost,
                    affordable: cost.is_some_and(|c| c <= s.money),
                }
            })
            .collect();

        let helpers = catalog::helpers()
            .iter()
            .map(|def| {
                let owned = s.helper_count(def.id);
                let cost = helper_cost(def, owned);
                HelperRow {
                    id: def.id,
                    name: def.name,
                    icon: def.icon,
                    owned,
                    cost,
                    affordable: cost <= s.money,
                }
            })
            .collect();

        let mastery = catalog::levels()
            .iter()
            .map(|lvl| {
                let unlocked = s.is_unlocked(lvl.level);
                let stars = s.stars(lvl.level);
                MasteryRow {
                    level: lvl.level,
                    unlocked,
                    stars,
                    cost: (unlocked && stars < MAX_MASTERY_STARS).then(|| mastery_cost(lvl)),
                }
            })
            .collect();

        let achievements = catalog::achievements()
            .iter()
            .map(|a| AchievementRow {
                id: a.id,
                name: a.name,
                description: a.description,
                icon: a.icon,
                unlocked: s.has_achievement(a.id),
            })
            .collect();

        HudView {
            money: s.money,
            level,
            next_level,
            stock: self.stock,
            max_stock: current_max_stock(s),
            restock_in_ms: self.restock_in_ms(now),
            fever_gauge: s.fever_gauge,
            fever_active: fever,
            fever_remaining_ms: self.fever_remaining_ms(now),
            cps: total_cps(s),
            passive_yield: passive_yield_per_second(s, fever),
            click_yield: click_yield(s, fever),
            prestige_tickets: s.prestige_tickets,
            prestige_multiplier: prestige_multiplier(s.prestige_tickets),
            prestige_reward: prestige_reward(s),
            upgrades,
            helpers,
            mastery,
            achievements,
            tutorial_completed: s.tutorial_completed,
            last_save_failed: self.last_save_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::rng::ScriptedRolls;
    use crate::Game;
    use crumbs_core::{GameConfig, PlayerState};
    use rust_decimal::Decimal;

    #[test]
    fn fresh_view_shows_first_step() {
        let g = Game::new(
            PlayerState::default(),
            GameConfig::default(),
            Box::new(ScriptedRolls::default()),
            0,
        );
        let v = g.view(15_000);
        assert_eq!(v.level.level, 1);
        let next = v.next_level.as_ref().unwrap();
        assert_eq!(next.level, 2);
        assert_eq!(next.cost, Decimal::from(300));
        assert!(!next.affordable);
        assert_eq!(v.stock, 50);
        assert_eq!(v.restock_in_ms, 45_000);
        assert_eq!(v.click_yield, Decimal::from(10));
        assert_eq!(v.prestige_multiplier, Decimal::ONE);
        assert_eq!(v.upgrades.len(), 4);
        assert_eq!(v.helpers[0].cost, Decimal::from(200));
        assert!(!v.helpers[0].affordable);
        assert_eq!(v.passive_yield, Decimal::ZERO);
        assert!(v.mastery[0].unlocked && v.mastery[0].cost.is_some());
        assert!(!v.mastery[1].unlocked && v.mastery[1].cost.is_none());
        assert!(v.achievements.iter().all(|a| !a.unlocked));
    }

    #[test]
    fn maxed_rows_have_no_price() {
        let mut s = PlayerState::default();
        s.current_level = 10;
        s.unlocked_levels.extend(2..=10);
        s.upgrades.insert("STOCK_SPEED".into(), 11);
        s.mastery.insert(10, 3);
        let g = Game::new(s, GameConfig::default(), Box::new(ScriptedRolls::default()), 0);
        let v = g.view(0);
        assert!(v.next_level.is_none());
        let speed = v.upgrades.iter().find(|u| u.id == "STOCK_SPEED").unwrap();
        assert!(speed.cost.is_none());
        assert!(v.mastery[9].cost.is_none());
        assert_eq!(v.restock_in_ms, 5_000);
    }

    #[test]
    fn view_serializes_for_status_output() {
        let g = Game::new(
            PlayerState::default(),
            GameConfig::default(),
            Box::new(ScriptedRolls::default()),
            0,
        );
        let json = serde_json::to_value(g.view(0)).unwrap();
        assert_eq!(json["stock"], 50);
        assert_eq!(json["level"]["level"], 1);
    }
}
