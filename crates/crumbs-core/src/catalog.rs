//! Static content catalog: recipe levels, upgrades, helpers and achievements.
//!
//! The catalog is built once on first access and is immutable afterwards.
//! Lookups return `'static` references so callers never clone catalog rows.

use crate::state::Stats;
use crate::ValidationError;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Highest reachable recipe level.
pub const MAX_LEVEL: u32 = 10;
/// Crumbs per tap at level 1 before multipliers.
pub const CLICK_REWARD_BASE: i64 = 10;
/// Per-level growth of tap yield, expressed as a decimal (1.5).
pub const LEVEL_EXPONENT: (i64, u32) = (15, 1);

/// Gauge points gained per tap outside fever.
pub const FEVER_GAUGE_PER_TAP: u32 = 2;
/// Gauge value that triggers fever.
pub const FEVER_GAUGE_MAX: u32 = 100;
/// How long fever lasts once triggered.
pub const FEVER_DURATION_MS: u64 = 10_000;
/// Tap yield multiplier while fever is active.
pub const FEVER_MULTIPLIER: i64 = 10;

/// Stock available with no capacity upgrades.
pub const BASE_STOCK: u32 = 50;
/// Extra stock per `StockMax` upgrade level.
pub const STOCK_PER_CAPACITY_LEVEL: u32 = 50;
/// Width below the max stock that a restock may land in.
pub const RESTOCK_BAND: u32 = 40;
/// Restock period with no speed upgrades.
pub const BASE_RESTOCK_INTERVAL_MS: u64 = 60_000;
/// Reduction of the restock period per `StockSpeed` upgrade level.
pub const RESTOCK_REDUCTION_MS: u64 = 5_000;
/// Floor for the restock period.
pub const MIN_RESTOCK_INTERVAL_MS: u64 = 5_000;

/// Lifetime earnings per squared prestige ticket.
pub const PRESTIGE_DIVISOR: i64 = 500_000;
/// Multiplier bonus per prestige ticket (0.2).
pub const PRESTIGE_TICKET_BONUS: (i64, u32) = (2, 1);

/// Maximum mastery stars per level.
pub const MAX_MASTERY_STARS: u8 = 3;
/// Tap multiplier bonus per mastery star (0.01).
pub const MASTERY_STAR_BONUS: (i64, u32) = (1, 2);
/// Mastery star price as a multiple of the level's base cost.
pub const MASTERY_COST_FACTOR: i64 = 2;

/// Tap multiplier bonus per `ClickPower` upgrade level (0.5).
pub const CLICK_POWER_PER_LEVEL: (i64, u32) = (5, 1);
/// Success chance bonus per `Chance` upgrade level.
pub const CHANCE_PER_LEVEL: f64 = 0.01;
/// Success chance never exceeds this cap.
pub const SUCCESS_RATE_CAP: f64 = 0.95;

/// Build a decimal from a `(mantissa, scale)` constant.
pub fn dec(parts: (i64, u32)) -> Decimal {
    Decimal::new(parts.0, parts.1)
}

/// Coarse stage of the dessert, used by presentation to pick artwork.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeStage {
    Kataifi,
    Pistachio,
    Marshmallow,
    Wrapping,
    Finished,
}

/// Display-only metadata for a level.
#[derive(Clone, Debug, Serialize)]
pub struct VisualParams {
    pub stage: RecipeStage,
    pub color: &'static str,
    pub accent_color: &'static str,
    pub particles: &'static str,
}

/// One step of the recipe.
#[derive(Clone, Debug, Serialize)]
pub struct LevelData {
    /// Level number, 1-based.
    pub level: u32,
    pub name: &'static str,
    pub description: &'static str,
    /// Price of an attempt to reach this level.
    pub base_cost: Decimal,
    /// Base probability in [0,1] that an attempt to reach this level succeeds.
    pub success_rate: f64,
    pub visual: VisualParams,
}

/// Effect family of a permanent upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Raises the tap multiplier.
    ClickPower,
    /// Raises upgrade success chance.
    Chance,
    /// Raises the stock ceiling.
    StockMax,
    /// Shortens the restock period.
    StockSpeed,
}

/// A permanent, levelled upgrade bought with crumbs.
#[derive(Clone, Debug, Serialize)]
pub struct UpgradeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_cost: Decimal,
    pub cost_multiplier: Decimal,
    pub max_level: u32,
    pub icon: &'static str,
    pub kind: UpgradeKind,
}

/// A passive-income unit. Each owned helper taps `base_cps` times per second.
#[derive(Clone, Debug, Serialize)]
pub struct HelperDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_cost: Decimal,
    pub cost_multiplier: Decimal,
    pub base_cps: Decimal,
    pub icon: &'static str,
}

/// Everything an achievement predicate may look at.
#[derive(Clone, Copy, Debug)]
pub struct AchievementContext<'a> {
    pub stats: &'a Stats,
    pub current_level: u32,
    pub prestige_tickets: u64,
    pub mastery: &'a BTreeMap<u32, u8>,
    pub current_stock: u32,
    pub fever_active: bool,
}

/// A one-way unlock driven by a pure predicate.
#[derive(Clone)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub predicate: fn(&AchievementContext<'_>) -> bool,
}

impl Achievement {
    /// Whether the predicate holds for `ctx`.
    pub fn is_met(&self, ctx: &AchievementContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl fmt::Debug for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn level(
    level: u32,
    name: &'static str,
    description: &'static str,
    base_cost: i64,
    success_pct: i64,
    visual: VisualParams,
) -> LevelData {
    LevelData {
        level,
        name,
        description,
        base_cost: Decimal::from(base_cost),
        success_rate: success_pct as f64 / 100.0,
        visual,
    }
}

fn finished(color: &'static str, accent_color: &'static str, particles: &'static str) -> VisualParams {
    VisualParams {
        stage: RecipeStage::Finished,
        color,
        accent_color,
        particles,
    }
}

static LEVELS: Lazy<Vec<LevelData>> = Lazy::new(|| {
    vec![
        level(
            1,
            "Toasted Kataifi",
            "Butter in the pan, kataifi strands toasted golden.",
            100,
            100,
            VisualParams {
                stage: RecipeStage::Kataifi,
                color: "amber-100",
                accent_color: "amber-400",
                particles: "🔥",
            },
        ),
        level(
            2,
            "Pistachio Blend",
            "White chocolate folded into pistachio spread until thick.",
            300,
            90,
            VisualParams {
                stage: RecipeStage::Pistachio,
                color: "lime-500",
                accent_color: "lime-300",
                particles: "🥜",
            },
        ),
        level(
            3,
            "Melted Marshmallow",
            "Butter and marshmallow melted low for a chewy base.",
            700,
            80,
            VisualParams {
                stage: RecipeStage::Marshmallow,
                color: "white",
                accent_color: "stone-100",
                particles: "☁️",
            },
        ),
        level(
            4,
            "Wrapped Filling",
            "A thin marshmallow layer wraps the pistachio insert.",
            1_500,
            70,
            VisualParams {
                stage: RecipeStage::Wrapping,
                color: "stone-200",
                accent_color: "lime-600",
                particles: "🥣",
            },
        ),
        level(
            5,
            "Cocoa Coating",
            "Dusted evenly in cocoa powder. Done.",
            3_000,
            60,
            finished("#3E2723", "#5D4037", "✨"),
        ),
        level(
            6,
            "Rested and Set",
            "A night in the fridge for maximum chew.",
            6_000,
            50,
            finished("#3E2723", "#5D4037", "❄️"),
        ),
        level(
            7,
            "Gold Leaf",
            "Edible gold leaf for a luxury finish.",
            12_000,
            40,
            finished("#3E2723", "yellow-400", "👑"),
        ),
        level(
            8,
            "Pop-up Edition",
            "Limited packaging for the legendary dessert.",
            25_000,
            30,
            finished("#281815", "yellow-400", "🎁"),
        ),
        level(
            9,
            "Sold-out Sensation",
            "Resold at triple the price online.",
            50_000,
            20,
            finished("#281815", "purple-500", "🔥"),
        ),
        level(
            10,
            "Masterpiece",
            "A flawless form worthy of a museum.",
            100_000,
            10,
            finished("black", "gold-500", "💎"),
        ),
    ]
});

static UPGRADES: Lazy<Vec<UpgradeDef>> = Lazy::new(|| {
    vec![
        UpgradeDef {
            id: "CLICK_POWER",
            name: "Golden Spatula",
            description: "+50% crumbs per tap",
            base_cost: Decimal::from(500),
            cost_multiplier: Decimal::new(18, 1),
            max_level: 20,
            icon: "🥄",
            kind: UpgradeKind::ClickPower,
        },
        UpgradeDef {
            id: "CHANCE_BOOST",
            name: "Lucky Whisk",
            description: "+1% upgrade success chance",
            base_cost: Decimal::from(2_000),
            cost_multiplier: Decimal::from(2),
            max_level: 10,
            icon: "🍀",
            kind: UpgradeKind::Chance,
        },
        UpgradeDef {
            id: "STOCK_CAPACITY",
            name: "Bigger Pantry",
            description: "+50 maximum stock",
            base_cost: Decimal::from(1_000),
            cost_multiplier: Decimal::new(22, 1),
            max_level: 10,
            icon: "📦",
            kind: UpgradeKind::StockMax,
        },
        UpgradeDef {
            id: "STOCK_SPEED",
            name: "Express Courier",
            description: "Restock 5 seconds sooner",
            base_cost: Decimal::from(1_500),
            cost_multiplier: Decimal::new(25, 1),
            max_level: 11,
            icon: "🚚",
            kind: UpgradeKind::StockSpeed,
        },
    ]
});

static HELPERS: Lazy<Vec<HelperDef>> = Lazy::new(|| {
    vec![
        HelperDef {
            id: "apprentice",
            name: "Apprentice",
            description: "Taps once every five seconds",
            base_cost: Decimal::from(200),
            cost_multiplier: Decimal::new(115, 2),
            base_cps: Decimal::new(2, 1),
            icon: "🧑‍🍳",
        },
        HelperDef {
            id: "pastry_chef",
            name: "Pastry Chef",
            description: "Taps once per second",
            base_cost: Decimal::from(2_500),
            cost_multiplier: Decimal::new(115, 2),
            base_cps: Decimal::ONE,
            icon: "👩‍🍳",
        },
        HelperDef {
            id: "chocolatier",
            name: "Chocolatier",
            description: "Taps five times per second",
            base_cost: Decimal::from(30_000),
            cost_multiplier: Decimal::new(115, 2),
            base_cps: Decimal::from(5),
            icon: "🍫",
        },
        HelperDef {
            id: "dessert_factory",
            name: "Dessert Factory",
            description: "Taps twenty-five times per second",
            base_cost: Decimal::from(400_000),
            cost_multiplier: Decimal::new(115, 2),
            base_cps: Decimal::from(25),
            icon: "🏭",
        },
    ]
});

static ACHIEVEMENTS: &[Achievement] = &[
    Achievement {
        id: "FIRST_TAP",
        name: "First Bite",
        description: "Tap the dessert once",
        icon: "👆",
        predicate: |c| c.stats.total_clicks >= 1,
    },
    Achievement {
        id: "CLICK_10",
        name: "Warming Up",
        description: "Tap 10 times",
        icon: "🔟",
        predicate: |c| c.stats.total_clicks >= 10,
    },
    Achievement {
        id: "CLICK_100",
        name: "Busy Hands",
        description: "Tap 100 times",
        icon: "💯",
        predicate: |c| c.stats.total_clicks >= 100,
    },
    Achievement {
        id: "CLICK_1000",
        name: "Tap Artisan",
        description: "Tap 1,000 times",
        icon: "🏅",
        predicate: |c| c.stats.total_clicks >= 1_000,
    },
    Achievement {
        id: "LEVEL_5",
        name: "Finished Product",
        description: "Reach level 5",
        icon: "🍪",
        predicate: |c| c.current_level >= 5,
    },
    Achievement {
        id: "LEVEL_MAX",
        name: "Masterpiece",
        description: "Reach the final level",
        icon: "💎",
        predicate: |c| c.current_level >= MAX_LEVEL,
    },
    Achievement {
        id: "FAIL_10",
        name: "Burnt Offerings",
        description: "Fail 10 upgrade attempts",
        icon: "💥",
        predicate: |c| c.stats.failed_upgrades >= 10,
    },
    Achievement {
        id: "EARN_1M",
        name: "Crumb Millionaire",
        description: "Earn 1,000,000 crumbs in total",
        icon: "💰",
        predicate: |c| c.stats.total_money_earned >= Decimal::from(1_000_000),
    },
    Achievement {
        id: "SOLD_OUT",
        name: "Sold Out",
        description: "Empty the global stock",
        icon: "🚫",
        predicate: |c| c.current_stock == 0,
    },
    Achievement {
        id: "FEVER_TIME",
        name: "Sugar Rush",
        description: "Enter fever mode",
        icon: "🔥",
        predicate: |c| c.fever_active,
    },
    Achievement {
        id: "PRESTIGE_1",
        name: "Fresh Batch",
        description: "Prestige for the first time",
        icon: "🎟️",
        predicate: |c| c.prestige_tickets >= 1,
    },
    Achievement {
        id: "MASTER_CHEF",
        name: "Three Stars",
        description: "Master any level to three stars",
        icon: "⭐",
        predicate: |c| c.mastery.values().any(|&s| s >= MAX_MASTERY_STARS),
    },
];

/// All levels in ascending order.
pub fn levels() -> &'static [LevelData] {
    &LEVELS
}

/// Level data by 1-based number.
pub fn level_data(level: u32) -> Option<&'static LevelData> {
    let idx = usize::try_from(level.checked_sub(1)?).ok()?;
    LEVELS.get(idx)
}

/// All upgrades in display order.
pub fn upgrades() -> &'static [UpgradeDef] {
    &UPGRADES
}

/// Upgrade by id.
pub fn upgrade(id: &str) -> Option<&'static UpgradeDef> {
    UPGRADES.iter().find(|u| u.id == id)
}

/// The upgrade that provides a given effect.
pub fn upgrade_by_kind(kind: UpgradeKind) -> Option<&'static UpgradeDef> {
    UPGRADES.iter().find(|u| u.kind == kind)
}

/// All helpers in display order.
pub fn helpers() -> &'static [HelperDef] {
    &HELPERS
}

/// Helper by id.
pub fn helper(id: &str) -> Option<&'static HelperDef> {
    HELPERS.iter().find(|h| h.id == id)
}

/// All achievements in evaluation order.
pub fn achievements() -> &'static [Achievement] {
    ACHIEVEMENTS
}

/// Check catalog self-consistency: contiguous levels, sane rates, unique ids.
pub fn validate_catalog() -> Result<(), ValidationError> {
    if levels().len() != MAX_LEVEL as usize {
        return Err(ValidationError::NonContiguousLevels(levels().len() as u32));
    }
    for (i, l) in levels().iter().enumerate() {
        let expected = i as u32 + 1;
        if l.level != expected {
            return Err(ValidationError::NonContiguousLevels(expected));
        }
        if !(0.0..=1.0).contains(&l.success_rate) {
            return Err(ValidationError::InvalidSuccessRate(l.level));
        }
    }

    let mut ids: BTreeSet<&str> = BTreeSet::new();
    for u in upgrades() {
        if !ids.insert(u.id) {
            return Err(ValidationError::DuplicateId(u.id.to_string()));
        }
        if u.cost_multiplier < Decimal::ONE {
            return Err(ValidationError::InvalidCostMultiplier(u.id.to_string()));
        }
    }
    for h in helpers() {
        if !ids.insert(h.id) {
            return Err(ValidationError::DuplicateId(h.id.to_string()));
        }
        if h.cost_multiplier < Decimal::ONE {
            return Err(ValidationError::InvalidCostMultiplier(h.id.to_string()));
        }
    }
    for a in achievements() {
        if !ids.insert(a.id) {
            return Err(ValidationError::DuplicateId(a.id.to_string()));
        }
    }
    Ok(())
}
