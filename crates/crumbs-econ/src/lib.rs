#![deny(warnings)]

//! Economic formulas for Crumbs.
//!
//! Pure, side-effect-free functions mapping a [`PlayerState`] plus the static
//! catalog to derived quantities:
//! - tap yield and passive yield per second
//! - upgrade, helper and mastery prices
//! - effective upgrade success chance
//! - stock ceiling and restock period
//! - prestige reward and multiplier
//!
//! Money is `Decimal` throughout. Products that would overflow saturate at
//! `Decimal::MAX`, which keeps such prices unaffordable instead of wrapping.

use crumbs_core::catalog::{
    self, dec, BASE_RESTOCK_INTERVAL_MS, BASE_STOCK, CHANCE_PER_LEVEL, CLICK_POWER_PER_LEVEL,
    CLICK_REWARD_BASE, FEVER_MULTIPLIER, LEVEL_EXPONENT, MASTERY_COST_FACTOR, MASTERY_STAR_BONUS,
    MAX_LEVEL, MIN_RESTOCK_INTERVAL_MS, PRESTIGE_DIVISOR, PRESTIGE_TICKET_BONUS, RESTOCK_BAND,
    RESTOCK_REDUCTION_MS, STOCK_PER_CAPACITY_LEVEL, SUCCESS_RATE_CAP,
};
use crumbs_core::{HelperDef, LevelData, PlayerState, UpgradeDef, UpgradeKind};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by economic lookups.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Upgrade id not present in the catalog.
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
    /// Helper id not present in the catalog.
    #[error("unknown helper: {0}")]
    UnknownHelper(String),
    /// Level number not present in the catalog.
    #[error("unknown level: {0}")]
    UnknownLevel(u32),
}

/// `base^exp` by squaring, `None` on overflow.
pub fn checked_pow(base: Decimal, mut exp: u64) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    let mut sq = base;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.checked_mul(sq)?;
        }
        exp >>= 1;
        if exp > 0 {
            sq = sq.checked_mul(sq)?;
        }
    }
    Some(acc)
}

/// `floor(base_cost * multiplier^owned)`, saturating at `Decimal::MAX`.
///
/// Shared by upgrades (owned = purchased level) and helpers (owned = count).
pub fn scaled_cost(base_cost: Decimal, multiplier: Decimal, owned: u64) -> Decimal {
    checked_pow(multiplier, owned)
        .and_then(|f| base_cost.checked_mul(f))
        .map(|c| c.floor())
        .unwrap_or(Decimal::MAX)
}

/// Purchased level of whichever upgrade provides `kind`.
pub fn upgrade_level_of(state: &PlayerState, kind: UpgradeKind) -> u32 {
    catalog::upgrade_by_kind(kind)
        .map(|def| state.upgrade_level(def.id))
        .unwrap_or(0)
}

/// `1.5^(level-1)`.
pub fn level_multiplier(level: u32) -> Decimal {
    checked_pow(dec(LEVEL_EXPONENT), u64::from(level.saturating_sub(1))).unwrap_or(Decimal::MAX)
}

/// `1 + 0.5 * click_power_level + 0.01 * total_mastery_stars`.
pub fn click_multiplier(state: &PlayerState) -> Decimal {
    let power = Decimal::from(upgrade_level_of(state, UpgradeKind::ClickPower));
    let stars = Decimal::from(state.total_stars());
    Decimal::ONE + dec(CLICK_POWER_PER_LEVEL) * power + dec(MASTERY_STAR_BONUS) * stars
}

/// `1 + 0.2 * tickets`.
pub fn prestige_multiplier(tickets: u64) -> Decimal {
    Decimal::from(tickets)
        .checked_mul(dec(PRESTIGE_TICKET_BONUS))
        .and_then(|b| b.checked_add(Decimal::ONE))
        .unwrap_or(Decimal::MAX)
}

/// 10 while fever is active, otherwise 1.
pub fn fever_multiplier(fever_active: bool) -> Decimal {
    if fever_active {
        Decimal::from(FEVER_MULTIPLIER)
    } else {
        Decimal::ONE
    }
}

/// Crumbs credited by a single tap.
///
/// `ceil(BASE * 1.5^(level-1) * click * prestige * fever)`.
pub fn click_yield(state: &PlayerState, fever_active: bool) -> Decimal {
    [
        level_multiplier(state.current_level),
        click_multiplier(state),
        prestige_multiplier(state.prestige_tickets),
        fever_multiplier(fever_active),
    ]
    .into_iter()
    .try_fold(Decimal::from(CLICK_REWARD_BASE), |acc, m| acc.checked_mul(m))
    .map(|y| y.ceil())
    .unwrap_or(Decimal::MAX)
}

/// Helper taps per second: `sum(count * base_cps)`.
pub fn total_cps(state: &PlayerState) -> Decimal {
    catalog::helpers()
        .iter()
        .map(|h| Decimal::from(state.helper_count(h.id)) * h.base_cps)
        .sum()
}

/// Crumbs credited by helpers each second: `total_cps * click_yield`.
pub fn passive_yield_per_second(state: &PlayerState, fever_active: bool) -> Decimal {
    total_cps(state)
        .checked_mul(click_yield(state, fever_active))
        .unwrap_or(Decimal::MAX)
}

/// Price of the next level of `def` given its purchased level.
pub fn upgrade_cost(def: &UpgradeDef, current_level: u32) -> Decimal {
    scaled_cost(def.base_cost, def.cost_multiplier, u64::from(current_level))
}

/// Price of the next unit of `def` given the owned count.
pub fn helper_cost(def: &HelperDef, owned: u64) -> Decimal {
    scaled_cost(def.base_cost, def.cost_multiplier, owned)
}

/// Price of the next level of upgrade `id` for this player, `None` once maxed.
pub fn upgrade_cost_for(state: &PlayerState, id: &str) -> Result<Option<Decimal>, EconError> {
    let def = catalog::upgrade(id).ok_or_else(|| EconError::UnknownUpgrade(id.to_string()))?;
    let owned = state.upgrade_level(id);
    Ok((owned < def.max_level).then(|| upgrade_cost(def, owned)))
}

/// Price of the next helper `id` for this player.
pub fn helper_cost_for(state: &PlayerState, id: &str) -> Result<Decimal, EconError> {
    let def = catalog::helper(id).ok_or_else(|| EconError::UnknownHelper(id.to_string()))?;
    Ok(helper_cost(def, state.helper_count(id)))
}

/// The level an upgrade attempt would reach, `None` at max level.
pub fn next_level(state: &PlayerState) -> Option<&'static LevelData> {
    if state.current_level >= MAX_LEVEL {
        return None;
    }
    catalog::level_data(state.current_level + 1)
}

/// `min(0.95, level.success_rate + 0.01 * chance_level)`.
pub fn effective_success_rate(level: &LevelData, state: &PlayerState) -> f64 {
    let bonus = CHANCE_PER_LEVEL * f64::from(upgrade_level_of(state, UpgradeKind::Chance));
    (level.success_rate + bonus).min(SUCCESS_RATE_CAP)
}

/// `50 + 50 * stock_capacity_level`.
pub fn current_max_stock(state: &PlayerState) -> u32 {
    let lvl = upgrade_level_of(state, UpgradeKind::StockMax);
    BASE_STOCK.saturating_add(STOCK_PER_CAPACITY_LEVEL.saturating_mul(lvl))
}

/// Inclusive range a restock draws from: `[max - 40, max]`.
pub fn restock_range(state: &PlayerState) -> (u32, u32) {
    let max = current_max_stock(state);
    (max.saturating_sub(RESTOCK_BAND), max)
}

/// `60000 - 5000 * stock_speed_level`, never below 5000.
pub fn restock_interval_ms(state: &PlayerState) -> u64 {
    let lvl = u64::from(upgrade_level_of(state, UpgradeKind::StockSpeed));
    BASE_RESTOCK_INTERVAL_MS
        .saturating_sub(RESTOCK_REDUCTION_MS.saturating_mul(lvl))
        .max(MIN_RESTOCK_INTERVAL_MS)
}

/// Tickets a prestige would grant now:
/// `max(0, floor(sqrt(total_earned / 500000)) - tickets)`.
pub fn prestige_reward(state: &PlayerState) -> u64 {
    let ratio = state.stats.total_money_earned / Decimal::from(PRESTIGE_DIVISOR);
    let earned = match ratio.to_f64() {
        Some(r) if r.is_finite() && r > 0.0 => r.sqrt().floor(),
        _ => return 0,
    };
    if earned >= u64::MAX as f64 {
        return u64::MAX.saturating_sub(state.prestige_tickets);
    }
    (earned as u64).saturating_sub(state.prestige_tickets)
}

/// Price of one mastery star on `level`: twice the level's base cost.
pub fn mastery_cost(level: &LevelData) -> Decimal {
    level.base_cost * Decimal::from(MASTERY_COST_FACTOR)
}

/// [`mastery_cost`] by level number.
pub fn mastery_cost_for(level: u32) -> Result<Decimal, EconError> {
    catalog::level_data(level)
        .map(mastery_cost)
        .ok_or(EconError::UnknownLevel(level))
}
