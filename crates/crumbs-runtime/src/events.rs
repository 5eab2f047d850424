use crumbs_core::Millis;
use rust_decimal::Decimal;
use serde::Serialize;

/// Notifications queued for the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A tap paid out `amount`; `x`/`y` are where the floating text goes.
    Tapped { amount: Decimal, x: f32, y: f32 },
    UpgradeSucceeded { level: u32 },
    /// An attempt at `level` failed; the cost and one stock unit are gone.
    UpgradeFailed { level: u32 },
    FeverStarted { generation: u64, ends_at: Millis },
    FeverEnded { generation: u64 },
    Restocked { stock: u32, next_restock_at: Millis },
    AchievementUnlocked {
        id: &'static str,
        name: &'static str,
        description: &'static str,
        icon: &'static str,
    },
    Prestiged { reward: u64, tickets: u64 },
    Saved { at: Millis },
    SaveFailed { reason: String },
}
