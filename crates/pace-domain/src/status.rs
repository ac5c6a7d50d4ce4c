//! Pacing status values and their fixed display metadata.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
/// How an envelope's spend compares with the linear on-pace line.
pub enum PacingStatus {
    SuperSafe,
    Safe,
    OffTrack,
    Danger,
    BudgetBreaker,
    EnvelopeEmpty,
}

impl PacingStatus {
    pub const ALL: [PacingStatus; 6] = [
        PacingStatus::SuperSafe,
        PacingStatus::Safe,
        PacingStatus::OffTrack,
        PacingStatus::Danger,
        PacingStatus::BudgetBreaker,
        PacingStatus::EnvelopeEmpty,
    ];

    /// Ordering from safest (0) to over budget (4). Both over-budget states share a rank.
    pub fn severity(self) -> u8 {
        match self {
            PacingStatus::SuperSafe => 0,
            PacingStatus::Safe => 1,
            PacingStatus::OffTrack => 2,
            PacingStatus::Danger => 3,
            PacingStatus::BudgetBreaker | PacingStatus::EnvelopeEmpty => 4,
        }
    }

    pub fn display(self) -> &'static StatusDisplay {
        match self {
            PacingStatus::SuperSafe => &SUPER_SAFE_DISPLAY,
            PacingStatus::Safe => &SAFE_DISPLAY,
            PacingStatus::OffTrack => &OFF_TRACK_DISPLAY,
            PacingStatus::Danger => &DANGER_DISPLAY,
            PacingStatus::BudgetBreaker => &BUDGET_BREAKER_DISPLAY,
            PacingStatus::EnvelopeEmpty => &ENVELOPE_EMPTY_DISPLAY,
        }
    }
}

impl fmt::Display for PacingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display().label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Presentation hints looked up per status.
pub struct StatusDisplay {
    pub color: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
}

const SUPER_SAFE_DISPLAY: StatusDisplay = StatusDisplay {
    color: "#2E7D32",
    icon: "shield-check",
    label: "Super Safe",
};

const SAFE_DISPLAY: StatusDisplay = StatusDisplay {
    color: "#66BB6A",
    icon: "check-circle",
    label: "Safe",
};

const OFF_TRACK_DISPLAY: StatusDisplay = StatusDisplay {
    color: "#FFA726",
    icon: "alert-circle",
    label: "Off Track",
};

const DANGER_DISPLAY: StatusDisplay = StatusDisplay {
    color: "#EF5350",
    icon: "alert-triangle",
    label: "Danger",
};

const BUDGET_BREAKER_DISPLAY: StatusDisplay = StatusDisplay {
    color: "#B71C1C",
    icon: "x-octagon",
    label: "Budget Breaker",
};

const ENVELOPE_EMPTY_DISPLAY: StatusDisplay = StatusDisplay {
    color: "#616161",
    icon: "inbox",
    label: "Envelope Empty",
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Pacing result for one envelope, optionally including a hypothetical purchase.
pub struct StatusReport {
    pub envelope_id: Uuid,
    pub envelope_name: String,
    pub status: PacingStatus,
    pub current_day: u32,
    pub period_length: u32,
    pub daily_amount: f64,
    pub expected_spend: f64,
    pub days_worth_of_spending: f64,
    pub days_worth_after_purchase: f64,
    pub remaining_amount: f64,
    pub color: String,
    pub icon: String,
    pub label: String,
}
