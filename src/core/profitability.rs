//! Shared profitability classification and the per-calculation messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitabilityStatus {
    Profitable,
    Unprofitable,
}

impl std::fmt::Display for ProfitabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ProfitabilityStatus::Profitable => "profitable",
                ProfitabilityStatus::Unprofitable => "unprofitable",
            }
        )
    }
}

/// Whether a zero cost ratio may still count as profitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// `margin > 0 && cost <= margin`
    AllowZeroCost,
    /// `margin > 0 && cost > 0 && cost <= margin`
    RequirePositiveCost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profitability {
    pub is_profitable: bool,
    pub status: ProfitabilityStatus,
}

/// Classifies a cost ratio (ACOS or TACOS, in percent) against the gross
/// margin, which is also the break-even ratio.
pub fn classify(cost_ratio: f64, margin: f64, strictness: Strictness) -> Profitability {
    let cost_ok = match strictness {
        Strictness::AllowZeroCost => true,
        Strictness::RequirePositiveCost => cost_ratio > 0.0,
    };
    let is_profitable = margin > 0.0 && cost_ok && cost_ratio <= margin;
    Profitability {
        is_profitable,
        status: if is_profitable {
            ProfitabilityStatus::Profitable
        } else {
            ProfitabilityStatus::Unprofitable
        },
    }
}

/// Message wording differs per calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    Acos,
    Forecast,
    Budget,
}

/// Human readable verdict. Empty when there is no advertising cost to judge.
pub fn message(style: MessageStyle, cost_ratio: f64, margin: f64, is_profitable: bool) -> String {
    if cost_ratio <= 0.0 {
        return String::new();
    }

    match (style, is_profitable) {
        (MessageStyle::Acos, true) => format!(
            "✅ Campaign is profitable! ACOS ({cost_ratio:.2}%) is within the margin ({margin:.2}%)"
        ),
        (MessageStyle::Acos, false) => format!(
            "⚠️ WARNING: Campaign is unprofitable! ACOS ({cost_ratio:.2}%) exceeds the margin ({margin:.2}%)"
        ),
        (MessageStyle::Forecast, true) => format!(
            "✅ The forecast campaign is profitable! ACOS ({cost_ratio:.0}%) stays below the \
             break-even point ({margin:.0}%), leaving {:.0} percentage points of headroom.",
            margin - cost_ratio
        ),
        (MessageStyle::Forecast, false) => format!(
            "⚠️ WARNING: The forecast campaign is unprofitable! ACOS ({cost_ratio:.0}%) exceeds the \
             gross margin ({margin:.0}%). Consider raising the conversion rate, lowering the cost \
             per click or increasing the average order value."
        ),
        (MessageStyle::Budget, true) => format!(
            "✅ The marketing budget is sustainable! TACOS ({cost_ratio:.1}%) is within the gross margin ({margin:.1}%)"
        ),
        (MessageStyle::Budget, false) => format!(
            "⚠️ WARNING: The marketing budget exceeds what the margin can carry! TACOS \
             ({cost_ratio:.1}%) is above the gross margin ({margin:.1}%). Lower the TACOS target \
             or improve the margin."
        ),
    }
}
