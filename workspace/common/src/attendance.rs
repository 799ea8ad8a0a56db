use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the marking sheet shows for a student on a day.
///
/// `Unmarked` means no record exists yet. It is not the same as `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    Unmarked,
    Present,
    Absent,
}

impl MarkState {
    /// The form code pre-selected for this state, empty when unmarked.
    pub fn code(&self) -> &'static str {
        match self {
            MarkState::Unmarked => "",
            MarkState::Present => "P",
            MarkState::Absent => "A",
        }
    }
}

/// Share of present days among marked days, in percent, rounded to 2 places.
///
/// Zero marked days yields zero rather than an undefined ratio.
pub fn attendance_percentage(present: u64, absent: u64) -> Decimal {
    let total = present + absent;
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(present) * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
}
