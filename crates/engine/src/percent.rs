//! Two-decimal percentages stored as basis points.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Money;

/// A percentage with two fractional digits, stored as **basis points**
/// (`1 bp = 0.01 %`, so `10.00 %` is `1000`).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    #[must_use]
    pub const fn from_basis_points(bp: i64) -> Self {
        Self(bp)
    }

    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }

    /// `100 * part / whole`, rounded half away from zero to two decimals.
    ///
    /// Returns `None` when `whole` is zero.
    #[must_use]
    pub fn ratio(part: Money, whole: Money) -> Option<Self> {
        if whole.is_zero() {
            return None;
        }
        let bp = div_round_half_away(i128::from(part.minor()) * 10_000, i128::from(whole.minor()));
        i64::try_from(bp).ok().map(Self)
    }
}

fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
