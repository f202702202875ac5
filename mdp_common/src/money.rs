use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::op;

/// Denominator for rates expressed in basis points. 10% == 1_000 bps.
pub const BASIS_POINTS: i64 = 10_000;

//--------------------------------------        Money        ---------------------------------------------------------
/// An amount of money in the minor unit of the platform currency. Prices, discounts, fees and balances are all
/// integers; there is no floating point anywhere in the money path.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(Money: binary[Add::add, Sub::sub] assign[AddAssign::add_assign, SubAssign::sub_assign] unary[Neg::neg]);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}¤", self.0)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies the amount by `bps / 10_000`, rounding half away from zero.
    ///
    /// The intermediate product is widened to i128 so that large balances cannot overflow.
    pub fn apply_rate_bps(&self, bps: i64) -> Self {
        let product = i128::from(self.0) * i128::from(bps);
        let denom = i128::from(BASIS_POINTS);
        let half = denom / 2;
        let rounded = if product >= 0 { (product + half) / denom } else { (product - half) / denom };
        #[allow(clippy::cast_possible_truncation)]
        Self(rounded as i64)
    }
}
