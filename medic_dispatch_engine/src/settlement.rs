//! Platform take and medic earnings.
//!
//! All amounts are integer minor units. The commission is expressed in basis points so that no floating point maths
//! touches money.
use mdp_common::Money;
use thiserror::Error;

/// 10% of the net price
pub const PLATFORM_COMMISSION_BPS: i64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Discount {discount} must not be negative")]
    NegativeDiscount { discount: Money },
    #[error("Discount {discount} exceeds the price {price}")]
    DiscountExceedsPrice { price: Money, discount: Money },
    #[error("Price {0} must not be negative")]
    NegativePrice(Money),
}

/// `round((price - discount) * 10%)`, after checking that `0 <= discount <= price`.
pub fn platform_fee(price: Money, discount: Money) -> Result<Money, SettlementError> {
    if price.is_negative() {
        return Err(SettlementError::NegativePrice(price));
    }
    if discount.is_negative() {
        return Err(SettlementError::NegativeDiscount { discount });
    }
    if discount > price {
        return Err(SettlementError::DiscountExceedsPrice { price, discount });
    }
    Ok((price - discount).apply_rate_bps(PLATFORM_COMMISSION_BPS))
}

/// The amount credited to the medic's balance when an order is done.
pub fn provider_earnings(price: Money, discount: Money, fee: Money) -> Money {
    price - discount - fee
}

/// Folds one new review into a running average.
///
/// Only the average and the review count are stored, so the result is rounded to two decimals each time.
pub fn recompute_rating(current: Option<f64>, review_count: i64, stars: u8) -> (f64, i64) {
    let count = review_count.max(0);
    let total = current.unwrap_or(0.0) * count as f64 + f64::from(stars);
    let new_count = count + 1;
    let average = total / new_count as f64;
    ((average * 100.0).round() / 100.0, new_count)
}
