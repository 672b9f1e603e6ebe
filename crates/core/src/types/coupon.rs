//! Coupon redemption rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Why a coupon cannot be redeemed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    Unknown,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    LimitReached,
    #[error("You have already used this coupon")]
    AlreadyUsed,
}

/// Error returned when creating a coupon with an out-of-range discount.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("discount must be greater than 0 and at most 1")]
pub struct InvalidDiscount;

/// The parts of a coupon the redemption rules look at.
#[derive(Debug, Clone, Copy)]
pub struct CouponTerms {
    pub discount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i64,
}

impl CouponTerms {
    /// Check whether the coupon can be redeemed now.
    ///
    /// `already_used` is whether the redeeming user already has a
    /// redemption on record; anonymous checks pass `false`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies, checked in the
    /// order expiry, usage limit, prior use.
    pub fn check(
        &self,
        now: DateTime<Utc>,
        already_used: bool,
    ) -> Result<Decimal, CouponRejection> {
        if self.expires_at.is_some_and(|exp| exp < now) {
            return Err(CouponRejection::Expired);
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.times_used >= i64::from(limit))
        {
            return Err(CouponRejection::LimitReached);
        }
        if already_used {
            return Err(CouponRejection::AlreadyUsed);
        }
        Ok(self.discount)
    }
}

/// Normalize a user-entered coupon code: trimmed and upper-cased.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validate a coupon discount fraction, which must lie in `(0, 1]`.
///
/// # Errors
///
/// Returns [`InvalidDiscount`] when the value is out of range.
pub fn validate_discount(discount: Decimal) -> Result<Decimal, InvalidDiscount> {
    if discount > Decimal::ZERO && discount <= Decimal::ONE {
        Ok(discount)
    } else {
        Err(InvalidDiscount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn terms() -> CouponTerms {
        CouponTerms {
            discount: Decimal::new(15, 2),
            expires_at: None,
            usage_limit: None,
            times_used: 0,
        }
    }

    #[test]
    fn test_valid_coupon_returns_discount() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(terms().check(now, false), Ok(Decimal::new(15, 2)));
    }

    #[test]
    fn test_expired() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t = CouponTerms {
            expires_at: Some(now - Duration::seconds(1)),
            ..terms()
        };
        assert_eq!(t.check(now, false), Err(CouponRejection::Expired));
    }

    #[test]
    fn test_limit_reached_before_already_used() {
        let now = Utc::now();
        let t = CouponTerms {
            usage_limit: Some(3),
            times_used: 3,
            ..terms()
        };
        assert_eq!(t.check(now, true), Err(CouponRejection::LimitReached));
        let t = CouponTerms {
            usage_limit: Some(3),
            times_used: 2,
            ..terms()
        };
        assert_eq!(t.check(now, true), Err(CouponRejection::AlreadyUsed));
    }

    #[test]
    fn test_normalize_and_validate() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        assert!(validate_discount(Decimal::ONE).is_ok());
        assert!(validate_discount(Decimal::ZERO).is_err());
        assert!(validate_discount(Decimal::new(11, 1)).is_err());
    }
}
