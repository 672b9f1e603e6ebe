//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers and pure rules for common domain
//! concepts.

pub mod coupon;
pub mod email;
pub mod id;
pub mod pricing;
pub mod status;

pub use coupon::{CouponRejection, CouponTerms, InvalidDiscount, normalize_code, validate_discount};
pub use email::{Email, EmailError};
pub use id::*;
pub use pricing::InvoiceTotals;
pub use status::*;
