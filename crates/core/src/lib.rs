//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `api` - The public JSON REST API server
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure business rules - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be unit tested without any infrastructure.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, pricing, coupon rules, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
