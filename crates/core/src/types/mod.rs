//! Core types for Meridian.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod payment;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, OrderTotals};
pub use payment::PaymentMethodType;
pub use status::{InvalidTransition, OrderStatus};
