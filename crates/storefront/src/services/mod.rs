//! Business logic for the checkout pipeline.
//!
//! Services sit between the HTTP layer and the store: routes do shape
//! validation and session bookkeeping, services own the pipeline semantics,
//! the store owns atomicity.

pub mod cart;
pub mod checkout;
pub mod notify;
pub mod stock;

pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutInput, CheckoutOutcome, CheckoutService};
pub use notify::{LogNotifier, Notifier, NotifyError};
