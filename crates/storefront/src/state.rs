//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::middleware::CartRateLimiter;
use crate::payment::PaymentDispatcher;
use crate::services::{LogNotifier, Notifier};
use crate::store::CheckoutStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources: configuration, the storage backend, the payment strategy
/// table, the notifier seam, and the add-to-cart rate limiter.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn CheckoutStore>,
    payments: Arc<PaymentDispatcher>,
    notifier: Arc<dyn Notifier>,
    cart_limiter: CartRateLimiter,
}

impl AppState {
    /// Create application state with the default payment table (from
    /// configuration) and the logging notifier.
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn CheckoutStore>) -> Self {
        let payments = Arc::new(PaymentDispatcher::from_config(&config.payment));
        Self::with_collaborators(config, store, payments, Arc::new(LogNotifier))
    }

    /// Create application state with explicit collaborators. Used by tests
    /// to substitute payment strategies or the notifier.
    #[must_use]
    pub fn with_collaborators(
        config: StorefrontConfig,
        store: Arc<dyn CheckoutStore>,
        payments: Arc<PaymentDispatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cart_limiter = CartRateLimiter::new(&config.rate_limit);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                payments,
                notifier,
                cart_limiter,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the storage backend handle.
    #[must_use]
    pub fn store(&self) -> Arc<dyn CheckoutStore> {
        Arc::clone(&self.inner.store)
    }

    /// Get the payment dispatcher.
    #[must_use]
    pub fn payments(&self) -> Arc<PaymentDispatcher> {
        Arc::clone(&self.inner.payments)
    }

    /// Get the order notifier.
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.inner.notifier)
    }

    /// Get the add-to-cart rate limiter.
    #[must_use]
    pub fn cart_limiter(&self) -> &CartRateLimiter {
        &self.inner.cart_limiter
    }
}
