//! Integration tests for Meridian.
//!
//! Tests drive the real storefront router in-process (via
//! `tower::ServiceExt::oneshot`) against the in-memory storage backend, so
//! the whole suite runs hermetically - no database, no network, no running
//! server.
//!
//! [`TestHarness`] builds the app once per test; [`TestClient`] is one
//! browser-like session with its own cookie jar. Two clients on the same
//! harness are two shoppers sharing the store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use meridian_core::{CurrencyCode, PaymentMethodType};
use meridian_storefront::config::{
    PaymentConfig, RateLimitConfig, StoreBackend, StorefrontConfig,
};
use meridian_storefront::payment::GatewayConfig;
use meridian_storefront::state::AppState;
use meridian_storefront::store::{CheckoutStore, MemoryStore, seed};

/// The base URL the test configuration claims; origin checks compare
/// against it.
pub const BASE_URL: &str = "http://localhost:3000";

/// A storefront app over a seeded in-memory store.
pub struct TestHarness {
    router: Router,
    state: AppState,
}

impl TestHarness {
    /// Build the app with the demo catalog and the default test config.
    pub async fn spawn() -> Self {
        Self::with_config(test_config()).await
    }

    /// Build the app with a custom configuration.
    pub async fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed::demo_catalog(store.as_ref())
            .await
            .expect("demo catalog seeds");
        let state = AppState::new(config, store);
        let router =
            meridian_storefront::app(state.clone(), tower_sessions::MemoryStore::default());
        Self { router, state }
    }

    /// A fresh shopper session (empty cookie jar).
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Direct handle on the storage backend, for assertions.
    #[must_use]
    pub fn store(&self) -> Arc<dyn CheckoutStore> {
        self.state.store()
    }
}

/// One shopper's HTTP session against the harness.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    /// Send a request, tracking the session cookie like a browser would.
    /// Returns the status and the parsed JSON body (`Null` when empty,
    /// a JSON string for non-JSON bodies).
    pub async fn send(
        &mut self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie.as_str());
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let cookie = set_cookie
                .to_str()
                .expect("cookie is ascii")
                .split(';')
                .next()
                .unwrap_or_default()
                .to_owned();
            self.cookie = Some(cookie);
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// `GET path`.
    pub async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        self.send("GET", path, None, &[]).await
    }

    /// `POST path` with a JSON body.
    pub async fn post(&mut self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", path, Some(body), &[]).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put(&mut self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", path, Some(body), &[]).await
    }

    /// `DELETE path`.
    pub async fn delete(&mut self, path: &str) -> (StatusCode, Value) {
        self.send("DELETE", path, None, &[]).await
    }
}

/// The default test configuration: memory backend, default rate limits, a
/// stripe gateway pointing at a dead endpoint (so card payments decline
/// deterministically without any network).
#[must_use]
pub fn test_config() -> StorefrontConfig {
    let mut payment = PaymentConfig {
        timeout_secs: 2,
        ..PaymentConfig::default()
    };
    payment.gateways.insert(
        PaymentMethodType::Stripe,
        GatewayConfig {
            // Port 9 (discard) is closed; every charge fails at connect time.
            endpoint: url::Url::parse("http://127.0.0.1:9/charges").expect("valid url"),
            secret_key: SecretString::from("sk_test_dead_gateway".to_owned()),
        },
    );
    StorefrontConfig {
        store_backend: StoreBackend::Memory,
        database_url: None,
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        base_url: BASE_URL.to_owned(),
        session_secret: SecretString::from(
            "integration-test-session-secret-0123456789".to_owned(),
        ),
        currency: CurrencyCode::USD,
        rate_limit: RateLimitConfig::default(),
        payment,
        sentry_dsn: None,
    }
}

/// A well-formed `POST /checkout/process` body.
#[must_use]
pub fn checkout_body(payment_method_id: i64, shipping_method_id: i64) -> Value {
    json!({
        "payment_method_id": payment_method_id,
        "shipping_method_id": shipping_method_id,
        "email": "shopper@example.com",
        "name": "Test Shopper",
        "shipping_address": {
            "line1": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        }
    })
}
