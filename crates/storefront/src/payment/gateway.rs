//! HTTP gateway client for online payment providers.
//!
//! Each online provider sits behind its own gateway endpoint speaking the
//! normalized charge contract below; the provider's actual wire protocol is
//! terminated at that endpoint and is out of scope here.

use std::time::Duration;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Connection settings for one provider gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Charge endpoint.
    pub endpoint: Url,
    /// Bearer secret for the gateway.
    pub secret_key: SecretString,
}

/// Errors from a gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure (connect, TLS, decode).
    #[error("gateway transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway rejected the charge: HTTP {status}")]
    Rejected { status: StatusCode },
}

/// A normalized charge request.
#[derive(Debug, Serialize)]
pub struct ChargeRequest<'a> {
    pub amount: Decimal,
    pub currency: &'a str,
    /// The order number; shows up in provider dashboards.
    pub reference: &'a str,
    /// Provider token collected client-side.
    pub token: &'a str,
}

/// A normalized charge response.
#[derive(Debug, Deserialize)]
pub struct ChargeResponse {
    pub approved: bool,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reqwest-backed gateway client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: Url,
    secret_key: SecretString,
}

impl HttpGateway {
    /// Build a client for one gateway. `timeout` bounds the whole request;
    /// the dispatcher enforces its own, slightly larger bound on top.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying client cannot be built.
    pub fn new(config: &GatewayConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Execute a charge.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on transport failures or non-2xx responses.
    /// A decline is NOT an error: it comes back as `approved == false`.
    pub async fn charge(&self, request: &ChargeRequest<'_>) -> Result<ChargeResponse, GatewayError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.secret_key.expose_secret())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected { status });
        }
        Ok(response.json::<ChargeResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_charge_request_serializes_amount_as_string() {
        let request = ChargeRequest {
            amount: dec!(29.99),
            currency: "USD",
            reference: "ORD-1",
            token: "tok_visa",
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["amount"], "29.99");
        assert_eq!(json["token"], "tok_visa");
    }

    #[test]
    fn test_charge_response_defaults() {
        let response: ChargeResponse =
            serde_json::from_str(r#"{"approved": false}"#).expect("parse");
        assert!(!response.approved);
        assert!(response.transaction_id.is_none());
        assert!(response.message.is_none());
    }
}
