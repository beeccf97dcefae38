//! Payment method type tags.
//!
//! Every payment method row carries one of these tags; the payment dispatcher
//! routes a checkout to the strategy registered for the tag. The enumeration
//! is closed: adding a provider means adding a variant here and one strategy
//! registration, nothing else.

use serde::{Deserialize, Serialize};

/// The fixed set of supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethodType {
    /// Bank transfer in advance; order ships after funds arrive.
    Prepayment,
    /// Payment on pickup at a physical store.
    PayAtStore,
    Stripe,
    Paypal,
    AmazonPay,
    Klarna,
    Alipay,
    Bitpay,
    GooglePay,
}

impl PaymentMethodType {
    /// All known payment method types, in display order.
    pub const ALL: [Self; 9] = [
        Self::Prepayment,
        Self::PayAtStore,
        Self::Stripe,
        Self::Paypal,
        Self::AmazonPay,
        Self::Klarna,
        Self::Alipay,
        Self::Bitpay,
        Self::GooglePay,
    ];

    /// The wire/database representation of this tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepayment => "prepayment",
            Self::PayAtStore => "pay-at-store",
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
            Self::AmazonPay => "amazon-pay",
            Self::Klarna => "klarna",
            Self::Alipay => "alipay",
            Self::Bitpay => "bitpay",
            Self::GooglePay => "google-pay",
        }
    }

    /// Returns `true` for methods settled without an external provider call.
    #[must_use]
    pub const fn is_offline(self) -> bool {
        matches!(self, Self::Prepayment | Self::PayAtStore)
    }
}

impl std::fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown payment method type: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_roundtrip_all() {
        for tag in PaymentMethodType::ALL {
            let parsed: PaymentMethodType = tag.as_str().parse().expect("parse");
            assert_eq!(parsed, tag);
        }
        assert!("sofort".parse::<PaymentMethodType>().is_err());
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&PaymentMethodType::AmazonPay).expect("serialize");
        assert_eq!(json, "\"amazon-pay\"");
        let back: PaymentMethodType = serde_json::from_str("\"pay-at-store\"").expect("parse");
        assert_eq!(back, PaymentMethodType::PayAtStore);
    }

    #[test]
    fn test_offline_split() {
        assert!(PaymentMethodType::Prepayment.is_offline());
        assert!(PaymentMethodType::PayAtStore.is_offline());
        assert!(!PaymentMethodType::Stripe.is_offline());
        assert!(!PaymentMethodType::GooglePay.is_offline());
    }
}
