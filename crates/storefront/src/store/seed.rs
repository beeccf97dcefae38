//! Demo catalog seeding.
//!
//! The `memory` backend starts empty on every boot, so the binary seeds a
//! small catalog to make the API usable out of the box. Production data
//! arrives through the catalog sync, not through this module.

use rust_decimal::Decimal;

use meridian_core::{ArticleId, PaymentMethodId, PaymentMethodType, ShippingMethodId};

use crate::models::{Article, PaymentMethod, ShippingMethod};

use super::{CheckoutStore, StoreResult};

/// Seed a small demo catalog: three articles, three payment methods, two
/// shipping methods.
///
/// # Errors
///
/// Propagates any store error.
pub async fn demo_catalog(store: &dyn CheckoutStore) -> StoreResult<()> {
    let price = |s: &str| s.parse::<Decimal>().unwrap_or_default();

    let articles = [
        Article {
            id: ArticleId::new(1),
            sku: "MUG-CLASSIC".to_owned(),
            name: "Classic Mug".to_owned(),
            gross_price: price("12.50"),
            stock: 25,
            ignore_stock: false,
            active: true,
        },
        Article {
            id: ArticleId::new(2),
            sku: "POSTER-A2".to_owned(),
            name: "A2 Poster".to_owned(),
            gross_price: price("19.90"),
            stock: 3,
            ignore_stock: false,
            active: true,
        },
        Article {
            id: ArticleId::new(3),
            sku: "GIFT-CARD".to_owned(),
            name: "Digital Gift Card".to_owned(),
            gross_price: price("25.00"),
            stock: 0,
            ignore_stock: true,
            active: true,
        },
    ];
    for article in &articles {
        store.upsert_article(article).await?;
    }

    let payment_methods = [
        PaymentMethod {
            id: PaymentMethodId::new(1),
            name: "Prepayment".to_owned(),
            method_type: PaymentMethodType::Prepayment,
            description: "Pay by bank transfer in advance".to_owned(),
            fee: Decimal::ZERO,
            active: true,
        },
        PaymentMethod {
            id: PaymentMethodId::new(2),
            name: "Pay at store".to_owned(),
            method_type: PaymentMethodType::PayAtStore,
            description: "Pay when you pick up your order".to_owned(),
            fee: Decimal::ZERO,
            active: true,
        },
        PaymentMethod {
            id: PaymentMethodId::new(3),
            name: "Credit card".to_owned(),
            method_type: PaymentMethodType::Stripe,
            description: "Pay by card".to_owned(),
            fee: price("1.50"),
            active: true,
        },
    ];
    for method in &payment_methods {
        store.upsert_payment_method(method).await?;
    }

    let shipping_methods = [
        ShippingMethod {
            id: ShippingMethodId::new(1),
            name: "Standard".to_owned(),
            description: "Tracked parcel".to_owned(),
            price: price("4.99"),
            delivery_time: "2-4 business days".to_owned(),
            active: true,
        },
        ShippingMethod {
            id: ShippingMethodId::new(2),
            name: "Express".to_owned(),
            description: "Courier delivery".to_owned(),
            price: price("12.99"),
            delivery_time: "next business day".to_owned(),
            active: true,
        },
    ];
    for method in &shipping_methods {
        store.upsert_shipping_method(method).await?;
    }

    Ok(())
}
