//! Price, exposed stock and variant pricing.

use dekk_core::{AttributeKey, AttributeSet, CatalogVariant};
use rust_decimal::Decimal;

use crate::extract::HAS_STUDS_YES;

/// Units held back from sale for every product.
pub const RESERVED_STOCK: u32 = 4;

/// Rims at or above this size get the larger stud surcharge.
pub const LARGE_RIM_INCHES: u32 = 18;

const STUD_SURCHARGE_SMALL: i64 = 3000;
const STUD_SURCHARGE_LARGE: i64 = 4000;

/// `raw - markup`. Supplier A prices already include VAT at this point.
///
/// `None` when the result does not fit a [`Decimal`].
#[must_use]
pub fn final_price(raw_price: Decimal, markup: Decimal) -> Option<Decimal> {
    raw_price.checked_sub(markup)
}

/// Stock shown to customers: `max(0, raw - 4)`.
#[must_use]
pub fn exposed_stock(raw_quantity: u32) -> i64 {
    i64::from(raw_quantity.saturating_sub(RESERVED_STOCK))
}

/// Price of fitting studs on one tire.
#[must_use]
pub fn stud_surcharge(rim_diameter_inches: u32) -> Decimal {
    if rim_diameter_inches >= LARGE_RIM_INCHES {
        Decimal::from(STUD_SURCHARGE_LARGE)
    } else {
        Decimal::from(STUD_SURCHARGE_SMALL)
    }
}

/// One child variant per value of the variation attribute, if there is one.
///
/// The studded (`hasStuds=yes`) variant carries the stud surcharge; every
/// other variant is priced at `price`. Returns `None` if the surcharge
/// overflows the price.
#[must_use]
pub fn build_variants(
    sku: &str,
    attrs: &AttributeSet,
    price: Decimal,
    stock: i64,
    rim_diameter_inches: u32,
) -> Option<Vec<CatalogVariant>> {
    let Some(variation) = attrs.variation() else {
        return Some(Vec::new());
    };

    variation
        .values
        .iter()
        .map(|value| {
            let studded = variation.key == AttributeKey::HasStuds && value == HAS_STUDS_YES;
            let variant_price = if studded {
                price.checked_add(stud_surcharge(rim_diameter_inches))?
            } else {
                price
            };
            Some(CatalogVariant {
                sku: format!("{sku}-{value}"),
                price: variant_price,
                stock_quantity: stock,
                attribute_key: variation.key,
                attribute_value: value.clone(),
            })
        })
        .collect()
}
