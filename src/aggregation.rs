//! Cart/refund line-item aggregation for the income report.
//!
//! Groups line items by (menu_id, variant_id) and sums quantity and total
//! price per group. Pure and idempotent: re-running over the same input
//! yields the same rows, and the output sums always equal the input sums.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{AggregateRow, CartLineItem, RefundLineItem, NO_VARIANT};

/// Read-only view of a line item for grouping purposes.
///
/// Cart and refund line items share every field the fold needs; this
/// trait is the seam that lets [`aggregate`] consume either.
pub trait LineItem {
    fn menu_id(&self) -> u64;
    fn variant_id(&self) -> Option<u64>;
    fn menu_name(&self) -> &str;
    fn variant_name(&self) -> Option<&str>;
    fn menu_type(&self) -> Option<&str> {
        None
    }
    fn quantity(&self) -> i64;
    fn unit_price(&self) -> f64;
    fn total_price(&self) -> f64;

    /// Variant id with the null sentinel applied.
    fn variant_or_sentinel(&self) -> u64 {
        self.variant_id().unwrap_or(NO_VARIANT)
    }
}

impl LineItem for CartLineItem {
    fn menu_id(&self) -> u64 {
        self.menu_id
    }
    fn variant_id(&self) -> Option<u64> {
        self.variant_id
    }
    fn menu_name(&self) -> &str {
        &self.menu_name
    }
    fn variant_name(&self) -> Option<&str> {
        self.variant_name.as_deref()
    }
    fn menu_type(&self) -> Option<&str> {
        self.menu_type.as_deref()
    }
    fn quantity(&self) -> i64 {
        self.quantity
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
    fn total_price(&self) -> f64 {
        self.total_price
    }
}

impl LineItem for RefundLineItem {
    fn menu_id(&self) -> u64 {
        self.menu_id
    }
    fn variant_id(&self) -> Option<u64> {
        self.variant_id
    }
    fn menu_name(&self) -> &str {
        &self.menu_name
    }
    fn variant_name(&self) -> Option<&str> {
        self.variant_name.as_deref()
    }
    fn quantity(&self) -> i64 {
        self.quantity
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
    fn total_price(&self) -> f64 {
        self.total_price
    }
}

/// Group line items by (menu_id, variant_id) and accumulate sums.
///
/// Accepts cart or refund line items through the [`LineItem`] view.
/// `variant_id = None` is treated as the sentinel variant 0, so an item
/// without a variant groups with other variantless items of the same menu.
/// The first occurrence of a key seeds the row (menu name, unit price and
/// friends copied from that item, sums starting at zero); every occurrence
/// including the first adds its quantity and total price.
///
/// Output is sorted ascending by menu display name, case-insensitively;
/// ties keep first-occurrence order (stable sort). Empty input yields an
/// empty vec, not an error.
pub fn aggregate<T: LineItem>(items: &[T]) -> Vec<AggregateRow> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();

    for item in items {
        let key = (item.menu_id(), item.variant_or_sentinel());
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(AggregateRow {
                menu_id: item.menu_id(),
                variant_id: item.variant_or_sentinel(),
                menu_name: item.menu_name().to_string(),
                variant_name: item.variant_name().map(|v| v.to_string()),
                menu_type: item.menu_type().map(|t| t.to_string()),
                unit_price: item.unit_price(),
                total_quantity: 0,
                total_price: 0.0,
            });
            rows.len() - 1
        });

        rows[slot].total_quantity += item.quantity();
        rows[slot].total_price += item.total_price();
    }

    rows.sort_by(|a, b| {
        a.menu_name
            .to_lowercase()
            .cmp(&b.menu_name.to_lowercase())
    });

    debug!(
        input_items = items.len(),
        output_rows = rows.len(),
        "aggregated line items"
    );

    rows
}
