//! Discount-type filtering for the transaction list.
//!
//! The UI exposes three toggles (no discount / cart discount / per-item
//! discount). Classification maps the toggle state to a selector over the
//! already-fetched transaction list; toggling never refetches. Zero toggles
//! and all three toggles both mean "show everything"; that asymmetry is
//! how the business rule is defined, not an accident.

use serde::{Deserialize, Serialize};

use crate::models::{DiscountFilterState, TransactionRecord};

/// Which discount types the transaction list should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSelector {
    /// No filtering; every transaction passes in original order.
    #[default]
    ShowAll,
    /// Exact subset of discount types to keep, indexed by
    /// [`crate::models::DiscountType::index`].
    Subset([bool; 3]),
}

/// Derive the selector for the current toggle state.
///
/// Zero or three active toggles collapse to [`FilterSelector::ShowAll`];
/// any other combination selects exactly the toggled subset.
pub fn classify(state: &DiscountFilterState) -> FilterSelector {
    let toggles = state.toggles();
    let active = toggles.iter().filter(|t| **t).count();

    if active == 0 || active == toggles.len() {
        FilterSelector::ShowAll
    } else {
        FilterSelector::Subset(toggles)
    }
}

/// Whether a transaction passes the selector.
pub fn matches(tx: &TransactionRecord, selector: &FilterSelector) -> bool {
    match selector {
        FilterSelector::ShowAll => true,
        FilterSelector::Subset(included) => included[tx.discount_type().index()],
    }
}

/// Filter a transaction list in memory, preserving the original order.
pub fn filter<'a>(
    transactions: &'a [TransactionRecord],
    selector: &FilterSelector,
) -> Vec<&'a TransactionRecord> {
    transactions
        .iter()
        .filter(|tx| matches(tx, selector))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountType, TransactionStatus};

    fn tx(id: u64, discount_type: DiscountType) -> TransactionRecord {
        TransactionRecord {
            id,
            invoice_number: format!("INV-{id:04}"),
            status: TransactionStatus::Paid,
            subtotal: 50_000.0,
            total: 50_000.0,
            total_refund: 0.0,
            discount_type: Some(discount_type),
            discount_amount: 0.0,
            payment_type_id: Some(1),
            payment_type_name: Some("Cash".into()),
            created_at: "2026-03-01T10:00:00Z".into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_all_false_and_all_true_both_mean_show_all() {
        let none = DiscountFilterState::new(false, false, false);
        let all = DiscountFilterState::new(true, true, true);

        assert_eq!(classify(&none), FilterSelector::ShowAll);
        assert_eq!(classify(&all), FilterSelector::ShowAll);
        assert_eq!(classify(&none), classify(&all));
    }

    #[test]
    fn test_single_toggle_selects_exactly_that_type() {
        let state = DiscountFilterState::new(true, false, false);
        let selector = classify(&state);

        assert_eq!(selector, FilterSelector::Subset([true, false, false]));
        assert!(matches(&tx(1, DiscountType::None), &selector));
        assert!(!matches(&tx(2, DiscountType::Cart), &selector));
        assert!(!matches(&tx(3, DiscountType::PerItem), &selector));
    }

    #[test]
    fn test_two_toggles_retain_expected_indices() {
        // toggles (true, true, false) over discount types [0, 1, 2, 0]
        // must retain indices 0, 1 and 3.
        let txs = vec![
            tx(10, DiscountType::None),
            tx(11, DiscountType::Cart),
            tx(12, DiscountType::PerItem),
            tx(13, DiscountType::None),
        ];
        let selector = classify(&DiscountFilterState::new(true, true, false));

        let kept: Vec<u64> = filter(&txs, &selector).iter().map(|t| t.id).collect();
        assert_eq!(kept, vec![10, 11, 13]);
    }

    #[test]
    fn test_show_all_preserves_original_order() {
        let txs = vec![
            tx(3, DiscountType::PerItem),
            tx(1, DiscountType::None),
            tx(2, DiscountType::Cart),
        ];
        let selector = classify(&DiscountFilterState::default());

        let kept: Vec<u64> = filter(&txs, &selector).iter().map(|t| t.id).collect();
        assert_eq!(kept, vec![3, 1, 2]);
    }

    #[test]
    fn test_reclassify_after_toggle_change() {
        let mut state = DiscountFilterState::new(false, true, false);
        assert_eq!(classify(&state), FilterSelector::Subset([false, true, false]));

        state.set(0, true);
        state.set(2, true);
        assert_eq!(classify(&state), FilterSelector::ShowAll);
    }

    #[test]
    fn test_missing_discount_type_defaults_to_none() {
        let mut t = tx(1, DiscountType::None);
        t.discount_type = None;

        let only_none = classify(&DiscountFilterState::new(true, false, false));
        assert!(matches(&t, &only_none));
    }
}
