//! Per-report-view state.
//!
//! Each open report view owns its own snapshot, derived aggregate rows and
//! filter state; nothing is shared between concurrent views. A fetch that
//! fails, or that finishes after a newer request started, leaves the
//! previously applied data untouched, so the UI keeps rendering what it had.

use std::sync::Arc;

use tracing::{debug, info};

use crate::aggregation;
use crate::discount::{self, FilterSelector};
use crate::ingest::{GenerationToken, RequestGeneration};
use crate::models::{
    AggregateRow, DiscountFilterState, PaymentReportSnapshot, TransactionRecord,
};

/// UI-shell capability for the loading overlay. The engine never toggles
/// UI chrome itself; it calls through this seam when a sink is attached.
pub trait OverlaySink: Send + Sync {
    fn set_overlay_visible(&self, visible: bool);
}

/// State of one payment report view.
#[derive(Default)]
pub struct PaymentReportView {
    generation: RequestGeneration,
    snapshot: Option<PaymentReportSnapshot>,
    aggregates: Vec<AggregateRow>,
    filter_state: DiscountFilterState,
    selector: FilterSelector,
    overlay: Option<Arc<dyn OverlaySink>>,
}

impl PaymentReportView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the UI shell's overlay capability.
    pub fn with_overlay(mut self, overlay: Arc<dyn OverlaySink>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Start a new fetch, superseding any in-flight one.
    pub fn begin_request(&self) -> GenerationToken {
        self.set_overlay(true);
        self.generation.begin()
    }

    /// Apply a fetched snapshot if its request is still the newest one.
    ///
    /// Returns `false` (and changes nothing) when the token was
    /// superseded; the stale result is simply dropped. On success the
    /// aggregate rows are recomputed from the new cart details.
    pub fn apply_snapshot(
        &mut self,
        snapshot: PaymentReportSnapshot,
        token: GenerationToken,
    ) -> bool {
        if !self.generation.is_current(token) {
            debug!("discarding superseded report snapshot");
            return false;
        }

        self.aggregates = aggregation::aggregate(&snapshot.cart_details);
        info!(
            transactions = snapshot.transactions.len(),
            aggregate_rows = self.aggregates.len(),
            "applied report snapshot"
        );
        self.snapshot = Some(snapshot);
        self.set_overlay(false);
        true
    }

    /// Mark a fetch as finished without data (error path). Previously
    /// applied data stays rendered; only the overlay is released.
    pub fn finish_request(&self) {
        self.set_overlay(false);
    }

    /// Flip one discount toggle and re-derive the selector. Never
    /// triggers a refetch.
    pub fn set_discount_toggle(&mut self, index: usize, value: bool) {
        self.filter_state.set(index, value);
        self.selector = discount::classify(&self.filter_state);
        debug!(selector = ?self.selector, "re-derived discount selector");
    }

    pub fn filter_state(&self) -> &DiscountFilterState {
        &self.filter_state
    }

    pub fn selector(&self) -> &FilterSelector {
        &self.selector
    }

    /// The currently applied snapshot, if any fetch has succeeded yet.
    pub fn snapshot(&self) -> Option<&PaymentReportSnapshot> {
        self.snapshot.as_ref()
    }

    /// Aggregate income rows for the applied snapshot.
    pub fn aggregates(&self) -> &[AggregateRow] {
        &self.aggregates
    }

    /// Transactions passing the current discount filter, original order.
    pub fn visible_transactions(&self) -> Vec<&TransactionRecord> {
        match &self.snapshot {
            Some(snapshot) => discount::filter(&snapshot.transactions, &self.selector),
            None => Vec::new(),
        }
    }

    fn set_overlay(&self, visible: bool) {
        if let Some(overlay) = &self.overlay {
            overlay.set_overlay_visible(visible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartLineItem, DiscountType, TransactionStatus};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn tx(id: u64, discount_type: DiscountType) -> TransactionRecord {
        TransactionRecord {
            id,
            invoice_number: format!("INV-{id:04}"),
            status: TransactionStatus::Paid,
            subtotal: 10_000.0,
            total: 10_000.0,
            total_refund: 0.0,
            discount_type: Some(discount_type),
            discount_amount: 0.0,
            payment_type_id: None,
            payment_type_name: None,
            created_at: "2026-03-01T10:00:00Z".into(),
            updated_at: None,
        }
    }

    fn item(menu_id: u64, qty: i64, total: f64) -> CartLineItem {
        CartLineItem {
            transaction_id: 1,
            menu_id,
            variant_id: None,
            menu_name: format!("Menu {menu_id}"),
            variant_name: None,
            menu_type: None,
            quantity: qty,
            unit_price: total / qty as f64,
            total_price: total,
            discount_percent: 0.0,
            discount_amount: 0.0,
        }
    }

    fn snapshot(tx_ids: &[u64]) -> PaymentReportSnapshot {
        PaymentReportSnapshot {
            transactions: tx_ids.iter().map(|id| tx(*id, DiscountType::None)).collect(),
            cart_details: vec![item(1, 2, 20_000.0), item(1, 1, 10_000.0)],
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_recomputes_aggregates() {
        let mut view = PaymentReportView::new();
        let token = view.begin_request();

        assert!(view.apply_snapshot(snapshot(&[1]), token));
        assert_eq!(view.aggregates().len(), 1);
        assert_eq!(view.aggregates()[0].total_quantity, 3);
    }

    #[test]
    fn test_superseded_snapshot_is_discarded() {
        let mut view = PaymentReportView::new();

        let stale = view.begin_request();
        let fresh = view.begin_request();

        // The older fetch finishing late must not overwrite anything.
        assert!(!view.apply_snapshot(snapshot(&[99]), stale));
        assert!(view.snapshot().is_none());

        assert!(view.apply_snapshot(snapshot(&[1, 2]), fresh));
        assert_eq!(view.snapshot().unwrap().transactions.len(), 2);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_data() {
        let mut view = PaymentReportView::new();
        let token = view.begin_request();
        view.apply_snapshot(snapshot(&[1, 2]), token);

        // Next request fails: caller applies nothing and just finishes.
        let _failed = view.begin_request();
        view.finish_request();

        assert_eq!(view.snapshot().unwrap().transactions.len(), 2);
        assert_eq!(view.aggregates().len(), 1);
    }

    #[test]
    fn test_toggles_filter_without_refetch() {
        let mut view = PaymentReportView::new();
        let token = view.begin_request();
        let mut snap = snapshot(&[]);
        snap.transactions = vec![
            tx(1, DiscountType::None),
            tx(2, DiscountType::Cart),
            tx(3, DiscountType::PerItem),
        ];
        view.apply_snapshot(snap, token);

        assert_eq!(view.visible_transactions().len(), 3);

        view.set_discount_toggle(1, true);
        let visible: Vec<u64> = view.visible_transactions().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![2]);

        view.set_discount_toggle(0, true);
        view.set_discount_toggle(2, true);
        assert_eq!(view.visible_transactions().len(), 3);
    }

    #[test]
    fn test_overlay_sink_tracks_fetch_lifecycle() {
        struct CountingSink(AtomicI32);
        impl OverlaySink for CountingSink {
            fn set_overlay_visible(&self, visible: bool) {
                self.0.fetch_add(if visible { 1 } else { -1 }, Ordering::SeqCst);
            }
        }

        let sink = Arc::new(CountingSink(AtomicI32::new(0)));
        let mut view = PaymentReportView::new().with_overlay(sink.clone());

        let token = view.begin_request();
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);

        view.apply_snapshot(snapshot(&[1]), token);
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);

        view.begin_request();
        view.finish_request();
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
    }
}
