//! Sales & inventory reconciliation reporting engine.
//!
//! Consolidates point-of-sale transaction/cart/refund records and
//! multi-outlet ingredient-order records into reconciled, filterable,
//! exportable reports. The crate is a library consumed by a UI shell:
//! it fetches one snapshot per report request, computes everything in
//! memory, and hands back plain data (or an xlsx artifact). No database,
//! no rendering, no session handling.
//!
//! Pipeline: [`ingest`] fetches and normalizes raw records; [`aggregation`]
//! folds cart or refund line items into per-(menu, variant) income rows;
//! [`discount`]
//! filters the transaction list from the three UI toggles; [`export`]
//! serializes the sections into a multi-sheet workbook. [`pivot`] consumes
//! ingest output independently to build the cross-outlet ingredient table.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod aggregation;
pub mod discount;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod pivot;
pub mod view;

pub use error::ReportError;

static TRACING_INIT: Once = Once::new();

/// Install the default tracing subscriber (env-filtered, compact fmt).
///
/// Embedding shells that bring their own subscriber just skip this.
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("outlet_reports=info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    });
}
