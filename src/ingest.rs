//! Record ingestion: request validation, the backend fetch boundary, and
//! raw-record normalization.
//!
//! The engine never touches a database; it asks the backend report API for
//! a snapshot and normalizes it in memory. Validation runs before any
//! fetch so an invalid date range never costs a round trip. Each report
//! view drives its fetches through a [`RequestGeneration`] counter so that
//! a newer request always supersedes an older in-flight one
//! (last-request-wins); results from a superseded fetch are discarded by
//! the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ReportError;
use crate::models::{
    CartLineItem, DateRange, DiscountType, OrderPivotSnapshot, PaymentReportSnapshot,
    RefundLineItem, TransactionRecord, NO_VARIANT,
};

/// Default timeout for report fetches (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Parameters for a payment report fetch.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReportRequest {
    pub outlet_id: u64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `None` means all shifts of the period.
    pub shift_number: Option<u32>,
}

impl PaymentReportRequest {
    /// Check the date range before any fetch happens.
    ///
    /// Both bounds must be present and ordered; a single-day report uses
    /// the same date for both.
    pub fn validate(&self) -> Result<DateRange, ReportError> {
        let (start, end) = match (self.start_date, self.end_date) {
            (Some(s), Some(e)) => (s, e),
            (None, Some(_)) => {
                return Err(ReportError::Validation("start date is missing".into()))
            }
            (Some(_), None) => return Err(ReportError::Validation("end date is missing".into())),
            (None, None) => {
                return Err(ReportError::Validation("no date range selected".into()))
            }
        };

        if start > end {
            return Err(ReportError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }

        Ok(DateRange { start, end })
    }
}

/// Parameters for an ingredient-order pivot fetch.
/// `outlet_id = None` requests all outlets.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PivotRequest {
    pub outlet_id: Option<u64>,
}

// ---------------------------------------------------------------------------
// Last-request-wins generation tokens
// ---------------------------------------------------------------------------

/// Monotonic request counter owned by one report view.
///
/// `begin()` bumps the generation and returns a token for the new fetch;
/// any token from an earlier `begin()` stops being current, which is how
/// stale responses get dropped without cancelling the transport.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    counter: AtomicU64,
}

/// Token identifying one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationToken(u64);

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding all earlier ones.
    pub fn begin(&self) -> GenerationToken {
        GenerationToken(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` still belongs to the newest request.
    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.counter.load(Ordering::SeqCst) == token.0
    }
}

// ---------------------------------------------------------------------------
// HTTP fetch boundary
// ---------------------------------------------------------------------------

/// Backend report API configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Applied to every request; callers tune it per deployment.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Normalise the backend base URL: ensure a scheme, strip trailing
/// slashes and a trailing `/api` segment.
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }
    while url.ends_with('/') {
        url.pop();
    }

    url
}

/// HTTP client for the two report queries.
pub struct ReportClient {
    http: Client,
    base_url: String,
}

impl ReportClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ReportError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReportError::fetch(format!("failed to create HTTP client: {e}"), false))?;

        Ok(Self {
            http,
            base_url: normalize_base_url(&config.base_url),
        })
    }

    /// Fetch the payment report snapshot for a validated request.
    ///
    /// Validation errors surface before the request leaves the process.
    pub async fn fetch_payment_report(
        &self,
        request: &PaymentReportRequest,
    ) -> Result<PaymentReportSnapshot, ReportError> {
        let range = request.validate()?;
        let request_id = Uuid::new_v4();

        let mut url = format!(
            "{}/api/reports/payments?outlet_id={}&start_date={}&end_date={}",
            self.base_url, request.outlet_id, range.start, range.end
        );
        if let Some(shift) = request.shift_number {
            url.push_str(&format!("&shift_number={shift}"));
        }

        info!(%request_id, outlet_id = request.outlet_id, "fetching payment report");

        let mut snapshot: PaymentReportSnapshot = self
            .get_json(&url, &format!("payment report {} to {}", range.start, range.end))
            .await?;
        normalize_snapshot(&mut snapshot);

        info!(
            %request_id,
            transactions = snapshot.transactions.len(),
            cart_items = snapshot.cart_details.len(),
            "payment report fetched"
        );

        Ok(snapshot)
    }

    /// Fetch the ingredient-order pivot snapshot; all outlets when the
    /// request carries no outlet id.
    pub async fn fetch_order_pivot(
        &self,
        request: &PivotRequest,
    ) -> Result<OrderPivotSnapshot, ReportError> {
        let url = match request.outlet_id {
            Some(id) => format!("{}/api/reports/ingredient-orders?outlet_id={id}", self.base_url),
            None => format!("{}/api/reports/ingredient-orders", self.base_url),
        };

        self.get_json(&url, "ingredient order pivot").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        context: &str,
    ) -> Result<T, ReportError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, context, "report fetch returned error status");
            return Err(status_to_error(status, context));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ReportError::fetch(format!("invalid response body: {e}"), false))
    }
}

/// Map a transport failure onto the error taxonomy. Connection problems
/// and timeouts are retryable; everything else is not.
fn transport_error(err: &reqwest::Error) -> ReportError {
    if err.is_timeout() {
        ReportError::fetch("request timed out", true)
    } else if err.is_connect() {
        ReportError::fetch("cannot reach the report backend", true)
    } else {
        ReportError::fetch(format!("network error: {err}"), false)
    }
}

/// Map an HTTP error status onto the taxonomy: 404 means "no data for
/// this selection", 5xx is retryable, other 4xx is not.
fn status_to_error(status: StatusCode, context: &str) -> ReportError {
    match status.as_u16() {
        404 => ReportError::not_found(context),
        s if s >= 500 => ReportError::fetch(format!("backend server error (HTTP {s})"), true),
        s => ReportError::fetch(format!("request rejected (HTTP {s})"), false),
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Apply the sentinel and derivation rules to a freshly fetched snapshot.
///
/// - nullable `variant_id` becomes the sentinel 0 on cart and refund items;
/// - transactions without a `discount_type` get one derived from their
///   line items (any per-item discount → per-item; else a transaction
///   discount amount → cart; else none).
pub fn normalize_snapshot(snapshot: &mut PaymentReportSnapshot) {
    for item in &mut snapshot.cart_details {
        normalize_cart_item(item);
    }
    for group in &mut snapshot.refund_details {
        for item in group.iter_mut() {
            normalize_refund_item(item);
        }
    }

    for tx in &mut snapshot.transactions {
        if tx.discount_type.is_none() {
            tx.discount_type = Some(derive_discount_type(tx, &snapshot.cart_details));
        }
    }
}

fn normalize_cart_item(item: &mut CartLineItem) {
    if item.variant_id.is_none() {
        item.variant_id = Some(NO_VARIANT);
    }
}

fn normalize_refund_item(item: &mut RefundLineItem) {
    if item.variant_id.is_none() {
        item.variant_id = Some(NO_VARIANT);
    }
}

/// Derive the discount scope of a transaction from its line items.
fn derive_discount_type(tx: &TransactionRecord, cart_details: &[CartLineItem]) -> DiscountType {
    let any_item_discount = cart_details
        .iter()
        .filter(|item| item.transaction_id == tx.id)
        .any(|item| item.discount_amount > 0.0 || item.discount_percent > 0.0);

    if any_item_discount {
        DiscountType::PerItem
    } else if tx.discount_amount > 0.0 {
        DiscountType::Cart
    } else {
        DiscountType::None
    }
}
