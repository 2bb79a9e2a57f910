//! Report data model for the reconciliation engine.
//!
//! Everything here is a read-only snapshot: records are fetched once per
//! report request, held in memory for the lifetime of the view, and
//! discarded when the view closes or a new request supersedes them. The
//! only post-ingestion mutable state is [`DiscountFilterState`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel variant id meaning "no menu variant selected".
pub const NO_VARIANT: u64 = 0;

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Lifecycle status of a point-of-sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Paid,
    Pending,
    Canceled,
    Refunded,
}

/// Scope of the discount applied to a transaction.
///
/// Serialized as the backend's integer codes: 0 = none, 1 = whole-cart,
/// 2 = per-line-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DiscountType {
    None,
    Cart,
    PerItem,
}

impl DiscountType {
    /// Index into the three-toggle filter state.
    pub fn index(self) -> usize {
        match self {
            DiscountType::None => 0,
            DiscountType::Cart => 1,
            DiscountType::PerItem => 2,
        }
    }
}

impl From<DiscountType> for u8 {
    fn from(d: DiscountType) -> u8 {
        d.index() as u8
    }
}

impl TryFrom<u8> for DiscountType {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(DiscountType::None),
            1 => Ok(DiscountType::Cart),
            2 => Ok(DiscountType::PerItem),
            other => Err(format!("unknown discount type code: {other}")),
        }
    }
}

/// One point-of-sale transaction as returned by the backend report query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub invoice_number: String,
    pub status: TransactionStatus,
    pub subtotal: f64,
    pub total: f64,
    #[serde(default)]
    pub total_refund: f64,
    /// Derived during ingestion when the backend omits it.
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    /// Transaction-level discount amount (whole-cart discounts).
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub payment_type_id: Option<u64>,
    #[serde(default)]
    pub payment_type_name: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TransactionRecord {
    /// Discount type with the ingestion default applied.
    pub fn discount_type(&self) -> DiscountType {
        self.discount_type.unwrap_or(DiscountType::None)
    }
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// One cart line item belonging to a transaction. Immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub transaction_id: u64,
    pub menu_id: u64,
    /// `None` on the wire means no variant; normalized to [`NO_VARIANT`]
    /// during ingestion.
    #[serde(default)]
    pub variant_id: Option<u64>,
    pub menu_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub menu_type: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub discount_amount: f64,
}

impl CartLineItem {
    /// Variant id with the null sentinel applied.
    pub fn variant_or_sentinel(&self) -> u64 {
        self.variant_id.unwrap_or(NO_VARIANT)
    }
}

/// One refunded line item. Same shape as a cart item plus the refund qty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundLineItem {
    pub transaction_id: u64,
    pub menu_id: u64,
    #[serde(default)]
    pub variant_id: Option<u64>,
    pub menu_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Derived aggregation rows
// ---------------------------------------------------------------------------

/// Running sums for one (menu, variant) pair. Exactly one row per key per
/// computation; sums equal the sum of contributing line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub menu_id: u64,
    /// Sentinel-normalized: 0 means no variant.
    pub variant_id: u64,
    pub menu_name: String,
    pub variant_name: Option<String>,
    pub menu_type: Option<String>,
    pub unit_price: f64,
    pub total_quantity: i64,
    pub total_price: f64,
}

// ---------------------------------------------------------------------------
// Discount filter state
// ---------------------------------------------------------------------------

/// The three interactive filter toggles, one per [`DiscountType`].
///
/// Mutated by the UI between renders; re-classified on every change and
/// never triggers a refetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountFilterState {
    pub without_discount: bool,
    pub cart_discount: bool,
    pub per_item_discount: bool,
}

impl DiscountFilterState {
    pub fn new(without_discount: bool, cart_discount: bool, per_item_discount: bool) -> Self {
        Self {
            without_discount,
            cart_discount,
            per_item_discount,
        }
    }

    /// Toggles as an array indexed by [`DiscountType::index`].
    pub fn toggles(&self) -> [bool; 3] {
        [
            self.without_discount,
            self.cart_discount,
            self.per_item_discount,
        ]
    }

    /// Set one toggle by [`DiscountType::index`]. Indices above 2 are
    /// ignored so a caller bug cannot flip the wrong filter.
    pub fn set(&mut self, index: usize, value: bool) {
        match index {
            0 => self.without_discount = value,
            1 => self.cart_discount = value,
            2 => self.per_item_discount = value,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Outlets and ingredient orders
// ---------------------------------------------------------------------------

/// Sub-location within an outlet that tracks ingredient orders on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageChannel {
    /// Single storage for outlets without a bar.
    Combined,
    Kitchen,
    Bar,
}

/// One outlet of the chain. `has_bar` is derived from the detail records
/// at pivot build time, never trusted from the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlet {
    pub id: u64,
    pub name: String,
}

/// One ingredient order line for an (outlet, storage channel) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletOrderDetail {
    pub outlet_id: u64,
    pub storage_channel: StorageChannel,
    pub ingredient_id: u64,
    pub ingredient_name: String,
    pub ingredient_type_id: u64,
    pub unit_type_id: u64,
    pub order_request_quantity: f64,
}

/// Category of ingredients; pivot rows are grouped under these in the
/// given stable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientType {
    pub id: u64,
    pub name: String,
}

/// Measurement unit referenced by [`OutletOrderDetail::unit_type_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: u64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Ancillary report sections
// ---------------------------------------------------------------------------

/// Cashier shift summary scoping a payment report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftDetails {
    pub shift_number: u32,
    pub cashier_name: String,
    pub opening_cash: f64,
    #[serde(default)]
    pub closing_cash: Option<f64>,
    pub started_at: String,
    #[serde(default)]
    pub ended_at: Option<String>,
}

/// One cash expenditure recorded during a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expenditure {
    pub id: u64,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Report request snapshot
// ---------------------------------------------------------------------------

/// Everything fetched for one payment report request. Owned by a single
/// report view; a new request replaces the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentReportSnapshot {
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
    #[serde(default)]
    pub cart_details: Vec<CartLineItem>,
    /// One inner vec per refunded transaction.
    #[serde(default)]
    pub refund_details: Vec<Vec<RefundLineItem>>,
    #[serde(default)]
    pub shift_details: Option<ShiftDetails>,
    #[serde(default)]
    pub expenditures: Vec<Expenditure>,
}

/// Everything fetched for one ingredient-order pivot request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPivotSnapshot {
    #[serde(default)]
    pub outlets: Vec<Outlet>,
    /// Detail records grouped per outlet, parallel to `outlets`.
    #[serde(default)]
    pub order_details: Vec<Vec<OutletOrderDetail>>,
    #[serde(default)]
    pub ingredient_types: Vec<IngredientType>,
    #[serde(default)]
    pub ingredient_unit_types: Vec<UnitType>,
}

/// Date range for a report; both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn single_day(&self) -> bool {
        self.start == self.end
    }
}
