//! Multi-sheet spreadsheet export of a computed report.
//!
//! Serializes the report sections into one xlsx workbook held in memory;
//! the caller (UI shell) decides where the bytes go. Sheets are
//! independent: a section with no data is simply omitted and never aborts
//! the rest of the export.
//!
//! The merged-income sheet runs its own aggregation pass keyed by display
//! name instead of ids. That pass is intentionally separate from
//! [`crate::aggregation::aggregate`]: two menus sharing a display name
//! merge here but not there, and finance wants both views.

use std::collections::HashMap;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::models::{
    AggregateRow, CartLineItem, DateRange, Expenditure, RefundLineItem, ShiftDetails,
    TransactionRecord,
};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Per-payment-type totals for the payment summary sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentTotal {
    pub payment_type_name: String,
    pub transaction_count: i64,
    pub amount: f64,
}

/// Sum paid transactions per payment type, in first-encountered order.
pub fn payment_totals_from(transactions: &[TransactionRecord]) -> Vec<PaymentTotal> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<PaymentTotal> = Vec::new();

    for tx in transactions {
        let name = tx
            .payment_type_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            totals.push(PaymentTotal {
                payment_type_name: name,
                transaction_count: 0,
                amount: 0.0,
            });
            totals.len() - 1
        });
        totals[slot].transaction_count += 1;
        totals[slot].amount += tx.total;
    }

    totals
}

/// One row of the name-keyed merged income pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedIncomeRow {
    pub menu_name: String,
    pub variant_name: Option<String>,
    pub total_quantity: i64,
    pub total_price: f64,
}

/// Aggregate raw cart items by (menu_name, variant_name).
///
/// Tolerant of missing ids by design; rows keep first-encountered order.
pub fn merge_income_by_name(items: &[CartLineItem]) -> Vec<MergedIncomeRow> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut rows: Vec<MergedIncomeRow> = Vec::new();

    for item in items {
        let variant = item.variant_name.clone().unwrap_or_default();
        let key = (item.menu_name.clone(), variant);
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(MergedIncomeRow {
                menu_name: item.menu_name.clone(),
                variant_name: item.variant_name.clone(),
                total_quantity: 0,
                total_price: 0.0,
            });
            rows.len() - 1
        });
        rows[slot].total_quantity += item.quantity;
        rows[slot].total_price += item.total_price;
    }

    rows
}

/// The report sections to serialize. `None` means the sheet is skipped;
/// a present-but-empty collection still yields its sheet with the header
/// row only, so "no rows" stays visible in the artifact.
#[derive(Debug, Clone, Default)]
pub struct ReportSections<'a> {
    pub shift: Option<&'a ShiftDetails>,
    pub expenditures: Option<&'a [Expenditure]>,
    pub payment_totals: Option<&'a [PaymentTotal]>,
    pub aggregate_income: Option<&'a [AggregateRow]>,
    /// Raw cart items; the exporter runs [`merge_income_by_name`] itself.
    pub merged_income: Option<&'a [CartLineItem]>,
    pub transactions: Option<&'a [TransactionRecord]>,
    pub detail_income: Option<&'a [CartLineItem]>,
    pub refunds: Option<&'a [Vec<RefundLineItem>]>,
}

/// Naming inputs for the artifact.
#[derive(Debug, Clone)]
pub struct ExportMeta {
    pub outlet_name: String,
    pub range: DateRange,
}

/// The finished workbook, ready for the caller to write or download.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Serialize the present sections into a multi-sheet xlsx artifact.
pub fn export(sections: &ReportSections, meta: &ExportMeta) -> Result<ExportArtifact, ReportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let mut sheet_count = 0usize;

    if let Some(shift) = sections.shift {
        let ws = named_sheet(&mut workbook, "Shift")?;
        write_shift_sheet(ws, &header, shift).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(expenditures) = sections.expenditures {
        let ws = named_sheet(&mut workbook, "Expenditures")?;
        write_expenditure_sheet(ws, &header, expenditures).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(totals) = sections.payment_totals {
        let ws = named_sheet(&mut workbook, "Payment Totals")?;
        write_payment_totals_sheet(ws, &header, totals).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(rows) = sections.aggregate_income {
        let ws = named_sheet(&mut workbook, "Aggregate Income")?;
        write_aggregate_sheet(ws, &header, rows).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(items) = sections.merged_income {
        let merged = merge_income_by_name(items);
        let ws = named_sheet(&mut workbook, "Merged Income")?;
        write_merged_sheet(ws, &header, &merged).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(transactions) = sections.transactions {
        let ws = named_sheet(&mut workbook, "Transactions")?;
        write_transactions_sheet(ws, &header, transactions).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(items) = sections.detail_income {
        let ws = named_sheet(&mut workbook, "Income Details")?;
        write_detail_sheet(ws, &header, items).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    if let Some(refund_groups) = sections.refunds {
        let ws = named_sheet(&mut workbook, "Refunds")?;
        write_refunds_sheet(ws, &header, refund_groups).map_err(xlsx_err)?;
        sheet_count += 1;
    }

    let bytes = workbook.save_to_buffer().map_err(xlsx_err)?;
    let file_name = artifact_name(meta);

    info!(sheets = sheet_count, file_name = %file_name, "exported report workbook");

    Ok(ExportArtifact { file_name, bytes })
}

/// Derive the artifact file name from the outlet and date range.
/// Single-date reports name the day; ranges name both bounds.
pub fn artifact_name(meta: &ExportMeta) -> String {
    if meta.range.single_day() {
        format!(
            "{} Sales Report {}.xlsx",
            meta.outlet_name,
            meta.range.start.format("%Y-%m-%d")
        )
    } else {
        format!(
            "{} Sales Report {} - {}.xlsx",
            meta.outlet_name,
            meta.range.start.format("%Y-%m-%d"),
            meta.range.end.format("%Y-%m-%d")
        )
    }
}

// ---------------------------------------------------------------------------
// Sheet writers
// ---------------------------------------------------------------------------

fn named_sheet<'a>(workbook: &'a mut Workbook, name: &str) -> Result<&'a mut Worksheet, ReportError> {
    let ws = workbook.add_worksheet();
    ws.set_name(name).map_err(xlsx_err)?;
    debug!(sheet = name, "writing export sheet");
    Ok(ws)
}

fn xlsx_err(e: XlsxError) -> ReportError {
    ReportError::Computation(format!("spreadsheet write failed: {e}"))
}

fn write_header(ws: &mut Worksheet, format: &Format, labels: &[&str]) -> Result<(), XlsxError> {
    for (col, label) in labels.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *label, format)?;
    }
    Ok(())
}

fn write_shift_sheet(
    ws: &mut Worksheet,
    header: &Format,
    shift: &ShiftDetails,
) -> Result<(), XlsxError> {
    write_header(
        ws,
        header,
        &[
            "Shift", "Cashier", "Opening Cash", "Closing Cash", "Started At", "Ended At",
        ],
    )?;
    ws.write_number(1, 0, shift.shift_number as f64)?;
    ws.write_string(1, 1, &shift.cashier_name)?;
    ws.write_number(1, 2, shift.opening_cash)?;
    if let Some(closing) = shift.closing_cash {
        ws.write_number(1, 3, closing)?;
    }
    ws.write_string(1, 4, &shift.started_at)?;
    if let Some(ended) = &shift.ended_at {
        ws.write_string(1, 5, ended)?;
    }
    Ok(())
}

fn write_expenditure_sheet(
    ws: &mut Worksheet,
    header: &Format,
    expenditures: &[Expenditure],
) -> Result<(), XlsxError> {
    write_header(ws, header, &["Name", "Amount", "Note"])?;
    for (i, exp) in expenditures.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &exp.name)?;
        ws.write_number(row, 1, exp.amount)?;
        if let Some(note) = &exp.note {
            ws.write_string(row, 2, note)?;
        }
    }
    Ok(())
}

fn write_payment_totals_sheet(
    ws: &mut Worksheet,
    header: &Format,
    totals: &[PaymentTotal],
) -> Result<(), XlsxError> {
    write_header(ws, header, &["Payment Type", "Transactions", "Amount"])?;
    for (i, total) in totals.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &total.payment_type_name)?;
        ws.write_number(row, 1, total.transaction_count as f64)?;
        ws.write_number(row, 2, total.amount)?;
    }
    Ok(())
}

fn write_aggregate_sheet(
    ws: &mut Worksheet,
    header: &Format,
    rows: &[AggregateRow],
) -> Result<(), XlsxError> {
    write_header(
        ws,
        header,
        &["Menu", "Variant", "Type", "Unit Price", "Quantity", "Total"],
    )?;
    for (i, agg) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &agg.menu_name)?;
        if let Some(variant) = &agg.variant_name {
            ws.write_string(row, 1, variant)?;
        }
        if let Some(menu_type) = &agg.menu_type {
            ws.write_string(row, 2, menu_type)?;
        }
        ws.write_number(row, 3, agg.unit_price)?;
        ws.write_number(row, 4, agg.total_quantity as f64)?;
        ws.write_number(row, 5, agg.total_price)?;
    }
    Ok(())
}

fn write_merged_sheet(
    ws: &mut Worksheet,
    header: &Format,
    rows: &[MergedIncomeRow],
) -> Result<(), XlsxError> {
    write_header(ws, header, &["Menu", "Variant", "Quantity", "Total"])?;
    for (i, merged) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &merged.menu_name)?;
        if let Some(variant) = &merged.variant_name {
            ws.write_string(row, 1, variant)?;
        }
        ws.write_number(row, 2, merged.total_quantity as f64)?;
        ws.write_number(row, 3, merged.total_price)?;
    }
    Ok(())
}

fn write_transactions_sheet(
    ws: &mut Worksheet,
    header: &Format,
    transactions: &[TransactionRecord],
) -> Result<(), XlsxError> {
    write_header(
        ws,
        header,
        &[
            "Invoice", "Status", "Subtotal", "Total", "Refund", "Payment Type", "Created At",
        ],
    )?;
    for (i, tx) in transactions.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &tx.invoice_number)?;
        ws.write_string(row, 1, &format!("{:?}", tx.status))?;
        ws.write_number(row, 2, tx.subtotal)?;
        ws.write_number(row, 3, tx.total)?;
        ws.write_number(row, 4, tx.total_refund)?;
        if let Some(name) = &tx.payment_type_name {
            ws.write_string(row, 5, name)?;
        }
        ws.write_string(row, 6, &tx.created_at)?;
    }
    Ok(())
}

fn write_detail_sheet(
    ws: &mut Worksheet,
    header: &Format,
    items: &[CartLineItem],
) -> Result<(), XlsxError> {
    write_header(
        ws,
        header,
        &[
            "Transaction", "Menu", "Variant", "Quantity", "Unit Price", "Total", "Discount",
        ],
    )?;
    for (i, item) in items.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_number(row, 0, item.transaction_id as f64)?;
        ws.write_string(row, 1, &item.menu_name)?;
        if let Some(variant) = &item.variant_name {
            ws.write_string(row, 2, variant)?;
        }
        ws.write_number(row, 3, item.quantity as f64)?;
        ws.write_number(row, 4, item.unit_price)?;
        ws.write_number(row, 5, item.total_price)?;
        ws.write_number(row, 6, item.discount_amount)?;
    }
    Ok(())
}

fn write_refunds_sheet(
    ws: &mut Worksheet,
    header: &Format,
    groups: &[Vec<RefundLineItem>],
) -> Result<(), XlsxError> {
    write_header(
        ws,
        header,
        &["Transaction", "Menu", "Variant", "Quantity", "Total", "Reason"],
    )?;
    let mut row = 1u32;
    for group in groups {
        for item in group {
            ws.write_number(row, 0, item.transaction_id as f64)?;
            ws.write_string(row, 1, &item.menu_name)?;
            if let Some(variant) = &item.variant_name {
                ws.write_string(row, 2, variant)?;
            }
            ws.write_number(row, 3, item.quantity as f64)?;
            ws.write_number(row, 4, item.total_price)?;
            if let Some(reason) = &item.reason {
                ws.write_string(row, 5, reason)?;
            }
            row += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountType, TransactionStatus};
    use chrono::NaiveDate;

    fn meta(start: (i32, u32, u32), end: (i32, u32, u32)) -> ExportMeta {
        ExportMeta {
            outlet_name: "Central".into(),
            range: DateRange {
                start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
                end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            },
        }
    }

    fn cart_item(name: &str, variant: Option<&str>, qty: i64, total: f64) -> CartLineItem {
        CartLineItem {
            transaction_id: 1,
            menu_id: 1,
            variant_id: None,
            menu_name: name.into(),
            variant_name: variant.map(|v| v.to_string()),
            menu_type: None,
            quantity: qty,
            unit_price: total / qty as f64,
            total_price: total,
            discount_percent: 0.0,
            discount_amount: 0.0,
        }
    }

    fn tx(id: u64, payment: &str, total: f64) -> TransactionRecord {
        TransactionRecord {
            id,
            invoice_number: format!("INV-{id:04}"),
            status: TransactionStatus::Paid,
            subtotal: total,
            total,
            total_refund: 0.0,
            discount_type: Some(DiscountType::None),
            discount_amount: 0.0,
            payment_type_id: Some(1),
            payment_type_name: Some(payment.into()),
            created_at: "2026-03-01T10:00:00Z".into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_artifact_name_single_date_vs_range() {
        let single = artifact_name(&meta((2026, 3, 1), (2026, 3, 1)));
        let range = artifact_name(&meta((2026, 3, 1), (2026, 3, 7)));

        assert_eq!(single, "Central Sales Report 2026-03-01.xlsx");
        assert_eq!(range, "Central Sales Report 2026-03-01 - 2026-03-07.xlsx");
    }

    #[test]
    fn test_absent_sections_are_omitted_not_fatal() {
        let transactions = vec![tx(1, "Cash", 50_000.0)];
        let sections = ReportSections {
            transactions: Some(&transactions),
            ..Default::default()
        };

        let artifact = export(&sections, &meta((2026, 3, 1), (2026, 3, 1)))
            .expect("export with one section");

        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn test_every_present_section_yields_a_sheet() {
        let shift = ShiftDetails {
            shift_number: 1,
            cashier_name: "Ana".into(),
            opening_cash: 100_000.0,
            closing_cash: Some(350_000.0),
            started_at: "2026-03-01T08:00:00Z".into(),
            ended_at: Some("2026-03-01T16:00:00Z".into()),
        };
        let expenditures = vec![Expenditure {
            id: 1,
            name: "Gas refill".into(),
            amount: 22_000.0,
            note: None,
        }];
        let transactions = vec![tx(1, "Cash", 50_000.0), tx(2, "QRIS", 75_000.0)];
        let totals = payment_totals_from(&transactions);
        let items = vec![cart_item("Bakso", None, 2, 20_000.0)];
        let aggregates = crate::aggregation::aggregate(&items);
        let refunds = vec![vec![RefundLineItem {
            transaction_id: 2,
            menu_id: 1,
            variant_id: None,
            menu_name: "Bakso".into(),
            variant_name: None,
            quantity: 1,
            unit_price: 10_000.0,
            total_price: 10_000.0,
            reason: Some("cold".into()),
        }]];

        let sections = ReportSections {
            shift: Some(&shift),
            expenditures: Some(&expenditures),
            payment_totals: Some(&totals),
            aggregate_income: Some(&aggregates),
            merged_income: Some(&items),
            transactions: Some(&transactions),
            detail_income: Some(&items),
            refunds: Some(&refunds),
        };

        let artifact = export(&sections, &meta((2026, 3, 1), (2026, 3, 7)))
            .expect("full export");

        // xlsx is a zip container; eight sheets make it comfortably larger
        // than the single-sheet artifact.
        assert!(artifact.bytes.len() > 1_000);
        assert_eq!(
            artifact.file_name,
            "Central Sales Report 2026-03-01 - 2026-03-07.xlsx"
        );
    }

    #[test]
    fn test_present_but_empty_section_yields_header_only_sheet() {
        let no_transactions: Vec<TransactionRecord> = Vec::new();
        let sections = ReportSections {
            transactions: Some(&no_transactions),
            ..Default::default()
        };

        let artifact = export(&sections, &meta((2026, 3, 1), (2026, 3, 1)))
            .expect("empty section still exports");

        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn test_export_round_trips_to_disk() {
        let transactions = vec![tx(1, "Cash", 50_000.0)];
        let sections = ReportSections {
            transactions: Some(&transactions),
            ..Default::default()
        };
        let artifact = export(&sections, &meta((2026, 3, 1), (2026, 3, 1))).unwrap();

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes).expect("write artifact");

        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, artifact.bytes.len());
    }

    #[test]
    fn test_merged_income_groups_by_display_name() {
        // Same display name from two different menu ids merges here,
        // unlike the id-keyed aggregation pass.
        let mut a = cart_item("Es Teh", None, 2, 10_000.0);
        a.menu_id = 7;
        let mut b = cart_item("Es Teh", None, 3, 15_000.0);
        b.menu_id = 8;
        let c = cart_item("Es Teh", Some("Jumbo"), 1, 8_000.0);

        let rows = merge_income_by_name(&[a, b, c]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_quantity, 5);
        assert_eq!(rows[0].total_price, 25_000.0);
        assert_eq!(rows[1].variant_name.as_deref(), Some("Jumbo"));
    }

    #[test]
    fn test_payment_totals_sum_per_type() {
        let txs = vec![
            tx(1, "Cash", 50_000.0),
            tx(2, "QRIS", 30_000.0),
            tx(3, "Cash", 20_000.0),
        ];

        let totals = payment_totals_from(&txs);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].payment_type_name, "Cash");
        assert_eq!(totals[0].transaction_count, 2);
        assert_eq!(totals[0].amount, 70_000.0);
    }
}
