//! Cross-outlet ingredient-order pivot table.
//!
//! Builds the rectangular table finance uses to reconcile ingredient
//! consumption across outlets. Outlets that track a bar separately get two
//! columns (kitchen, bar) under one spanning header; everyone else gets a
//! single column. Rows are grouped by ingredient type, deduplicated by
//! ingredient id, and every row carries exactly one cell per column: an
//! ingredient ordered by only one outlet still produces a full-width row
//! with empty (not zero) cells elsewhere.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::models::{IngredientType, Outlet, OutletOrderDetail, StorageChannel, UnitType};

// ---------------------------------------------------------------------------
// Table shape
// ---------------------------------------------------------------------------

/// One data column of the pivot: an outlet, or one of its storage channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotColumn {
    pub outlet_id: u64,
    pub outlet_name: String,
    /// `Combined` for single-column outlets, `Kitchen`/`Bar` for split ones.
    pub channel: StorageChannel,
}

impl PivotColumn {
    /// Header label for the channel sub-row; empty for combined columns,
    /// which span both header rows.
    pub fn channel_label(&self) -> &'static str {
        match self.channel {
            StorageChannel::Combined => "",
            StorageChannel::Kitchen => "Kitchen",
            StorageChannel::Bar => "Bar",
        }
    }
}

/// A quantity cell. Empty means the outlet never ordered the ingredient
/// through that channel. Distinct from an explicit zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PivotCell {
    Empty,
    Filled { quantity: i64, unit: String },
}

impl PivotCell {
    /// Display form: `"5 kg"`, or `"5"` when the unit id did not resolve,
    /// or `""` for an empty cell.
    pub fn display(&self) -> String {
        match self {
            PivotCell::Empty => String::new(),
            PivotCell::Filled { quantity, unit } if unit.is_empty() => quantity.to_string(),
            PivotCell::Filled { quantity, unit } => format!("{quantity} {unit}"),
        }
    }
}

/// One ingredient row; `cells` is always parallel to `PivotTable::columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub ingredient_id: u64,
    pub ingredient_name: String,
    pub cells: Vec<PivotCell>,
}

/// Rows for one ingredient type. Types with no matching records anywhere
/// are dropped entirely (no header, no rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotSection {
    pub type_id: u64,
    pub type_name: String,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub columns: Vec<PivotColumn>,
    pub sections: Vec<PivotSection>,
}

impl PivotTable {
    /// Total column count including the leading ingredient-name column.
    pub fn width(&self) -> usize {
        1 + self.columns.len()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Whether an outlet splits its storage into kitchen and bar: true iff its
/// raw detail collection contains at least one `bar`-tagged record.
fn has_bar(details: &[OutletOrderDetail]) -> bool {
    details
        .iter()
        .any(|d| d.storage_channel == StorageChannel::Bar)
}

/// Build the pivot table.
///
/// `details_by_outlet` is parallel to `outlets`; an outlet with no details
/// of any kind keeps its column(s) with all-empty cells. Extra detail
/// collections beyond `outlets.len()` are ignored, missing ones are
/// treated as empty.
pub fn build_pivot(
    outlets: &[Outlet],
    details_by_outlet: &[Vec<OutletOrderDetail>],
    ingredient_types: &[IngredientType],
    units: &[UnitType],
) -> PivotTable {
    let empty: Vec<OutletOrderDetail> = Vec::new();
    let details_for = |idx: usize| details_by_outlet.get(idx).unwrap_or(&empty);

    // Column layout: two columns under one spanning header for bar
    // outlets, one two-row-spanning column otherwise.
    let mut columns: Vec<PivotColumn> = Vec::new();
    for (idx, outlet) in outlets.iter().enumerate() {
        if has_bar(details_for(idx)) {
            for channel in [StorageChannel::Kitchen, StorageChannel::Bar] {
                columns.push(PivotColumn {
                    outlet_id: outlet.id,
                    outlet_name: outlet.name.clone(),
                    channel,
                });
            }
        } else {
            columns.push(PivotColumn {
                outlet_id: outlet.id,
                outlet_name: outlet.name.clone(),
                channel: StorageChannel::Combined,
            });
        }
    }

    let unit_names: HashMap<u64, &str> =
        units.iter().map(|u| (u.id, u.name.as_str())).collect();

    // Cell lookup keyed by (outlet, channel, ingredient). Later duplicates
    // for the same key are ignored; the first record wins.
    let mut cell_index: HashMap<(u64, StorageChannel, u64), &OutletOrderDetail> = HashMap::new();
    for (idx, _) in outlets.iter().enumerate() {
        for detail in details_for(idx) {
            cell_index
                .entry((detail.outlet_id, detail.storage_channel, detail.ingredient_id))
                .or_insert(detail);
        }
    }

    let mut sections: Vec<PivotSection> = Vec::new();

    for itype in ingredient_types {
        // Collect this type's ingredients across all outlets in
        // first-encountered order, deduplicated by ingredient id.
        let mut seen: HashSet<u64> = HashSet::new();
        let mut ingredients: Vec<(u64, String)> = Vec::new();
        for (idx, _) in outlets.iter().enumerate() {
            for detail in details_for(idx) {
                if detail.ingredient_type_id == itype.id && seen.insert(detail.ingredient_id) {
                    ingredients.push((detail.ingredient_id, detail.ingredient_name.clone()));
                }
            }
        }

        // No matching records anywhere: the type vanishes from the table.
        if ingredients.is_empty() {
            continue;
        }

        let rows = ingredients
            .into_iter()
            .map(|(ingredient_id, ingredient_name)| {
                let cells = columns
                    .iter()
                    .map(|col| {
                        match cell_index.get(&(col.outlet_id, col.channel, ingredient_id)) {
                            Some(detail) => PivotCell::Filled {
                                quantity: detail.order_request_quantity.round() as i64,
                                unit: unit_names
                                    .get(&detail.unit_type_id)
                                    .map(|n| n.to_string())
                                    .unwrap_or_default(),
                            },
                            None => PivotCell::Empty,
                        }
                    })
                    .collect();

                PivotRow {
                    ingredient_id,
                    ingredient_name,
                    cells,
                }
            })
            .collect();

        sections.push(PivotSection {
            type_id: itype.id,
            type_name: itype.name.clone(),
            rows,
        });
    }

    debug!(
        outlets = outlets.len(),
        columns = columns.len(),
        sections = sections.len(),
        "built ingredient order pivot"
    );

    PivotTable { columns, sections }
}
