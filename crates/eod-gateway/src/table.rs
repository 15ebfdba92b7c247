//! ISS table decoding.
//!
//! ISS JSON responses (with `iss.meta=off`) hold named tables:
//!
//! ```text
//! {"engines": {"columns": ["id", "name", "title"],
//!              "data": [[1, "stock", "Фондовый рынок"], ...]}}
//! ```
//!
//! Every cell is converted to text. Numbers keep their JSON spelling so
//! that decimals are parsed exactly later on.

use eod_core::Row;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Deserialize)]
struct RawTable {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

fn cell_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Decode table `name` of an ISS response into rows.
pub fn extract_table(body: &Value, name: &str) -> GatewayResult<Vec<Row>> {
    let raw = body
        .get(name)
        .ok_or_else(|| GatewayError::MalformedResponse(format!("missing table '{name}'")))?;

    let table: RawTable = serde_json::from_value(raw.clone()).map_err(|e| {
        GatewayError::MalformedResponse(format!("table '{name}' is not columns/data: {e}"))
    })?;

    table
        .data
        .iter()
        .enumerate()
        .map(|(idx, cells)| {
            if cells.len() != table.columns.len() {
                return Err(GatewayError::MalformedResponse(format!(
                    "table '{name}' row {idx} has {} cells for {} columns",
                    cells.len(),
                    table.columns.len()
                )));
            }
            Ok(table
                .columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.as_str(), cell_to_text(cell)))
                .collect())
        })
        .collect()
}

/// Paging cursor of a history response (`history.cursor` table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    pub index: u64,
    pub total: u64,
    pub page_size: u64,
}

impl HistoryCursor {
    pub const TABLE: &'static str = "history.cursor";

    /// Read the cursor; `Ok(None)` when the response carries none.
    pub fn from_body(body: &Value) -> GatewayResult<Option<Self>> {
        if body.get(Self::TABLE).is_none() {
            return Ok(None);
        }

        let rows = extract_table(body, Self::TABLE)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let field = |column: &str| -> GatewayResult<u64> {
            row.get(column)
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| {
                    GatewayError::MalformedResponse(format!("cursor column '{column}' invalid"))
                })
        };

        Ok(Some(Self {
            index: field("INDEX")?,
            total: field("TOTAL")?,
            page_size: field("PAGESIZE")?,
        }))
    }

    /// Start offset of the next page, `None` on the last page.
    pub fn next_start(&self) -> Option<u64> {
        let next = self.index.saturating_add(self.page_size);
        (self.page_size > 0 && next < self.total).then_some(next)
    }
}
