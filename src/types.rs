use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::ColumnMap;

/// Result of scanning a source file for its header row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderScan {
    pub path: PathBuf,
    /// 0-based sheet row index.
    pub header_row: usize,
    /// False when no row matched and the index fell back to 0.
    pub detected: bool,
}

/// One data row read below the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    /// 1-based sheet row, as shown by spreadsheet applications.
    pub sheet_row: usize,
    pub values: HashMap<String, String>,
}

impl SourceRow {
    pub fn value(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Totals mirrored from the footer formula chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BudgetTotals {
    pub subtotal: f64,
    pub bdi_amount: f64,
    pub with_bdi: f64,
    pub deduction: f64,
    pub grand_total: f64,
}

/// What one successful generation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedBudget {
    pub output_path: PathBuf,
    pub table_start: u32,
    pub last_item_row: u32,
    pub footer_start: u32,
    pub item_count: usize,
    pub group_count: usize,
    pub totals: BudgetTotals,
}

/// Persisted record of a completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub generated_at: String,
    pub project_name: String,
    pub location: String,
    pub bdi: f64,
    pub total_value: f64,
    pub output_path: String,
    pub item_count: i64,
    pub group_count: i64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub total_runs: i64,
    pub total_value: f64,
    pub average_items: f64,
    pub last_project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub id: i64,
    pub name: String,
    pub column_mapping: ColumnMap,
}
