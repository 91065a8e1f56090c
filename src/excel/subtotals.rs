//! Group subtotal ranges over the written-row index.

use umya_spreadsheet::Worksheet;

use super::style;
use crate::models::Level;

/// One emitted table row, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenRow {
    pub row: u32,
    pub level: Level,
}

/// Column-H span a group row must sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpan {
    pub group_row: u32,
    pub first_row: u32,
    pub last_row: u32,
}

impl GroupSpan {
    pub fn formula(&self) -> String {
        format!("SUBTOTAL(9,H{}:H{})", self.first_row, self.last_row)
    }
}

/// For each group row, the rows nested below it: everything after it up to
/// the next row of equal or shallower level. Childless groups yield nothing.
pub fn group_spans(written: &[WrittenRow]) -> Vec<GroupSpan> {
    let mut spans = Vec::new();
    for (i, current) in written.iter().enumerate() {
        if !current.level.is_group() {
            continue;
        }
        let weight = current.level.weight();
        let last = written[i + 1..]
            .iter()
            .take_while(|next| next.level.weight() > weight)
            .last();
        if let Some(last) = last {
            spans.push(GroupSpan {
                group_row: current.row,
                first_row: written[i + 1].row,
                last_row: last.row,
            });
        }
    }
    spans
}

/// Write every group's SUBTOTAL into column H of its own row.
pub fn insert_group_subtotals(sheet: &mut Worksheet, written: &[WrittenRow]) -> usize {
    let spans = group_spans(written);
    for span in &spans {
        let cell = sheet.get_cell_mut((8, span.group_row));
        cell.set_formula(span.formula());
        style::style_total_cell(cell.get_style_mut(), None);
    }
    spans.len()
}
