//! Footer relocation: the template's signature/totals block is cut from its
//! fixed position and re-rendered right below the last item row.

use umya_spreadsheet::Worksheet;

use super::merge::{self, MergeArea};
use super::numeric::deduction_factor;
use super::style;

/// Template rows holding the footer block (inclusive).
pub const FOOTER_FIRST_ROW: u32 = 26;
pub const FOOTER_LAST_ROW: u32 = 51;
/// Rows below the table are cleared at least down to here.
pub const CLEAR_THROUGH_ROW: u32 = 200;

/// The five column-H formulas closing the budget.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalChain {
    pub rows: [u32; 5],
    pub formulas: [String; 5],
}

/// Formula text for the total chain starting at `first_row`.
pub fn total_chain(first_row: u32, table_start: u32, last_item_row: u32, bdi: f64) -> TotalChain {
    let rows = [
        first_row,
        first_row + 1,
        first_row + 2,
        first_row + 3,
        first_row + 4,
    ];
    let [r1, r2, r3, r4, _] = rows;
    TotalChain {
        rows,
        formulas: [
            format!("SUBTOTAL(9,H{}:H{})", table_start, last_item_row),
            format!("H{}*{}", r1, bdi),
            format!("H{}+H{}", r1, r2),
            format!("H{}*{}", r3, deduction_factor(bdi)),
            format!("H{}-H{}", r3, r4),
        ],
    }
}

/// Unmerge and delete everything from `from_row` down to at least row 200.
pub fn clear_below(sheet: &mut Worksheet, from_row: u32) -> u32 {
    let through = sheet.get_highest_row().max(CLEAR_THROUGH_ROW);
    merge::unmerge_where(sheet, |a| a.last_row >= from_row);
    if through < from_row {
        return 0;
    }
    let count = through - from_row + 1;
    sheet.remove_row(&from_row, &count);
    count
}

/// Copy template rows `first..=last` (values, formulas, styles, heights and the
/// merges lying fully inside the block) so that `first` lands on `target_row`.
pub fn copy_block(source: &Worksheet, target: &mut Worksheet, first: u32, last: u32, target_row: u32) {
    let offset = target_row as i64 - first as i64;
    let max_col = source.get_highest_column();
    for row in first..=last {
        let tgt_row = (row as i64 + offset) as u32;
        if let Some(dimension) = source.get_row_dimension(&row) {
            let height: f64 = dimension.get_height().to_owned();
            if height > 0.0 {
                target.get_row_dimension_mut(&tgt_row).set_height(height);
            }
        }
        for col in 1..=max_col {
            let Some(src) = source.get_cell((col, row)) else {
                continue;
            };
            // Typed copy: text that looks numeric stays text.
            let mut value = src.get_cell_value().clone();
            // Shared-formula links do not survive relocation.
            value.set_formula_attributes(Vec::new());
            let style = src.get_style().clone();
            let cell = target.get_cell_mut((col, tgt_row));
            cell.set_cell_value(value);
            cell.set_style(style);
        }
    }
    for area in merge::merge_areas(source) {
        if area.first_row >= first && area.last_row <= last {
            let shifted: MergeArea = area.shifted(offset);
            target.add_merge_cells(shifted.to_range());
        }
    }
}

/// Write the total chain into column H, bold Arial 10 in accounting format.
pub fn write_totals(sheet: &mut Worksheet, chain: &TotalChain) {
    for (row, formula) in chain.rows.iter().zip(chain.formulas.iter()) {
        let cell = sheet.get_cell_mut((8, *row));
        cell.set_formula(formula.clone());
        style::style_total_cell(cell.get_style_mut(), Some(10.0));
    }
}

/// Clear stale footer content, re-render the block at `footer_row`, and
/// close the budget with the total chain.
pub fn render_footer(
    template: &Worksheet,
    output: &mut Worksheet,
    footer_row: u32,
    table_start: u32,
    bdi: f64,
) -> TotalChain {
    clear_below(output, footer_row);
    copy_block(template, output, FOOTER_FIRST_ROW, FOOTER_LAST_ROW, footer_row);
    let chain = total_chain(footer_row, table_start, footer_row - 1, bdi);
    write_totals(output, &chain);
    chain
}
