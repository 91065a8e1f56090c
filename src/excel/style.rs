use umya_spreadsheet::{Border, HorizontalAlignmentValues, Style, VerticalAlignmentValues, Worksheet};

use super::merge;
use crate::models::Level;

pub const FMT_QUANTITY: &str = "0.00";
pub const FMT_CURRENCY: &str = "\"R$ \"#,##0.00";
pub const FMT_ACCOUNTING: &str =
    "_(\"R$\"* #,##0.00_);_(\"R$\"* (#,##0.00);_(\"R$\"* \"-\"??_);_(@_)";

pub const FONT_NAME: &str = "Arial";

/// Number of columns the item table spans (A..H).
pub const TABLE_COLUMNS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStyle {
    /// ARGB fill color.
    pub fill: &'static str,
    pub bold: bool,
    pub size: f64,
}

pub fn level_style(level: Level) -> LevelStyle {
    match level {
        Level::N1 => LevelStyle {
            fill: "FF9BC2E6",
            bold: true,
            size: 11.0,
        },
        Level::N2 => LevelStyle {
            fill: "FFBDD7EE",
            bold: true,
            size: 11.0,
        },
        Level::N3 => LevelStyle {
            fill: "FFDDEBF7",
            bold: true,
            size: 11.0,
        },
        Level::Item => LevelStyle {
            fill: "FFFFFFFF",
            bold: false,
            size: 10.0,
        },
    }
}

fn horizontal_for(col: u32) -> HorizontalAlignmentValues {
    match col {
        4 => HorizontalAlignmentValues::Left,
        8 => HorizontalAlignmentValues::Right,
        _ => HorizontalAlignmentValues::Center,
    }
}

/// Fill, font, thin borders and alignment for columns A..H of a table row.
/// Cells hidden under a merge are left alone.
pub fn apply_level_style(sheet: &mut Worksheet, row: u32, level: Level) {
    let palette = level_style(level);
    for col in 1..=TABLE_COLUMNS {
        if merge::is_covered(sheet, col, row) {
            continue;
        }
        let style = sheet.get_cell_mut((col, row)).get_style_mut();
        style.set_background_color(palette.fill);

        let font = style.get_font_mut();
        font.set_name(FONT_NAME);
        font.set_bold(palette.bold);
        font.set_size(palette.size);

        set_thin_borders(style);

        let alignment = style.get_alignment_mut();
        alignment.set_horizontal(horizontal_for(col));
        alignment.set_vertical(VerticalAlignmentValues::Center);
        alignment.set_wrap_text(col == 4);
    }
}

pub fn set_thin_borders(style: &mut Style) {
    let borders = style.get_borders_mut();
    borders.get_left_mut().set_border_style(Border::BORDER_THIN);
    borders.get_right_mut().set_border_style(Border::BORDER_THIN);
    borders.get_top_mut().set_border_style(Border::BORDER_THIN);
    borders.get_bottom_mut().set_border_style(Border::BORDER_THIN);
}

pub fn set_number_format(style: &mut Style, code: &str) {
    style.get_number_format_mut().set_format_code(code);
}

/// Bold accounting figure, used for subtotals and the footer total chain.
pub fn style_total_cell(style: &mut Style, font_size: Option<f64>) {
    set_number_format(style, FMT_ACCOUNTING);
    let font = style.get_font_mut();
    font.set_bold(true);
    if let Some(size) = font_size {
        font.set_name(FONT_NAME);
        font.set_size(size);
    }
}
