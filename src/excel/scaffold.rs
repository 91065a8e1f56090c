//! Blank institutional template in the layout the engine fills in.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

/// Row (1-based) of the table header in the scaffold.
pub const HEADER_ROW: u32 = 24;

const TABLE_HEADERS: &[&str] = &[
    "ITEM",
    "CÓDIGO",
    "BANCO",
    "DESCRIÇÃO",
    "UND",
    "QUANT.",
    "VALOR UNIT",
    "TOTAL",
];

const TOTAL_LABELS: &[&str] = &[
    "TOTAL SEM BDI",
    "BDI",
    "TOTAL COM BDI",
    "DESCONTO",
    "TOTAL GERAL",
];

/// (1-based row, first col, last col, label). Columns 0-based.
const METADATA_LABELS: &[(u32, u16, u16, &str)] = &[
    (8, 0, 7, "CAMPUS:"),
    (9, 0, 7, "SETOR:"),
    (10, 0, 7, "SERVIDOR:"),
    (13, 0, 7, "ORÇAMENTO ELABORADO POR:"),
    (14, 0, 7, "ESTAGIÁRIO:"),
    (15, 1, 7, ""),
    (18, 0, 3, "DATA DE ELABORAÇÃO DO ORÇAMENTO:"),
    (18, 4, 7, "CÓDIGO ORÇAFASCIO:"),
    (21, 4, 7, "NÚMERO DO PROCESSO:"),
    (22, 3, 7, "FISCAL DO SERVIÇO:"),
];

const SIGNATURES: &[(u32, &str)] = &[
    (36, "ORÇAMENTISTA"),
    (41, "ESTAGIÁRIO"),
    (46, "FISCAL DO SERVIÇO"),
];

fn label_format() -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
}

fn header_format() -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_bold()
        .set_background_color(Color::RGB(0xD9D9D9))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn total_label_format() -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Right)
}

/// 1-based sheet row to rust_xlsxwriter's 0-based index.
fn r(row: u32) -> u32 {
    row - 1
}

fn write_layout(sheet: &mut Worksheet) -> Result<(), XlsxError> {
    let label = label_format();
    sheet.set_name("Orçamento")?;
    for (col, width) in [8.0, 12.0, 10.0, 60.0, 8.0, 10.0, 14.0, 16.0].iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    sheet.merge_range(0, 0, 0, 7, "ORÇAMENTO SINTÉTICO", &header_format())?;
    for &(row, first, last, text) in METADATA_LABELS {
        sheet.merge_range(r(row), first, r(row), last, text, &label)?;
    }
    sheet.write_string_with_format(r(15), 0, "OBJETO:", &label)?;

    let header = header_format();
    for (col, text) in TABLE_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(r(HEADER_ROW), col as u16, *text, &header)?;
    }
    // Blank body row, merged the way exported templates often are.
    let body = Format::new().set_border(FormatBorder::Thin);
    sheet.merge_range(r(HEADER_ROW + 1), 1, r(HEADER_ROW + 1), 2, "", &body)?;

    let total_label = total_label_format();
    let total_value = Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_num_format(crate::excel::style::FMT_ACCOUNTING);
    for (i, text) in TOTAL_LABELS.iter().enumerate() {
        let row = r(super::footer::FOOTER_FIRST_ROW) + i as u32;
        sheet.merge_range(row, 0, row, 6, text, &total_label)?;
        sheet.write_blank(row, 7, &total_value)?;
        sheet.set_row_height(row, 18)?;
    }

    let signature = Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_align(FormatAlign::Center)
        .set_border_top(FormatBorder::Thin);
    for &(row, text) in SIGNATURES {
        sheet.merge_range(r(row), 2, r(row), 5, text, &signature)?;
    }
    sheet.merge_range(
        r(super::footer::FOOTER_LAST_ROW),
        0,
        r(super::footer::FOOTER_LAST_ROW),
        7,
        "VALIDADE DO ORÇAMENTO: 45 DIAS",
        &label,
    )?;
    Ok(())
}

/// Write a blank template to `path`, overwriting any existing file.
pub fn write_template(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    write_layout(sheet).map_err(|e: XlsxError| e.to_string())?;
    workbook.save(path).map_err(|e: XlsxError| e.to_string())?;
    Ok(())
}
