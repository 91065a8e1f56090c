//! Template population: header fields, hierarchical item table, group
//! subtotals, relocated footer and the closing total chain.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use super::footer;
use super::merge;
use super::numeric::{apply_precision, deduction_factor, parse_number, round_down_2, row_height_for};
use super::style::{self, FMT_ACCOUNTING, FMT_CURRENCY, FMT_QUANTITY};
use super::subtotals::{self, WrittenRow};
use crate::error::{EngineError, EngineResult};
use crate::logging::RunLog;
use crate::models::{ColumnMap, Field, HeaderMetadata, Level, RowEntry, DEFAULT_OUTPUT_NAME, DEFAULT_ROW_HEIGHT};
use crate::types::{BudgetTotals, GeneratedBudget};

/// Table body row used when the template has no description header.
pub const DEFAULT_TABLE_START: u32 = 15;
const TABLE_SCAN_ROWS: u32 = 50;
const TABLE_MARKERS: &[&str] = &["DESCRIÇÃO", "DISCRIMINAÇÃO"];

/// One labeled metadata cell of the sheet header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderField {
    pub cell: &'static str,
    pub text: String,
    pub bold: bool,
}

pub fn header_fields(meta: &HeaderMetadata) -> Vec<HeaderField> {
    let field = |cell, text: String, bold| HeaderField { cell, text, bold };
    vec![
        field("A8", format!("CAMPUS: {}", meta.institution), true),
        field("A9", format!("SETOR:  {}", meta.sector), true),
        field("A10", format!("SERVIDOR: {}", meta.requester), true),
        field("A13", format!("ORÇAMENTO ELABORADO POR: {}", meta.preparer), true),
        field("A14", format!("ESTAGIÁRIO: {}", meta.intern), true),
        field("C15", meta.title.to_uppercase(), false),
        field(
            "A18",
            format!("DATA DE ELABORAÇÃO DO ORÇAMENTO: {} (VALIDADE: 45 DIAS)", meta.date),
            true,
        ),
        field("E18", format!("CÓDIGO ORÇAFASCIO:  {}", meta.budget_code), true),
        field("E21", format!("NÚMERO DO PROCESSO:  {}", meta.process_number), true),
        field("D22", format!("FISCAL DO SERVIÇO: {}", meta.fiscal_agent), true),
    ]
}

/// Strip characters Windows rejects in file names.
pub fn sanitize_file_name(name: &str) -> String {
    static ILLEGAL: OnceLock<Regex> = OnceLock::new();
    let re = ILLEGAL.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("file name regex"));
    let cleaned = re.replace_all(name.trim(), "").trim().to_string();
    if cleaned.is_empty() {
        DEFAULT_OUTPUT_NAME.to_string()
    } else {
        cleaned
    }
}

/// State of one generation: both workbooks and where the copy goes.
/// Dropping it releases both handles.
struct RunContext {
    template: Spreadsheet,
    output: Spreadsheet,
    output_path: PathBuf,
}

/// Rows emitted into the table body.
#[derive(Debug, Default)]
struct EmittedTable {
    written: Vec<WrittenRow>,
    next_row: u32,
    items_total: f64,
}

pub struct TemplateEngine {
    output_dir: PathBuf,
    log: Arc<dyn RunLog>,
}

impl TemplateEngine {
    pub fn new(output_dir: impl Into<PathBuf>, log: Arc<dyn RunLog>) -> Self {
        Self {
            output_dir: output_dir.into(),
            log,
        }
    }

    pub fn output_path_for(&self, meta: &HeaderMetadata) -> PathBuf {
        self.output_dir
            .join(format!("{}.xlsx", sanitize_file_name(&meta.output_name)))
    }

    /// Populate a copy of `template_path` with `rows`. The template itself is
    /// never written; on failure the copy may be left partially written.
    pub fn generate(
        &self,
        rows: &[RowEntry],
        template_path: &Path,
        columns: &ColumnMap,
        meta: &HeaderMetadata,
    ) -> EngineResult<GeneratedBudget> {
        self.log.info(&format!(
            "Generating budget '{}' from {} rows",
            meta.output_name,
            rows.len()
        ));
        let result = self.run(rows, template_path, columns, meta);
        match &result {
            Ok(budget) => self
                .log
                .info(&format!("Saved: {}", budget.output_path.display())),
            Err(e) => self.log.error(&format!("Generation failed: {}", e)),
        }
        result
    }

    fn run(
        &self,
        rows: &[RowEntry],
        template_path: &Path,
        columns: &ColumnMap,
        meta: &HeaderMetadata,
    ) -> EngineResult<GeneratedBudget> {
        let mut ctx = self.prepare(template_path, meta, rows)?;

        let sheet = ctx.output.get_active_sheet_mut();
        write_header_fields(sheet, meta);

        let table_start = find_table_start(sheet);
        self.log.debug(&format!("Table body starts at row {}", table_start));

        let table = self.emit_rows(sheet, rows, columns, meta, table_start);
        let group_count = subtotals::insert_group_subtotals(sheet, &table.written);

        let footer_start = table.next_row;
        footer::render_footer(
            ctx.template.get_active_sheet(),
            ctx.output.get_active_sheet_mut(),
            footer_start,
            table_start,
            meta.bdi,
        );

        umya_spreadsheet::writer::xlsx::write(&ctx.output, &ctx.output_path)
            .map_err(|e| EngineError::workbook(e.to_string()))?;

        self.log
            .debug(&format!("{} group subtotals written", group_count));

        let item_count = table
            .written
            .iter()
            .filter(|w| w.level == Level::Item)
            .count();
        Ok(GeneratedBudget {
            output_path: ctx.output_path,
            table_start,
            last_item_row: footer_start - 1,
            footer_start,
            item_count,
            group_count: table.written.len() - item_count,
            totals: totals_for(table.items_total, meta.bdi),
        })
    }

    fn prepare(
        &self,
        template_path: &Path,
        meta: &HeaderMetadata,
        rows: &[RowEntry],
    ) -> EngineResult<RunContext> {
        if !template_path.exists() {
            return Err(EngineError::TemplateNotFound(
                template_path.display().to_string(),
            ));
        }
        if rows.is_empty() {
            return Err(EngineError::EmptyBudget);
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_path_for(meta);
        std::fs::copy(template_path, &output_path)?;

        let output = umya_spreadsheet::reader::xlsx::read(&output_path)
            .map_err(|e| EngineError::workbook(e.to_string()))?;
        let template = umya_spreadsheet::reader::xlsx::read(template_path)
            .map_err(|e| EngineError::workbook(e.to_string()))?;
        Ok(RunContext {
            template,
            output,
            output_path,
        })
    }

    fn emit_rows(
        &self,
        sheet: &mut Worksheet,
        rows: &[RowEntry],
        columns: &ColumnMap,
        meta: &HeaderMetadata,
        table_start: u32,
    ) -> EmittedTable {
        let mut table = EmittedTable {
            next_row: table_start,
            ..Default::default()
        };
        for entry in rows {
            let row = table.next_row;
            table.items_total += self.emit_row(sheet, row, entry, columns, meta);
            table.written.push(WrittenRow {
                row,
                level: entry.level,
            });
            table.next_row += 1;
        }
        table
    }

    /// Write one table row. Returns the row's native ROUNDDOWN total (0 for groups).
    fn emit_row(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        entry: &RowEntry,
        columns: &ColumnMap,
        meta: &HeaderMetadata,
    ) -> f64 {
        merge::clear_row_merges(sheet, row);

        let text_fields = [
            (1, Field::Item),
            (2, Field::Code),
            (3, Field::Source),
            (4, Field::Description),
        ];
        for (col, field) in text_fields {
            write_text(sheet, col, row, columns.lookup(entry, field));
        }

        let mut total = 0.0;
        if entry.level == Level::Item {
            write_text(sheet, 5, row, columns.lookup(entry, Field::Unit));

            let quantity = self.numeric_field(entry, columns, Field::Quantity, row, meta);
            let price = self.numeric_field(entry, columns, Field::UnitPrice, row, meta);
            if let Some(q) = quantity {
                write_number(sheet, 6, row, q, FMT_QUANTITY);
            }
            if let Some(p) = price {
                write_number(sheet, 7, row, p, FMT_CURRENCY);
            }
            write_formula(sheet, 8, row, &format!("ROUNDDOWN(F{row}*G{row},2)"), FMT_ACCOUNTING);
            total = round_down_2(quantity.unwrap_or(0.0) * price.unwrap_or(0.0));
        }

        style::apply_level_style(sheet, row, entry.level);
        let base = meta.row_height.unwrap_or(DEFAULT_ROW_HEIGHT);
        let height = row_height_for(columns.lookup(entry, Field::Description), base);
        sheet.get_row_dimension_mut(&row).set_height(height);
        total
    }

    fn numeric_field(
        &self,
        entry: &RowEntry,
        columns: &ColumnMap,
        field: Field,
        row: u32,
        meta: &HeaderMetadata,
    ) -> Option<f64> {
        let raw = columns.lookup(entry, field);
        let value = apply_precision(parse_number(raw), meta.precision);
        if value.is_none() && !raw.trim().is_empty() {
            self.log.debug(&format!(
                "Row {}: {} value '{}' is not a number, cell left blank",
                row,
                field.key(),
                raw
            ));
        }
        value
    }
}

/// Write the labeled header cells, landing on merge anchors.
pub fn write_header_fields(sheet: &mut Worksheet, meta: &HeaderMetadata) {
    for field in header_fields(meta) {
        let Some((col, row)) = merge::parse_cell_ref(field.cell) else {
            continue;
        };
        let target = merge::write_target(sheet, col, row);
        let cell = sheet.get_cell_mut(target);
        cell.set_value_string(field.text);
        cell.get_style_mut().get_font_mut().set_bold(field.bold);
    }
}

/// First body row: one below the description header in column D, else row 15.
pub fn find_table_start(sheet: &Worksheet) -> u32 {
    (1..TABLE_SCAN_ROWS)
        .find(|&row| {
            let text = sheet.get_value((4, row)).to_uppercase();
            TABLE_MARKERS.iter().any(|m| text.contains(m))
        })
        .map(|row| row + 1)
        .unwrap_or(DEFAULT_TABLE_START)
}

fn writable_cell(sheet: &mut Worksheet, col: u32, row: u32) -> &mut umya_spreadsheet::Cell {
    if merge::is_covered(sheet, col, row) {
        merge::clear_cell_merge(sheet, col, row);
    }
    sheet.get_cell_mut((col, row))
}

fn write_text(sheet: &mut Worksheet, col: u32, row: u32, text: &str) {
    writable_cell(sheet, col, row).set_value_string(text);
}

fn write_number(sheet: &mut Worksheet, col: u32, row: u32, value: f64, format: &str) {
    let cell = writable_cell(sheet, col, row);
    cell.set_value_number(value);
    style::set_number_format(cell.get_style_mut(), format);
}

fn write_formula(sheet: &mut Worksheet, col: u32, row: u32, formula: &str, format: &str) {
    let cell = writable_cell(sheet, col, row);
    cell.set_formula(formula);
    style::set_number_format(cell.get_style_mut(), format);
}

/// Native mirror of the footer chain over the items' ROUNDDOWN totals.
pub fn totals_for(subtotal: f64, bdi: f64) -> BudgetTotals {
    let bdi_amount = subtotal * bdi;
    let with_bdi = subtotal + bdi_amount;
    let deduction = with_bdi * deduction_factor(bdi);
    BudgetTotals {
        subtotal,
        bdi_amount,
        with_bdi,
        deduction,
        grand_total: with_bdi - deduction,
    }
}
