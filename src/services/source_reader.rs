//! Source rows below the header, plus column-map and level suggestions.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use super::header_locator::{cell_text, first_sheet};
use crate::error::LocatorError;
use crate::logging::RunLog;
use crate::models::{ColumnMap, Field, Level, LevelChoice, RowEntry};
use crate::types::SourceRow;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceTable {
    /// Header texts in column order; blank header cells are left out.
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

impl SourceTable {
    /// Row entries for every row whose chosen level is not IGNORE.
    pub fn entries(&self, levels: &[LevelChoice]) -> Vec<RowEntry> {
        self.rows
            .iter()
            .zip(levels)
            .filter_map(|(row, choice)| {
                choice.level().map(|level| RowEntry {
                    values: row.values.clone(),
                    level,
                })
            })
            .collect()
    }
}

fn unique_header(seen: &mut HashMap<String, usize>, text: String) -> String {
    let count = seen.entry(text.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        text
    } else {
        format!("{}.{}", text, *count - 1)
    }
}

/// Read the `max_rows` sheet rows below the 0-based `header_row` of the first
/// worksheet. Blank rows and rows whose `description_column` is blank are skipped.
pub fn read_source_rows(
    path: &Path,
    header_row: usize,
    max_rows: usize,
    description_column: Option<&str>,
    log: &dyn RunLog,
) -> Result<SourceTable, LocatorError> {
    let (range, first_row) = first_sheet(path)?;

    let mut columns: Vec<(usize, String)> = Vec::new();
    let mut seen = HashMap::new();
    if header_row >= first_row {
        if let Some(cells) = range.rows().nth(header_row - first_row) {
            for (i, cell) in cells.iter().enumerate() {
                let text = cell_text(cell);
                if !text.is_empty() {
                    columns.push((i, unique_header(&mut seen, text)));
                }
            }
        }
    }

    let mut rows = Vec::new();
    for (i, cells) in range.rows().enumerate() {
        let sheet_row = first_row + i;
        if sheet_row <= header_row {
            continue;
        }
        if sheet_row > header_row + max_rows {
            break;
        }
        let values: HashMap<String, String> = columns
            .iter()
            .map(|(idx, name)| {
                let text = cells.get(*idx).map(cell_text).unwrap_or_default();
                (name.clone(), text)
            })
            .collect();
        if values.values().all(|v| v.is_empty()) {
            continue;
        }
        if let Some(desc) = description_column {
            if values.get(desc).map_or(true, |v| v.is_empty()) {
                continue;
            }
        }
        rows.push(SourceRow {
            sheet_row: sheet_row + 1,
            values,
        });
    }

    log.debug(&format!(
        "Read {} rows, {} columns from {}",
        rows.len(),
        columns.len(),
        path.display()
    ));
    Ok(SourceTable {
        headers: columns.into_iter().map(|(_, name)| name).collect(),
        rows,
    })
}

fn header_matches(field: Field, header: &str) -> bool {
    let upper = header.to_uppercase();
    if upper.contains(field.key()) {
        return true;
    }
    match field {
        Field::Code => upper.contains("COD") || upper.contains("CÓD"),
        Field::Source => upper.contains("FONTE") || upper.contains("REF"),
        Field::Description => upper.contains("DESC"),
        Field::Unit => upper.contains("UND"),
        Field::UnitPrice => upper.contains("VALOR"),
        _ => false,
    }
}

/// Guess the column map from header texts: per field, the last matching
/// header wins. Fields with no match keep `base`.
pub fn suggest_column_map<S: AsRef<str>>(headers: &[S], base: &ColumnMap) -> ColumnMap {
    let mut map = base.clone();
    for field in Field::ALL {
        if let Some(header) = headers
            .iter()
            .map(AsRef::as_ref)
            .filter(|h| header_matches(field, h))
            .last()
        {
            map.set(field, header);
        }
    }
    map
}

/// Level suggested by the shape of an item number ("1" N1, "1.2" N2,
/// "1.2.3" N3, anything else ITEM, blank IGNORE).
pub fn suggest_level(item_number: &str) -> LevelChoice {
    let item = item_number.trim();
    if item.is_empty() || item.eq_ignore_ascii_case("nan") {
        return LevelChoice::ignore();
    }
    let level = match item.matches('.').count() {
        0 if item.chars().all(|c| c.is_ascii_digit()) => Level::N1,
        1 => Level::N2,
        2 => Level::N3,
        _ => Level::Item,
    };
    LevelChoice::Level(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn level_from_item_number() {
        assert_eq!(suggest_level("").level(), None);
        assert_eq!(suggest_level("nan").level(), None);
        assert_eq!(suggest_level("3").level(), Some(Level::N1));
        assert_eq!(suggest_level("3.1").level(), Some(Level::N2));
        assert_eq!(suggest_level("3.1.2").level(), Some(Level::N3));
        assert_eq!(suggest_level("3.1.2.4").level(), Some(Level::Item));
        assert_eq!(suggest_level("A").level(), Some(Level::Item));
    }

    #[test]
    fn column_map_last_match_wins() {
        let headers = [
            "Item",
            "Código",
            "Fonte",
            "Descrição do serviço",
            "Unid",
            "Quant.",
            "Valor Unit",
            "Valor Total",
        ];
        let map = suggest_column_map(&headers, &ColumnMap::default());
        assert_eq!(map.item, "Item");
        assert_eq!(map.code, "Código");
        assert_eq!(map.source, "Fonte");
        assert_eq!(map.description, "Descrição do serviço");
        assert_eq!(map.unit, "Unid");
        assert_eq!(map.quantity, "Quant.");
        assert_eq!(map.unit_price, "Valor Total");
    }

    #[test]
    fn accented_and_abbreviated_headers() {
        let map = suggest_column_map(&["Cód.", "Und"], &ColumnMap::default());
        assert_eq!(map.code, "Cód.");
        assert_eq!(map.unit, "Und");
    }

    #[test]
    fn unmatched_fields_keep_base() {
        let map = suggest_column_map(&["ITEM"], &ColumnMap::default());
        assert_eq!(map.description, ColumnMap::default().description);
    }

    #[test]
    fn reads_rows_below_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fonte.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, h) in ["ITEM", "DESCRIÇÃO", "QUANT."].iter().enumerate() {
            sheet.write_string(2, col as u16, *h).unwrap();
        }
        sheet.write_string(3, 0, "1").unwrap();
        sheet.write_string(3, 1, "GRUPO A").unwrap();
        sheet.write_string(4, 0, "1.1").unwrap();
        sheet.write_string(5, 0, "1.2").unwrap();
        sheet.write_string(5, 1, "Pintura").unwrap();
        sheet.write_number(5, 2, 12.5).unwrap();
        workbook.save(&path).unwrap();

        let log = MemoryLog::new();
        let table = read_source_rows(&path, 2, 100, Some("DESCRIÇÃO"), &log).unwrap();
        assert!(log.contains(log::Level::Debug, "Read 2 rows, 3 columns"));
        assert_eq!(table.headers, vec!["ITEM", "DESCRIÇÃO", "QUANT."]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].sheet_row, 4);
        assert_eq!(table.rows[1].value("QUANT."), "12.5");

        let levels = [LevelChoice::Level(Level::N1), LevelChoice::ignore()];
        let entries = table.entries(&levels);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value("DESCRIÇÃO"), "GRUPO A");
    }

    #[test]
    fn max_rows_limits_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fonte.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ITEM").unwrap();
        for row in 1..=10u32 {
            sheet.write_string(row, 0, &row.to_string()).unwrap();
        }
        workbook.save(&path).unwrap();
        let table = read_source_rows(&path, 0, 3, None, &MemoryLog::new()).unwrap();
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn boolean_cells_keep_their_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fonte.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "ITEM").unwrap();
        sheet.write_string(0, 1, "DESCRIÇÃO").unwrap();
        sheet.write_string(0, 2, "ATIVO").unwrap();
        sheet.write_string(1, 0, "1").unwrap();
        sheet.write_string(1, 1, "GRUPO").unwrap();
        sheet.write_boolean(1, 2, true).unwrap();
        workbook.save(&path).unwrap();

        let table = read_source_rows(&path, 0, 10, None, &MemoryLog::new()).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].value("ATIVO"), "true");
    }
}
