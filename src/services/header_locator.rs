//! Header row detection on source spreadsheets (calamine, 0-based sheet rows).

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

use crate::error::LocatorError;
use crate::logging::RunLog;
use crate::types::HeaderScan;

/// Only the first rows of a sheet are scanned for the header.
pub const SCAN_ROWS: usize = 50;

const DESCRIPTION_KEYWORDS: &[&str] = &["DESCRI", "DISCRIM", "SERVIÇO"];

/// First worksheet of `path` plus the sheet row its range starts at.
pub(crate) fn first_sheet(path: &Path) -> Result<(Range<Data>, usize), LocatorError> {
    if !path.exists() {
        return Err(LocatorError::NotFound(path.display().to_string()));
    }
    let mut workbook = open_workbook_auto(path).map_err(|e| LocatorError::Read(e.to_string()))?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LocatorError::Read("workbook has no worksheets".to_string()))?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| LocatorError::Read(e.to_string()))?;
    // A range begins at its first used cell; leading blank rows still count.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    Ok((range, first_row))
}

/// Display text of any cell kind (booleans and dates included), trimmed.
pub(crate) fn cell_text(cell: &Data) -> String {
    cell.to_string().trim().to_string()
}

/// A header row names an item column and a description/service column.
pub fn is_header_row<S: AsRef<str>>(cells: &[S]) -> bool {
    let upper: Vec<String> = cells.iter().map(|c| c.as_ref().to_uppercase()).collect();
    let has_item = upper.iter().any(|c| c.contains("ITEM"));
    let has_description = upper
        .iter()
        .any(|c| DESCRIPTION_KEYWORDS.iter().any(|k| c.contains(k)));
    has_item && has_description
}

/// Find the header row of the first worksheet. Falls back to row 0 with a
/// warning when nothing in the first 50 rows matches.
pub fn locate_header(path: &Path, log: &dyn RunLog) -> Result<HeaderScan, LocatorError> {
    let (range, first_row) = first_sheet(path)?;
    let found = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i, row))
        .take_while(|(sheet_row, _)| *sheet_row < SCAN_ROWS)
        .find(|(_, row)| {
            let cells: Vec<String> = row.iter().map(cell_text).collect();
            is_header_row(&cells)
        })
        .map(|(sheet_row, _)| sheet_row);

    match found {
        Some(header_row) => {
            log.info(&format!("Header found at row {}", header_row + 1));
            Ok(HeaderScan {
                path: path.to_path_buf(),
                header_row,
                detected: true,
            })
        }
        None => {
            log.warn(&format!(
                "No header row found in the first {} rows of {}, using row 1",
                SCAN_ROWS,
                path.display()
            ));
            Ok(HeaderScan {
                path: path.to_path_buf(),
                header_row: 0,
                detected: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLog;
    use log::Level;
    use rust_xlsxwriter::Workbook;

    fn sheet_with_rows(dir: &Path, rows: &[(u32, &[&str])]) -> std::path::PathBuf {
        let path = dir.join("fonte.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (row, cells) in rows {
            for (col, text) in cells.iter().enumerate() {
                sheet.write_string(*row, col as u16, *text).unwrap();
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn keyword_pairs() {
        assert!(is_header_row(&["Item", "Código", "Descrição"]));
        assert!(is_header_row(&["ITEM", "DISCRIMINAÇÃO"]));
        assert!(is_header_row(&["item", "serviço"]));
        assert!(!is_header_row(&["ITEM", "VALOR"]));
        assert!(!is_header_row(&["DESCRIÇÃO", "UND"]));
    }

    #[test]
    fn cell_text_covers_every_kind() {
        assert_eq!(cell_text(&Data::String("  Descrição ".into())), "Descrição");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn counts_leading_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = sheet_with_rows(
            dir.path(),
            &[(3, &["PLANILHA"][..]), (6, &["ITEM", "CÓDIGO", "DESCRIÇÃO"][..]), (7, &["1", "", "GRUPO"][..])],
        );
        let log = MemoryLog::new();
        let scan = locate_header(&path, &log).unwrap();
        assert_eq!(scan.header_row, 6);
        assert!(scan.detected);
    }

    #[test]
    fn falls_back_to_first_row_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = sheet_with_rows(dir.path(), &[(0, &["A", "B"][..]), (1, &["1", "2"][..])]);
        let log = MemoryLog::new();
        let scan = locate_header(&path, &log).unwrap();
        assert_eq!(scan.header_row, 0);
        assert!(!scan.detected);
        assert!(log.contains(Level::Warn, "No header row found"));
    }

    #[test]
    fn header_below_scan_window_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = sheet_with_rows(dir.path(), &[(0, &["x"][..]), (60, &["ITEM", "DESCRIÇÃO"][..])]);
        let scan = locate_header(&path, &MemoryLog::new()).unwrap();
        assert!(!scan.detected);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = locate_header(Path::new("/nonexistent/fonte.xlsx"), &MemoryLog::new()).unwrap_err();
        assert!(matches!(err, LocatorError::NotFound(_)));
    }
}
