use budget_sheet_lib::commands::{self, AppState};
use budget_sheet_lib::config::{AppConfig, GenerationJob};
use budget_sheet_lib::logging::{MemoryLog, RunLog};
use budget_sheet_lib::models::Level;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn state(dir: &Path) -> (AppState, MemoryLog) {
    let log = MemoryLog::new();
    let config = AppConfig {
        output_dir: dir.join("Output"),
        db_path: dir.join("data").join("history.db"),
        log_file: None,
        row_height: 20.0,
    };
    let shared: Arc<dyn RunLog> = Arc::new(log.clone());
    (AppState::new(config, shared), log)
}

/// Source export with two title lines above the header.
fn source(dir: &Path) -> PathBuf {
    let path = dir.join("sintetico.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "ORÇAMENTO SINTÉTICO").unwrap();
    let headers = ["Item", "Código", "Banco", "Descrição", "Und", "Quant.", "Valor Unit", "Total"];
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string(2, col as u16, *h).unwrap();
    }
    let rows: [[&str; 7]; 4] = [
        ["1", "", "", "SERVIÇOS INICIAIS", "", "", ""],
        ["1.1", "", "", "MOBILIZAÇÃO", "", "", ""],
        ["1.1.1.1", "98524", "SINAPI", "Limpeza manual de vegetação", "M2", "120", "3,45"],
        ["", "", "", "", "", "", ""],
    ];
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(3 + i as u32, col as u16, *value).unwrap();
            }
        }
    }
    workbook.save(&path).unwrap();
    path
}

fn job(dir: &Path) -> GenerationJob {
    let template = dir.join("modelo.xlsx");
    commands::init_template(&state(dir).0, &template).unwrap();
    let path = dir.join("job.json");
    std::fs::write(
        &path,
        r#"{"source": "sintetico.xlsx", "template": "modelo.xlsx", "bdi_percent": "28,82",
            "metadata": {"output_name": "Limpeza", "title": "limpeza do terreno",
                         "institution": "campus sul", "sector": "obras"}}"#,
    )
    .unwrap();
    GenerationJob::from_file(&path).unwrap()
}

#[test]
fn preview_suggests_columns_and_levels() {
    let dir = tempfile::tempdir().unwrap();
    let src = source(dir.path());
    let (state, _log) = state(dir.path());

    let preview = commands::preview(&state, &src, None, 50).unwrap();
    assert_eq!(preview.header_row, 2);
    assert_eq!(preview.columns.description, "Descrição");
    assert_eq!(preview.columns.unit_price, "Valor Unit");
    assert_eq!(preview.rows.len(), 3);
    assert_eq!(preview.rows[0].sheet_row, 4);
    assert_eq!(preview.rows[0].suggested.level(), Some(Level::N1));
    assert_eq!(preview.rows[1].suggested.level(), Some(Level::N2));
    assert_eq!(preview.rows[2].suggested.level(), Some(Level::Item));
}

#[test]
fn generate_records_history_and_lookup_values() {
    let dir = tempfile::tempdir().unwrap();
    source(dir.path());
    let job = job(dir.path());
    let (state, log) = state(dir.path());

    let budget = commands::generate_budget(&state, job).unwrap();
    assert_eq!(budget.output_path, dir.path().join("Output").join("Limpeza.xlsx"));
    assert_eq!(budget.item_count, 1);
    assert_eq!(budget.group_count, 2);
    assert!(log.contains(log::Level::Info, "3 of 3 source rows selected"));

    let book = umya_spreadsheet::reader::xlsx::read(&budget.output_path).unwrap();
    let sheet = book.get_active_sheet();
    let height = sheet.get_row_dimension(&27).map(|r| *r.get_height()).unwrap_or_default();
    assert_eq!(height, 20.0);
    let deduction = sheet.get_cell((8, 31)).map(|c| c.get_formula().to_string());
    assert_eq!(deduction.as_deref(), Some("H30*0.19"));

    let history = commands::get_history(&state, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].project_name, "limpeza do terreno");
    assert_eq!(history[0].item_count, 1);
    let expected = 120.0 * 3.45 * 1.2882 * 0.81;
    assert!((history[0].total_value - expected).abs() < 1e-6);

    assert_eq!(commands::list_values(&state, "institution").unwrap(), vec!["CAMPUS SUL".to_string()]);
    assert_eq!(commands::list_values(&state, "sector").unwrap(), vec!["OBRAS".to_string()]);
    assert!(commands::list_values(&state, "campus").is_err());
    assert_eq!(commands::get_stats(&state).unwrap().total_runs, 1);
}

#[test]
fn job_row_height_wins_over_configured_height() {
    let dir = tempfile::tempdir().unwrap();
    source(dir.path());
    let mut job = job(dir.path());
    job.metadata.row_height = Some(24.75);
    let (state, _log) = state(dir.path());

    let budget = commands::generate_budget(&state, job).unwrap();
    let book = umya_spreadsheet::reader::xlsx::read(&budget.output_path).unwrap();
    let height = book
        .get_active_sheet()
        .get_row_dimension(&27)
        .map(|r| *r.get_height())
        .unwrap_or_default();
    assert_eq!(height, 24.75);
}

#[test]
fn level_count_must_match_rows() {
    let dir = tempfile::tempdir().unwrap();
    source(dir.path());
    let mut job = job(dir.path());
    job.levels = Some(vec![budget_sheet_lib::models::LevelChoice::Level(Level::N1)]);
    let (state, _log) = state(dir.path());
    let err = commands::generate_budget(&state, job).unwrap_err();
    assert!(err.contains("1 levels"));
}

#[test]
fn missing_database_does_not_block_generation() {
    let dir = tempfile::tempdir().unwrap();
    source(dir.path());
    let job = job(dir.path());
    // A file where the database directory should be makes the store unavailable.
    std::fs::write(dir.path().join("blocker"), b"x").unwrap();
    let log = MemoryLog::new();
    let config = AppConfig {
        output_dir: dir.path().join("Output"),
        db_path: dir.path().join("blocker").join("history.db"),
        log_file: None,
        row_height: 24.75,
    };
    let state = AppState::new(config, Arc::new(log.clone()));
    assert!(state.db.is_none());

    commands::generate_budget(&state, job).unwrap();
    assert!(log.contains(log::Level::Warn, "not available"));
    assert!(commands::get_history(&state, 5).is_err());
}

#[test]
fn profiles_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _log) = state(dir.path());
    let mapping = dir.path().join("map.json");
    std::fs::write(&mapping, r#"{"DESCRICAO": "Discriminação", "UNIT": "Preço"}"#).unwrap();

    commands::save_profile(&state, "SEINFRA", &mapping).unwrap();
    let profile = commands::get_profile(&state, "SEINFRA").unwrap();
    assert_eq!(profile.column_mapping.description, "Discriminação");
    assert_eq!(profile.column_mapping.item, "ITEM");
    assert_eq!(commands::get_profile(&state, "PADRAO").unwrap().id, 0);
    assert!(commands::delete_profile(&state, "SEINFRA").unwrap());
    assert!(commands::get_profile(&state, "SEINFRA").is_err());
}
