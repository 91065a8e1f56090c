use crate::config::{validate_spreadsheet_path, AppConfig, GenerationJob};
use crate::db::{Db, LookupList, DEFAULT_PROFILE};
use crate::excel::{self, TemplateEngine};
use crate::logging::RunLog;
use crate::models::{ColumnMap, Field, LevelChoice};
use crate::services::{self, SourceTable};
use crate::types::{ColumnProfile, GeneratedBudget, HeaderScan, RunRecord, RunStats};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Everything the commands share: settings, the logger and the (optional) store.
pub struct AppState {
    pub config: AppConfig,
    pub log: Arc<dyn RunLog>,
    /// None when the history database could not be opened; generation still works.
    pub db: Option<Db>,
}

impl AppState {
    pub fn new(config: AppConfig, log: Arc<dyn RunLog>) -> Self {
        let db = match Db::new(config.db_path.clone()) {
            Ok(db) => Some(db),
            Err(e) => {
                log.warn(&format!(
                    "History database unavailable ({}): {}",
                    config.db_path.display(),
                    e
                ));
                None
            }
        };
        Self { config, log, db }
    }

    fn db(&self) -> Result<&Db, String> {
        self.db
            .as_ref()
            .ok_or_else(|| "History database is not available.".to_string())
    }
}

#[derive(Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn validate_spreadsheet(path: &Path) -> ValidationResult {
    match validate_spreadsheet_path(path) {
        Ok(()) => ValidationResult {
            valid: true,
            error: None,
        },
        Err(e) => ValidationResult {
            valid: false,
            error: Some(e),
        },
    }
}

/// One source row as shown before generation.
#[derive(Debug, Serialize)]
pub struct PreviewRow {
    pub sheet_row: usize,
    pub item: String,
    pub code: String,
    pub source: String,
    pub description: String,
    pub suggested: LevelChoice,
}

#[derive(Debug, Serialize)]
pub struct Preview {
    pub header_row: usize,
    pub headers: Vec<String>,
    pub columns: ColumnMap,
    pub rows: Vec<PreviewRow>,
}

pub fn locate(state: &AppState, path: &Path) -> Result<HeaderScan, String> {
    services::locate_header(path, state.log.as_ref()).map_err(|e| e.to_string())
}

fn resolve_header_row(state: &AppState, path: &Path, header_row: Option<usize>) -> Result<usize, String> {
    match header_row {
        Some(row) => Ok(row),
        None => Ok(locate(state, path)?.header_row),
    }
}

/// Read the source table. A given column map filters rows on its description
/// column; otherwise the map is suggested from the headers first.
fn load_table(
    state: &AppState,
    path: &Path,
    header_row: usize,
    max_rows: usize,
    columns: Option<ColumnMap>,
) -> Result<(SourceTable, ColumnMap), String> {
    match columns {
        Some(columns) => {
            let table = services::read_source_rows(
                path,
                header_row,
                max_rows,
                Some(&columns.description),
                state.log.as_ref(),
            )
            .map_err(|e| e.to_string())?;
            Ok((table, columns))
        }
        None => {
            let mut table =
                services::read_source_rows(path, header_row, max_rows, None, state.log.as_ref())
                    .map_err(|e| e.to_string())?;
            let base = default_profile(state);
            let columns = services::suggest_column_map(&table.headers, &base);
            table
                .rows
                .retain(|row| !row.value(&columns.description).is_empty());
            Ok((table, columns))
        }
    }
}

fn default_profile(state: &AppState) -> ColumnMap {
    state
        .db
        .as_ref()
        .and_then(|db| db.get_profile(DEFAULT_PROFILE).ok().flatten())
        .map(|p| p.column_mapping)
        .unwrap_or_default()
}

pub fn preview(
    state: &AppState,
    path: &Path,
    header_row: Option<usize>,
    max_rows: usize,
) -> Result<Preview, String> {
    validate_spreadsheet_path(path)?;
    let header_row = resolve_header_row(state, path, header_row)?;
    let (table, columns) = load_table(state, path, header_row, max_rows, None)?;
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let item = row.value(columns.get(Field::Item)).to_string();
            PreviewRow {
                sheet_row: row.sheet_row,
                suggested: services::suggest_level(&item),
                item,
                code: row.value(columns.get(Field::Code)).to_string(),
                source: row.value(columns.get(Field::Source)).to_string(),
                description: row.value(columns.get(Field::Description)).to_string(),
            }
        })
        .collect();
    Ok(Preview {
        header_row,
        headers: table.headers,
        columns,
        rows,
    })
}

/// Run a generation job on a worker thread, then record it in the history
/// and lookup lists. Store failures are logged and never fail the job.
pub fn generate_budget(state: &AppState, mut job: GenerationJob) -> Result<GeneratedBudget, String> {
    validate_spreadsheet_path(&job.source)?;
    validate_spreadsheet_path(&job.template)?;
    let started = Instant::now();

    let header_row = resolve_header_row(state, &job.source, job.header_row)?;
    let (table, columns) = load_table(state, &job.source, header_row, job.max_rows, job.columns.take())?;
    let levels: Vec<LevelChoice> = match job.levels.take() {
        Some(levels) if levels.len() != table.rows.len() => {
            return Err(format!(
                "Job lists {} levels but the source has {} rows.",
                levels.len(),
                table.rows.len()
            ));
        }
        Some(levels) => levels,
        None => table
            .rows
            .iter()
            .map(|row| services::suggest_level(row.value(&columns.item)))
            .collect(),
    };
    let entries = table.entries(&levels);
    state.log.info(&format!(
        "{} of {} source rows selected",
        entries.len(),
        table.rows.len()
    ));

    let mut meta = job.metadata;
    if meta.row_height.is_none() {
        meta.row_height = Some(state.config.row_height);
    }

    let engine = TemplateEngine::new(state.config.output_dir.clone(), Arc::clone(&state.log));
    let template = job.template.clone();
    let worker_meta = meta.clone();
    let budget = std::thread::spawn(move || engine.generate(&entries, &template, &columns, &worker_meta))
        .join()
        .map_err(|_| "Generation worker panicked.".to_string())?
        .map_err(|e| e.to_string())?;

    let project_name = if meta.title.trim().is_empty() {
        meta.output_name.clone()
    } else {
        meta.title.clone()
    };
    let record = RunRecord {
        id: 0,
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        project_name,
        location: meta.institution.clone(),
        bdi: meta.bdi,
        total_value: budget.totals.grand_total,
        output_path: budget.output_path.display().to_string(),
        item_count: budget.item_count as i64,
        group_count: budget.group_count as i64,
        duration_secs: started.elapsed().as_secs_f64(),
    };
    match state.db() {
        Ok(db) => {
            if let Err(e) = db.add_run(&record) {
                state.log.warn(&format!("Run not recorded: {}", e));
            }
            if let Err(e) = db.remember_metadata(&meta) {
                state.log.warn(&format!("Lookup lists not updated: {}", e));
            }
        }
        Err(e) => state.log.warn(&e),
    }
    Ok(budget)
}

pub fn init_template(state: &AppState, path: &Path) -> Result<PathBuf, String> {
    excel::write_template(path)?;
    state.log.info(&format!("Template written: {}", path.display()));
    Ok(path.to_path_buf())
}

pub fn get_history(state: &AppState, limit: u32) -> Result<Vec<RunRecord>, String> {
    state.db()?.recent_runs(limit)
}

pub fn get_stats(state: &AppState) -> Result<RunStats, String> {
    state.db()?.run_stats()
}

fn lookup_list(name: &str) -> Result<LookupList, String> {
    LookupList::parse(name).ok_or_else(|| {
        let known: Vec<&str> = LookupList::ALL.iter().map(|l| l.key()).collect();
        format!("Unknown list '{}'. Expected one of: {}", name, known.join(", "))
    })
}

pub fn list_values(state: &AppState, list: &str) -> Result<Vec<String>, String> {
    state.db()?.list_values(lookup_list(list)?)
}

pub fn add_list_value(state: &AppState, list: &str, value: &str) -> Result<bool, String> {
    state.db()?.add_lookup_value(lookup_list(list)?, value)
}

pub fn remove_list_value(state: &AppState, list: &str, value: &str) -> Result<bool, String> {
    state.db()?.remove_lookup_value(lookup_list(list)?, value)
}

pub fn get_profiles(state: &AppState) -> Result<Vec<ColumnProfile>, String> {
    state.db()?.list_profiles()
}

pub fn get_profile(state: &AppState, name: &str) -> Result<ColumnProfile, String> {
    state
        .db()?
        .get_profile(name)?
        .ok_or_else(|| format!("Profile not found: {}", name))
}

pub fn save_profile(state: &AppState, name: &str, mapping_path: &Path) -> Result<i64, String> {
    let text = std::fs::read_to_string(mapping_path).map_err(|e| e.to_string())?;
    let mapping: ColumnMap =
        serde_json::from_str(&text).map_err(|e| format!("Invalid column mapping: {}", e))?;
    state.db()?.save_profile(name, &mapping)
}

pub fn delete_profile(state: &AppState, name: &str) -> Result<bool, String> {
    state.db()?.delete_profile(name)
}
