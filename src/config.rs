//! Runtime settings from the environment (and an optional `.env`), plus the
//! on-disk job description consumed by `generate`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::excel::numeric::parse_bdi_percent;
use crate::logging::RunLog;
use crate::models::{ColumnMap, HeaderMetadata, LevelChoice, DEFAULT_ROW_HEIGHT};

pub const DEFAULT_OUTPUT_DIR: &str = "Output";
pub const DB_FILE_NAME: &str = "budget_history.db";
const APP_DIR: &str = "budget-sheet";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub row_height: f64,
}

impl AppConfig {
    /// Load `.env` from the working directory when present, then read the
    /// `BUDGET_*` variables.
    pub fn load(log: &dyn RunLog) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log.debug(&format!("Loaded environment from {}", path.display()));
        }
        Self::from_lookup(|key| std::env::var(key).ok(), log)
    }

    pub fn from_lookup<F>(lookup: F, log: &dyn RunLog) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let row_height = match non_empty("BUDGET_ROW_HEIGHT") {
            Some(raw) => raw.replace(',', ".").parse::<f64>().unwrap_or_else(|_| {
                log.warn(&format!(
                    "BUDGET_ROW_HEIGHT '{}' is not a number, using {}",
                    raw, DEFAULT_ROW_HEIGHT
                ));
                DEFAULT_ROW_HEIGHT
            }),
            None => DEFAULT_ROW_HEIGHT,
        };

        Self {
            output_dir: non_empty("BUDGET_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            db_path: non_empty("BUDGET_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            log_file: non_empty("BUDGET_LOG_FILE").map(PathBuf::from),
            row_height,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DB_FILE_NAME)
}

fn default_max_rows() -> usize {
    500
}

/// One generation request, read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub source: PathBuf,
    pub template: PathBuf,
    /// 0-based header row; located automatically when absent.
    #[serde(default)]
    pub header_row: Option<usize>,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Column map; suggested from the source headers when absent.
    #[serde(default)]
    pub columns: Option<ColumnMap>,
    /// Per-row levels in source order; suggested from item numbers when absent.
    #[serde(default)]
    pub levels: Option<Vec<LevelChoice>>,
    /// BDI as typed on the form ("28,82%"); replaces `metadata.bdi` when set.
    #[serde(default)]
    pub bdi_percent: Option<String>,
    #[serde(default)]
    pub metadata: HeaderMetadata,
}

impl GenerationJob {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Could not read job file {}: {}", path.display(), e))?;
        let mut job: GenerationJob =
            serde_json::from_str(&text).map_err(|e| format!("Invalid job file: {}", e))?;
        if let Some(raw) = job.bdi_percent.as_deref() {
            job.metadata.bdi = parse_bdi_percent(raw)?;
        }
        // Relative paths are relative to the job file.
        if let Some(base) = path.parent() {
            job.source = resolve(base, &job.source);
            job.template = resolve(base, &job.template);
        }
        Ok(job)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Source and template files must exist, be xlsx/xls and be non-empty.
pub fn validate_spreadsheet_path(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if ext != "xlsx" && ext != "xls" {
        return Err(format!("Unsupported file type '{}': expected .xlsx or .xls", ext));
    }
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if metadata.len() == 0 {
        return Err(format!("File is empty: {}", path.display()));
    }
    Ok(())
}
