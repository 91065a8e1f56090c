use crate::models::{ColumnMap, HeaderMetadata};
use crate::types::{ColumnProfile, RunRecord, RunStats};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

/// Name of the profile used when the caller does not pick one.
pub const DEFAULT_PROFILE: &str = "PADRAO";

/// Autocomplete lists fed by the header metadata of each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupList {
    Institution,
    Sector,
    Requester,
    Preparer,
    Intern,
    Fiscal,
}

impl LookupList {
    pub const ALL: [LookupList; 6] = [
        LookupList::Institution,
        LookupList::Sector,
        LookupList::Requester,
        LookupList::Preparer,
        LookupList::Intern,
        LookupList::Fiscal,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LookupList::Institution => "institution",
            LookupList::Sector => "sector",
            LookupList::Requester => "requester",
            LookupList::Preparer => "preparer",
            LookupList::Intern => "intern",
            LookupList::Fiscal => "fiscal",
        }
    }

    pub fn parse(s: &str) -> Option<LookupList> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|list| list.key() == s)
    }

    /// The metadata field each list collects.
    pub fn value_in(self, meta: &HeaderMetadata) -> &str {
        match self {
            LookupList::Institution => &meta.institution,
            LookupList::Sector => &meta.sector,
            LookupList::Requester => &meta.requester,
            LookupList::Preparer => &meta.preparer,
            LookupList::Intern => &meta.intern,
            LookupList::Fiscal => &meta.fiscal_agent,
        }
    }
}

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn new(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let conn = Connection::open(&db_path).map_err(|e| e.to_string())?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO schema_version (version) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM schema_version LIMIT 1);
            CREATE TABLE IF NOT EXISTS budget_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generated_at TEXT NOT NULL,
                project_name TEXT NOT NULL,
                location TEXT NOT NULL,
                bdi REAL NOT NULL,
                total_value REAL NOT NULL,
                output_path TEXT NOT NULL,
                item_count INTEGER NOT NULL,
                group_count INTEGER NOT NULL,
                duration_secs REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS lookup_values (
                list_key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (list_key, value)
            );
            ",
        )
        .map_err(|e| e.to_string())?;

        // Migration 002: named column-map profiles
        let current_version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(1);
        if current_version < 2 {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE,
                    column_mapping TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| e.to_string())?;
            conn.execute("UPDATE schema_version SET version = 2", [])
                .map_err(|e| e.to_string())?;
        }

        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn schema_version(&self) -> Result<i64, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .map_err(|e| e.to_string())
    }

    // --- run history ---

    pub fn add_run(&self, run: &RunRecord) -> Result<i64, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO budget_runs
             (generated_at, project_name, location, bdi, total_value, output_path,
              item_count, group_count, duration_secs)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &run.generated_at,
                &run.project_name,
                &run.location,
                run.bdi,
                run.total_value,
                &run.output_path,
                run.item_count,
                run.group_count,
                run.duration_secs,
            ],
        )
        .map_err(|e| format!("Failed to record run: {}", e))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn run_stats(&self) -> Result<RunStats, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let (total_runs, total_value, average_items): (i64, Option<f64>, Option<f64>) = conn
            .query_row(
                "SELECT COUNT(*), SUM(total_value), AVG(item_count) FROM budget_runs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e| e.to_string())?;
        let last_project: Option<String> = conn
            .query_row(
                "SELECT project_name FROM budget_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        Ok(RunStats {
            total_runs,
            total_value: total_value.unwrap_or(0.0),
            average_items: average_items.unwrap_or(0.0),
            last_project,
        })
    }

    /// Newest first.
    pub fn recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT id, generated_at, project_name, location, bdi, total_value, output_path,
                        item_count, group_count, duration_secs
                 FROM budget_runs ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    generated_at: row.get(1)?,
                    project_name: row.get(2)?,
                    location: row.get(3)?,
                    bdi: row.get(4)?,
                    total_value: row.get(5)?,
                    output_path: row.get(6)?,
                    item_count: row.get(7)?,
                    group_count: row.get(8)?,
                    duration_secs: row.get(9)?,
                })
            })
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| e.to_string())
    }

    // --- lookup lists ---

    pub fn list_values(&self, list: LookupList) -> Result<Vec<String>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT value FROM lookup_values WHERE list_key = ?1 ORDER BY value")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![list.key()], |row| row.get::<_, String>(0))
            .map_err(|e| e.to_string())?;
        rows.collect::<Result<Vec<_>, _>>().map_err(|e| e.to_string())
    }

    /// Trim and uppercase `value` before storing. Blank values and duplicates
    /// are ignored; returns whether a new value was stored.
    pub fn add_lookup_value(&self, list: LookupList, value: &str) -> Result<bool, String> {
        let value = value.trim().to_uppercase();
        if value.is_empty() {
            return Ok(false);
        }
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO lookup_values (list_key, value) VALUES (?1, ?2)",
                params![list.key(), value],
            )
            .map_err(|e| e.to_string())?;
        Ok(changed > 0)
    }

    pub fn remove_lookup_value(&self, list: LookupList, value: &str) -> Result<bool, String> {
        let value = value.trim().to_uppercase();
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let changed = conn
            .execute(
                "DELETE FROM lookup_values WHERE list_key = ?1 AND value = ?2",
                params![list.key(), value],
            )
            .map_err(|e| e.to_string())?;
        Ok(changed > 0)
    }

    /// Feed every lookup list from one run's metadata. Returns how many values were new.
    pub fn remember_metadata(&self, meta: &HeaderMetadata) -> Result<usize, String> {
        let mut added = 0;
        for list in LookupList::ALL {
            if self.add_lookup_value(list, list.value_in(meta))? {
                added += 1;
            }
        }
        Ok(added)
    }

    // --- column-map profiles ---

    /// Insert or replace the profile called `name`.
    pub fn save_profile(&self, name: &str, mapping: &ColumnMap) -> Result<i64, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Profile name is required.".to_string());
        }
        let json = serde_json::to_string(mapping).map_err(|e| format!("Serialize mapping: {}", e))?;
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO profiles (name, column_mapping) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET column_mapping = excluded.column_mapping",
            params![name, json],
        )
        .map_err(|e| format!("Failed to save profile: {}", e))?;
        conn.query_row("SELECT id FROM profiles WHERE name = ?1", params![name], |r| r.get(0))
            .map_err(|e| e.to_string())
    }

    /// Stored profile, or the built-in mapping when `PADRAO` was never saved.
    pub fn get_profile(&self, name: &str) -> Result<Option<ColumnProfile>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let row: Option<(i64, String, String)> = conn
            .query_row(
                "SELECT id, name, column_mapping FROM profiles WHERE name = ?1",
                params![name.trim()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        match row {
            Some((id, name, json)) => {
                let column_mapping: ColumnMap =
                    serde_json::from_str(&json).map_err(|e| format!("Invalid profile mapping: {}", e))?;
                Ok(Some(ColumnProfile {
                    id,
                    name,
                    column_mapping,
                }))
            }
            None if name.trim() == DEFAULT_PROFILE => Ok(Some(ColumnProfile {
                id: 0,
                name: DEFAULT_PROFILE.to_string(),
                column_mapping: ColumnMap::default(),
            })),
            None => Ok(None),
        }
    }

    pub fn list_profiles(&self) -> Result<Vec<ColumnProfile>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT id, name, column_mapping FROM profiles ORDER BY name")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| e.to_string())?;
        let mut out = Vec::new();
        for r in rows {
            let (id, name, json) = r.map_err(|e| e.to_string())?;
            let column_mapping = serde_json::from_str(&json).unwrap_or_default();
            out.push(ColumnProfile {
                id,
                name,
                column_mapping,
            });
        }
        Ok(out)
    }

    pub fn delete_profile(&self, name: &str) -> Result<bool, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        let changed = conn
            .execute("DELETE FROM profiles WHERE name = ?1", params![name.trim()])
            .map_err(|e| e.to_string())?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn open() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::new(dir.path().join("nested").join("history.db")).unwrap();
        (dir, db)
    }

    fn run(project: &str, total: f64, items: i64) -> RunRecord {
        RunRecord {
            id: 0,
            generated_at: "2026-01-10 09:30:00".to_string(),
            project_name: project.to_string(),
            location: "CAMPUS CENTRO".to_string(),
            bdi: 0.2882,
            total_value: total,
            output_path: format!("Output/{}.xlsx", project),
            item_count: items,
            group_count: 1,
            duration_secs: 0.4,
        }
    }

    #[test]
    fn migrations_reach_current_version_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let db = Db::new(path.clone()).unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);
        drop(db);
        let db = Db::new(path).unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);
    }

    #[test]
    fn empty_stats() {
        let (_dir, db) = open();
        assert_eq!(db.run_stats().unwrap(), RunStats::default());
        assert!(db.recent_runs(10).unwrap().is_empty());
    }

    #[test]
    fn stats_and_recent_runs() {
        let (_dir, db) = open();
        db.add_run(&run("Reforma A", 1000.0, 4)).unwrap();
        db.add_run(&run("Reforma B", 500.0, 2)).unwrap();

        let stats = db.run_stats().unwrap();
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.total_value, 1500.0);
        assert_eq!(stats.average_items, 3.0);
        assert_eq!(stats.last_project.as_deref(), Some("Reforma B"));

        let recent = db.recent_runs(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].project_name, "Reforma B");
    }

    #[test]
    fn lookup_values_are_normalized() {
        let (_dir, db) = open();
        assert!(db.add_lookup_value(LookupList::Sector, "  obras ").unwrap());
        assert!(!db.add_lookup_value(LookupList::Sector, "OBRAS").unwrap());
        assert!(!db.add_lookup_value(LookupList::Sector, "   ").unwrap());
        db.add_lookup_value(LookupList::Sector, "almoxarifado").unwrap();
        db.add_lookup_value(LookupList::Intern, "ana").unwrap();

        assert_eq!(
            db.list_values(LookupList::Sector).unwrap(),
            vec!["ALMOXARIFADO".to_string(), "OBRAS".to_string()]
        );
        assert!(db.remove_lookup_value(LookupList::Sector, "obras").unwrap());
        assert!(!db.remove_lookup_value(LookupList::Sector, "obras").unwrap());
        assert_eq!(db.list_values(LookupList::Intern).unwrap(), vec!["ANA".to_string()]);
    }

    #[test]
    fn metadata_feeds_every_list() {
        let (_dir, db) = open();
        let meta = HeaderMetadata {
            institution: "campus norte".into(),
            fiscal_agent: "joão".into(),
            ..Default::default()
        };
        assert_eq!(db.remember_metadata(&meta).unwrap(), 2);
        assert_eq!(db.list_values(LookupList::Fiscal).unwrap(), vec!["JOÃO".to_string()]);
        assert_eq!(LookupList::parse(" Institution "), Some(LookupList::Institution));
        assert_eq!(LookupList::parse("campus"), None);
    }

    #[test]
    fn profiles_upsert_and_default() {
        let (_dir, db) = open();
        let default = db.get_profile(DEFAULT_PROFILE).unwrap().unwrap();
        assert_eq!(default.column_mapping, ColumnMap::default());
        assert!(db.get_profile("SINAPI").unwrap().is_none());

        let mut mapping = ColumnMap::default();
        mapping.description = "Discriminação".to_string();
        let id = db.save_profile("SINAPI", &mapping).unwrap();
        mapping.unit = "Un".to_string();
        assert_eq!(db.save_profile("SINAPI", &mapping).unwrap(), id);

        let stored = db.get_profile("SINAPI").unwrap().unwrap();
        assert_eq!(stored.column_mapping.unit, "Un");
        assert_eq!(db.list_profiles().unwrap().len(), 1);
        assert!(db.delete_profile("SINAPI").unwrap());
        assert!(db.list_profiles().unwrap().is_empty());
        assert!(db.save_profile("  ", &mapping).is_err());
    }
}
