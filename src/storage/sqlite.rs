use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::Result;
use crate::models::{Report, SubthemeCount, SubthemeMatch};

/// Where a stored run's inputs came from.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub input_path: String,
    pub schema_path: String,
    pub run_date: DateTime<Utc>,
    pub papers_processed: usize,
}

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY,
                input_path TEXT NOT NULL,
                schema_path TEXT NOT NULL,
                run_date TEXT NOT NULL,
                papers_processed INTEGER NOT NULL,
                duplicate_ids INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subtheme_counts (
                run_id INTEGER NOT NULL REFERENCES runs(id),
                position INTEGER NOT NULL,
                theme TEXT NOT NULL,
                sub_theme TEXT NOT NULL,
                paper_count INTEGER NOT NULL,
                keyword_count INTEGER NOT NULL,
                PRIMARY KEY (run_id, position)
            );

            CREATE TABLE IF NOT EXISTS subtheme_hits (
                run_id INTEGER NOT NULL REFERENCES runs(id),
                position INTEGER NOT NULL,
                paper_id TEXT NOT NULL,
                theme TEXT NOT NULL,
                sub_theme TEXT NOT NULL,
                keyword TEXT NOT NULL,
                PRIMARY KEY (run_id, position)
            );

            CREATE TABLE IF NOT EXISTS paper_flags (
                run_id INTEGER NOT NULL REFERENCES runs(id),
                paper_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                column_label TEXT NOT NULL,
                flag INTEGER NOT NULL,
                PRIMARY KEY (run_id, paper_id, position)
            );

            CREATE INDEX IF NOT EXISTS idx_subtheme_hits_paper ON subtheme_hits(run_id, paper_id);
            "#,
        )?;

        Ok(())
    }

    /// Stores all three tables of `report` under a new run id, in one transaction.
    pub fn save_report(&self, report: &Report, input_path: &str, schema_path: &str) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO runs (input_path, schema_path, run_date, papers_processed, duplicate_ids)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                input_path,
                schema_path,
                Utc::now().to_rfc3339(),
                report.papers_processed as i64,
                report.duplicate_ids.len() as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO subtheme_counts (run_id, position, theme, sub_theme, paper_count, keyword_count)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for (position, count) in report.counts.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    count.theme,
                    count.sub_theme,
                    count.paper_count as i64,
                    count.keyword_count as i64,
                ])?;
            }

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO subtheme_hits (run_id, position, paper_id, theme, sub_theme, keyword)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for (position, hit) in report.hits.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    hit.paper_id,
                    hit.theme,
                    hit.sub_theme,
                    hit.keyword,
                ])?;
            }

            let mut stmt = tx.prepare(
                r#"
                INSERT INTO paper_flags (run_id, paper_id, position, column_label, flag)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for row in &report.flags.rows {
                for (position, (label, flag)) in report.flags.columns.iter().zip(&row.flags).enumerate() {
                    stmt.execute(params![run_id, row.paper_id, position as i64, label, *flag])?;
                }
            }
        }

        tx.commit()?;
        tracing::info!("Saved run {} to database", run_id);
        Ok(run_id)
    }

    pub fn get_run(&self, run_id: i64) -> Result<Option<RunRecord>> {
        let result = self.conn.query_row(
            "SELECT id, input_path, schema_path, run_date, papers_processed FROM runs WHERE id = ?1",
            params![run_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        );

        match result {
            Ok((id, input_path, schema_path, run_date_str, papers_processed)) => {
                let run_date = DateTime::parse_from_rfc3339(&run_date_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                Ok(Some(RunRecord {
                    id,
                    input_path,
                    schema_path,
                    run_date,
                    papers_processed: papers_processed as usize,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn latest_run_id(&self) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT MAX(id) FROM runs", [], |row| row.get::<_, Option<i64>>(0))?;
        Ok(id)
    }

    pub fn get_counts(&self, run_id: i64) -> Result<Vec<SubthemeCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT theme, sub_theme, paper_count, keyword_count
            FROM subtheme_counts
            WHERE run_id = ?1
            ORDER BY position
            "#,
        )?;

        let counts = stmt.query_map(params![run_id], |row| {
            Ok(SubthemeCount {
                theme: row.get(0)?,
                sub_theme: row.get(1)?,
                paper_count: row.get::<_, i64>(2)? as usize,
                keyword_count: row.get::<_, i64>(3)? as usize,
            })
        })?;

        counts.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_hits_for_paper(&self, run_id: i64, paper_id: &str) -> Result<Vec<SubthemeMatch>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT paper_id, theme, sub_theme, keyword
            FROM subtheme_hits
            WHERE run_id = ?1 AND paper_id = ?2
            ORDER BY position
            "#,
        )?;

        let hits = stmt.query_map(params![run_id, paper_id], |row| {
            Ok(SubthemeMatch {
                paper_id: row.get(0)?,
                theme: row.get(1)?,
                sub_theme: row.get(2)?,
                keyword: row.get(3)?,
            })
        })?;

        hits.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Papers flagged for a wide-table column in the given run.
    pub fn flagged_papers(&self, run_id: i64, column_label: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT paper_id FROM paper_flags WHERE run_id = ?1 AND column_label = ?2 AND flag = 1 ORDER BY rowid",
        )?;

        let ids = stmt.query_map(params![run_id, column_label], |row| row.get(0))?;
        ids.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}
