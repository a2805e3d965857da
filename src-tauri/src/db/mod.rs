use crate::errors::{AppError, AppResult};
use crate::models::{ContentRecord, ContentStats, FilterOptions, NewContentRecord};
use crate::query::{fold_case, ContentQuery, CONTENT_COLUMNS, FOLD_CASE_FN};
use crate::store::ContentStore;
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQLite mirror of the content CSV.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) a writable mirror and applies the schema.
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|err| {
            AppError::StoreUnavailable(format!("failed to open {}: {}", path.display(), err))
        })?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        register_functions(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// Opens an existing mirror for the dashboard's read path.
    pub fn open_read_only(path: &Path) -> AppResult<Self> {
        if !path.is_file() {
            return Err(AppError::StoreUnavailable(format!(
                "content database not found at {}",
                path.display()
            )));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|err| {
            AppError::StoreUnavailable(format!("failed to open {}: {}", path.display(), err))
        })?;

        let has_table: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'content_records'",
                [],
                |row| row.get(0),
            )
            .map_err(|err| AppError::StoreUnavailable(format!("{} is not readable: {}", path.display(), err)))?;
        if has_table == 0 {
            return Err(AppError::StoreUnavailable(format!(
                "{} has no content_records table; run the content import first",
                path.display()
            )));
        }
        register_functions(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn list_content(&self, query: &ContentQuery) -> AppResult<Vec<ContentRecord>> {
        let built = query.to_sql();
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut statement = conn.prepare(&built.sql)?;
        let rows = statement.query_map(rusqlite::params_from_iter(built.params.iter()), parse_content_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn count_content(&self) -> AppResult<i64> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count = conn.query_row("SELECT COUNT(*) FROM content_records", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn content_stats(&self) -> AppResult<ContentStats> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let mut stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(AVG(time_spent_minutes), 0.0),
                    COALESCE(SUM(upvotes), 0),
                    COALESCE(SUM(views), 0),
                    COALESCE(AVG(engagement_score), 0.0),
                    COALESCE(AVG(trending_score), 0.0)
             FROM content_records",
            [],
            |row| {
                Ok(ContentStats {
                    total_records: row.get(0)?,
                    avg_time_spent_minutes: row.get(1)?,
                    total_upvotes: row.get(2)?,
                    total_views: row.get(3)?,
                    avg_engagement_score: row.get(4)?,
                    avg_trending_score: row.get(5)?,
                    categories: Vec::new(),
                    sources: Vec::new(),
                })
            },
        )?;
        stats.categories = distinct_values(&conn, "category")?;
        stats.sources = distinct_values(&conn, "source")?;
        Ok(stats)
    }

    pub fn filter_options(&self) -> AppResult<FilterOptions> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        Ok(FilterOptions {
            categories: distinct_values(&conn, "category")?,
            sources: distinct_values(&conn, "source")?,
            content_types: distinct_values(&conn, "content_type")?,
            difficulty_levels: distinct_values(&conn, "difficulty_level")?,
        })
    }

    /// Bulk load: replaces every row in one transaction and returns the new row count.
    pub fn replace_all(&self, records: &[NewContentRecord]) -> AppResult<usize> {
        let loaded_at = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM content_records", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO content_records (
                   id, category, url, source, time_spent_minutes, upvotes, views,
                   engagement_score, content_type, difficulty_level, trending_score, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            )?;
            for (index, record) in records.iter().enumerate() {
                insert.execute(params![
                    index as i64 + 1,
                    record.category,
                    record.url,
                    record.source,
                    record.time_spent_minutes,
                    record.upvotes,
                    record.views,
                    record.engagement_score,
                    record.content_type,
                    record.difficulty_level,
                    record.trending_score,
                    loaded_at,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            db = %self.db_path.display(),
            removed,
            inserted = records.len(),
            "replaced content records"
        );
        Ok(records.len())
    }
}

impl ContentStore for Database {
    fn list_content(&self, query: &ContentQuery) -> AppResult<Vec<ContentRecord>> {
        Database::list_content(self, query)
    }

    fn content_stats(&self) -> AppResult<ContentStats> {
        Database::content_stats(self)
    }

    fn filter_options(&self) -> AppResult<FilterOptions> {
        Database::filter_options(self)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }
}

fn register_functions(conn: &Connection) -> AppResult<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| fold_case(&text))),
    )?;
    Ok(())
}

fn distinct_values(conn: &Connection, column: &'static str) -> AppResult<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT {column} FROM content_records WHERE {column} <> '' ORDER BY {column} ASC",
        column = column
    );
    let mut statement = conn.prepare(&sql)?;
    let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
    let mut values = Vec::new();
    for row in rows {
        values.push(row?);
    }
    Ok(values)
}

fn parse_content_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentRecord> {
    Ok(ContentRecord {
        id: row.get(0)?,
        category: row.get(1)?,
        url: row.get(2)?,
        source: row.get(3)?,
        time_spent_minutes: row.get(4)?,
        upvotes: row.get(5)?,
        views: row.get(6)?,
        engagement_score: row.get(7)?,
        content_type: row.get(8)?,
        difficulty_level: row.get(9)?,
        trending_score: row.get(10)?,
        created_at: parse_time(&row.get::<_, String>(11)?)?,
        updated_at: parse_time(&row.get::<_, String>(12)?)?,
    })
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}
