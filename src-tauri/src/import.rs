use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::NewContentRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

static HEADER_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid header separator regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Category,
    Url,
    Source,
    TimeSpentMinutes,
    Upvotes,
    Views,
    EngagementScore,
    ContentType,
    DifficultyLevel,
    TrendingScore,
}

impl Column {
    const ALL: [Column; 10] = [
        Column::Category,
        Column::Url,
        Column::Source,
        Column::TimeSpentMinutes,
        Column::Upvotes,
        Column::Views,
        Column::EngagementScore,
        Column::ContentType,
        Column::DifficultyLevel,
        Column::TrendingScore,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Url => "url",
            Self::Source => "source",
            Self::TimeSpentMinutes => "time_spent_minutes",
            Self::Upvotes => "upvotes",
            Self::Views => "views",
            Self::EngagementScore => "engagement_score",
            Self::ContentType => "content_type",
            Self::DifficultyLevel => "difficulty_level",
            Self::TrendingScore => "trending_score",
        }
    }

    fn from_header(raw: &str) -> Option<Self> {
        match normalize_header(raw).as_str() {
            "category" => Some(Self::Category),
            "url" | "link" => Some(Self::Url),
            "source" | "platform" => Some(Self::Source),
            "time_spent_minutes" | "time_spent" | "time_spent_min" => Some(Self::TimeSpentMinutes),
            "upvotes" => Some(Self::Upvotes),
            "views" => Some(Self::Views),
            "engagement_score" | "engagement" => Some(Self::EngagementScore),
            "content_type" | "type" => Some(Self::ContentType),
            "difficulty_level" | "difficulty" => Some(Self::DifficultyLevel),
            "trending_score" | "trending" => Some(Self::TrendingScore),
            _ => None,
        }
    }
}

/// Lowercases a header and collapses every run of non-alphanumerics to `_`,
/// so `Time Spent (minutes)` becomes `time_spent_minutes`.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim_start_matches('\u{feff}').trim().to_lowercase();
    HEADER_SEPARATORS
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Reads and validates every row of a content CSV.
///
/// A single bad row fails the whole read; the error names the 1-based data row.
pub fn read_csv(path: &Path) -> AppResult<Vec<NewContentRecord>> {
    let file = File::open(path).map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::StoreUnavailable(format!("content csv not found at {}", path.display()))
        }
        _ => AppError::Io(format!("failed to open {}: {}", path.display(), error)),
    })?;
    parse_csv(file)
}

pub fn parse_csv<R: std::io::Read>(reader: R) -> AppResult<Vec<NewContentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut positions: HashMap<Column, usize> = HashMap::new();
    for (index, header) in reader.headers()?.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            positions.entry(column).or_insert(index);
        }
    }
    if let Some(missing) = Column::ALL.iter().find(|column| !positions.contains_key(*column)) {
        return Err(AppError::Validation(format!(
            "content csv is missing required column '{}'",
            missing.name()
        )));
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let row = RowReader {
            row_number: index + 1,
            record: &record,
            positions: &positions,
        };
        rows.push(row.parse()?);
    }
    Ok(rows)
}

/// Replaces the mirror at `db_path` with the rows of `csv_path`.
///
/// The CSV is fully validated before the database is touched, so a bad file
/// leaves the previous load in place.
pub fn load_csv_into_database(csv_path: &Path, db_path: &Path) -> AppResult<usize> {
    let rows = read_csv(csv_path)?;
    let db = Database::new(db_path)?;
    db.replace_all(&rows)
}

struct RowReader<'a> {
    row_number: usize,
    record: &'a csv::StringRecord,
    positions: &'a HashMap<Column, usize>,
}

impl RowReader<'_> {
    fn parse(&self) -> AppResult<NewContentRecord> {
        Ok(NewContentRecord {
            category: self.required_text(Column::Category)?,
            url: self.required_text(Column::Url)?,
            source: self.text(Column::Source),
            time_spent_minutes: self.non_negative_decimal(Column::TimeSpentMinutes)?,
            upvotes: self.count(Column::Upvotes)?,
            views: self.count(Column::Views)?,
            engagement_score: self.unit_score(Column::EngagementScore)?,
            content_type: self.text(Column::ContentType),
            difficulty_level: self.text(Column::DifficultyLevel),
            trending_score: self.unit_score(Column::TrendingScore)?,
        })
    }

    fn raw(&self, column: Column) -> &str {
        self.positions
            .get(&column)
            .and_then(|index| self.record.get(*index))
            .unwrap_or_default()
    }

    fn text(&self, column: Column) -> String {
        self.raw(column).to_string()
    }

    fn required_text(&self, column: Column) -> AppResult<String> {
        let value = self.raw(column);
        if value.is_empty() {
            return Err(self.invalid(column, "must not be empty"));
        }
        Ok(value.to_string())
    }

    fn decimal(&self, column: Column) -> AppResult<f64> {
        let raw = self.raw(column);
        let value = raw
            .parse::<f64>()
            .map_err(|_| self.invalid(column, &format!("'{}' is not a number", raw)))?;
        if !value.is_finite() {
            return Err(self.invalid(column, &format!("'{}' is not a finite number", raw)));
        }
        // Folds -0.0 into 0.0 so ranking matches SQLite ordering.
        Ok(value + 0.0)
    }

    fn non_negative_decimal(&self, column: Column) -> AppResult<f64> {
        let value = self.decimal(column)?;
        if value < 0.0 {
            return Err(self.invalid(column, "must not be negative"));
        }
        Ok(value)
    }

    fn count(&self, column: Column) -> AppResult<i64> {
        let raw = self.raw(column);
        if let Ok(value) = raw.parse::<i64>() {
            if value < 0 {
                return Err(self.invalid(column, "must not be negative"));
            }
            return Ok(value);
        }
        // Exports that passed through a dataframe write integer columns as `12.0`.
        let value = self.non_negative_decimal(column)?;
        if value.fract() != 0.0 || value > i64::MAX as f64 {
            return Err(self.invalid(column, &format!("'{}' is not a whole number", raw)));
        }
        Ok(value as i64)
    }

    fn unit_score(&self, column: Column) -> AppResult<f64> {
        let value = self.decimal(column)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(self.invalid(column, &format!("{} is outside [0, 1]", value)));
        }
        Ok(value)
    }

    fn invalid(&self, column: Column, reason: &str) -> AppError {
        AppError::Validation(format!("row {}: {} {}", self.row_number, column.name(), reason))
    }
}
