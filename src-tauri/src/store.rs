use crate::errors::AppResult;
use crate::import;
use crate::metrics;
use crate::models::{ContentRecord, ContentStats, FilterOptions};
use crate::query::ContentQuery;
use chrono::Utc;
use std::path::Path;

/// Read side of a content backing store.
pub trait ContentStore: Send + Sync {
    fn list_content(&self, query: &ContentQuery) -> AppResult<Vec<ContentRecord>>;
    fn content_stats(&self) -> AppResult<ContentStats>;
    fn filter_options(&self) -> AppResult<FilterOptions>;
    fn describe(&self) -> String;
}

/// CSV-backed store: rows are read once and held in load order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<ContentRecord>,
    origin: String,
}

impl MemoryStore {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self {
            records,
            origin: "memory".to_string(),
        }
    }

    pub fn from_csv(path: &Path) -> AppResult<Self> {
        let loaded_at = Utc::now();
        let records = import::read_csv(path)?
            .into_iter()
            .enumerate()
            .map(|(index, row)| row.into_record(index as i64 + 1, loaded_at))
            .collect::<Vec<_>>();
        tracing::info!(path = %path.display(), rows = records.len(), "loaded content csv");
        Ok(Self {
            records,
            origin: format!("csv:{}", path.display()),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ContentStore for MemoryStore {
    fn list_content(&self, query: &ContentQuery) -> AppResult<Vec<ContentRecord>> {
        Ok(query.apply(&self.records))
    }

    fn content_stats(&self) -> AppResult<ContentStats> {
        metrics::aggregate(&self.records)
    }

    fn filter_options(&self) -> AppResult<FilterOptions> {
        Ok(metrics::filter_options(&self.records))
    }

    fn describe(&self) -> String {
        self.origin.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentStore, MemoryStore};
    use crate::errors::AppError;
    use crate::query::ContentQuery;
    use std::io::Write;

    #[test]
    fn csv_store_serves_queries_and_stats() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "Category,URL,Source,Time Spent (minutes),Upvotes,Views,Engagement Score,Content Type,Difficulty Level,Trending Score"
        )
        .expect("header");
        writeln!(file, "Sustainable Fashion,https://a.example,Instagram,3.0,12,300,0.8,Video,Beginner,0.6").expect("row");
        writeln!(file, "Streetwear,https://b.example,TikTok,5.0,30,900,0.9,Video,Advanced,0.2").expect("row");
        file.flush().expect("flush");

        let store = MemoryStore::from_csv(file.path()).expect("store");
        assert_eq!(store.len(), 2);
        assert!(store.describe().starts_with("csv:"));

        let ranked = store.list_content(&ContentQuery::default()).expect("list");
        assert_eq!(ranked[0].url, "https://b.example");
        assert_eq!(ranked[1].id, 1);

        let stats = store.content_stats().expect("stats");
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_views, 1_200);
        assert_eq!(stats.sources, vec!["Instagram", "TikTok"]);
    }

    #[test]
    fn missing_csv_is_reported_as_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = MemoryStore::from_csv(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[test]
    fn empty_store_returns_empty_results() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
        assert!(store.list_content(&ContentQuery::default()).expect("list").is_empty());
        assert_eq!(store.content_stats().expect("stats").total_records, 0);
    }
}
