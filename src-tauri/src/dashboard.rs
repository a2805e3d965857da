use crate::db::Database;
use crate::errors::AppResult;
use crate::models::{ContentRecord, ContentStats, FetchContentParams, FilterOptions};
use crate::query::ContentQuery;
use crate::settings::{DashboardSettings, StoreKind};
use crate::store::{ContentStore, MemoryStore};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Serves the dashboard's read endpoints from one lazily opened store.
pub struct DashboardCore {
    settings: DashboardSettings,
    store: OnceCell<Arc<dyn ContentStore>>,
}

impl DashboardCore {
    pub fn new(settings: DashboardSettings) -> Self {
        Self {
            settings,
            store: OnceCell::new(),
        }
    }

    pub fn with_store(settings: DashboardSettings, store: Arc<dyn ContentStore>) -> Self {
        Self {
            settings,
            store: OnceCell::with_value(store),
        }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    // A failed open is not cached; the next request tries again.
    fn store(&self) -> AppResult<&Arc<dyn ContentStore>> {
        self.store.get_or_try_init(|| {
            open_store(&self.settings).inspect_err(|error| {
                tracing::warn!(
                    store = self.settings.store.as_str(),
                    path = %self.settings.data_path.display(),
                    error = %error,
                    "content store unavailable"
                );
            })
        })
    }

    pub fn fetch_content(&self, params: FetchContentParams) -> AppResult<Vec<ContentRecord>> {
        let query = ContentQuery::from_params(&params)?;
        let records = self.store()?.list_content(&query)?;
        tracing::debug!(
            search = ?query.search,
            category = ?query.category,
            source = ?query.source,
            limit = ?query.limit,
            returned = records.len(),
            "fetched content"
        );
        Ok(records)
    }

    pub fn fetch_stats(&self) -> AppResult<ContentStats> {
        self.store()?.content_stats()
    }

    pub fn fetch_filter_options(&self) -> AppResult<FilterOptions> {
        self.store()?.filter_options()
    }
}

pub fn open_store(settings: &DashboardSettings) -> AppResult<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match settings.store {
        StoreKind::Sqlite => Arc::new(Database::open_read_only(&settings.data_path)?),
        StoreKind::Csv => Arc::new(MemoryStore::from_csv(&settings.data_path)?),
    };
    tracing::info!(store = %store.describe(), "opened content store");
    Ok(store)
}
