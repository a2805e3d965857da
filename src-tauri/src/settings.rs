use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";
pub const ENV_STORE: &str = "FASHION_INSIGHTS_STORE";
pub const ENV_DATA_PATH: &str = "FASHION_INSIGHTS_DATA_PATH";
pub const ENV_LOG: &str = "FASHION_INSIGHTS_LOG";

/// Backing store kind. `settings.json` and the environment share one parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum StoreKind {
    Sqlite,
    Csv,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Csv => "csv",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

impl TryFrom<String> for StoreKind {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("store must be 'sqlite' or 'csv', got '{}'", raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub store: StoreKind,
    /// Relative paths resolve against the app data directory.
    pub data_path: PathBuf,
    pub log_filter: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            store: StoreKind::Sqlite,
            data_path: PathBuf::from("content.db"),
            log_filter: "info".to_string(),
        }
    }
}

impl DashboardSettings {
    /// Defaults, overlaid by `settings.json` in `app_data_dir`, overlaid by the environment.
    pub fn load(app_data_dir: &Path) -> AppResult<Self> {
        let file_path = app_data_dir.join(SETTINGS_FILE);
        let file_value = if file_path.is_file() {
            let raw = fs::read_to_string(&file_path)?;
            let value = serde_json::from_str::<serde_json::Value>(&raw).map_err(|error| {
                AppError::Validation(format!("{} is not valid JSON: {}", file_path.display(), error))
            })?;
            Some(value)
        } else {
            None
        };

        let settings = Self::from_sources(file_value, |key| std::env::var(key).ok())?;
        Ok(settings.resolve_paths(app_data_dir))
    }

    pub fn from_sources<F>(file_value: Option<serde_json::Value>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = serde_json::to_value(Self::default())?;
        if let Some(update) = file_value {
            merge_json(&mut merged, update);
        }
        let mut settings: Self = serde_json::from_value(merged)
            .map_err(|error| AppError::Validation(format!("invalid dashboard settings: {}", error)))?;

        if let Some(raw) = env(ENV_STORE).filter(|value| !value.trim().is_empty()) {
            settings.store = StoreKind::parse(&raw).ok_or_else(|| {
                AppError::Validation(format!("{} must be 'sqlite' or 'csv', got '{}'", ENV_STORE, raw))
            })?;
        }
        if let Some(raw) = env(ENV_DATA_PATH).filter(|value| !value.trim().is_empty()) {
            settings.data_path = PathBuf::from(raw.trim());
        }
        if let Some(raw) = env(ENV_LOG).filter(|value| !value.trim().is_empty()) {
            settings.log_filter = raw.trim().to_string();
        }
        Ok(settings)
    }

    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        if self.data_path.is_relative() {
            self.data_path = base_dir.join(&self.data_path);
        }
        self
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
