pub mod dashboard;
pub mod db;
pub mod errors;
pub mod import;
pub mod metrics;
pub mod models;
pub mod query;
pub mod settings;
pub mod store;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

#[cfg(feature = "desktop")]
use crate::dashboard::DashboardCore;
#[cfg(feature = "desktop")]
use crate::errors::AppError;
#[cfg(feature = "desktop")]
use crate::models::{ContentRecord, ContentStats, FetchContentParams, FilterOptions};
#[cfg(feature = "desktop")]
use crate::settings::DashboardSettings;
#[cfg(feature = "desktop")]
use std::sync::Arc;
#[cfg(feature = "desktop")]
use tauri::Manager;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[cfg(feature = "desktop")]
#[derive(Clone)]
struct AppState {
    dashboard: Arc<DashboardCore>,
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn fetch_content(
    state: tauri::State<'_, AppState>,
    params: FetchContentParams,
) -> Result<Vec<ContentRecord>, String> {
    state.dashboard.fetch_content(params).map_err(to_client_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn fetch_stats(state: tauri::State<'_, AppState>) -> Result<ContentStats, String> {
    state.dashboard.fetch_stats().map_err(to_client_error)
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn fetch_filter_options(state: tauri::State<'_, AppState>) -> Result<FilterOptions, String> {
    state
        .dashboard
        .fetch_filter_options()
        .map_err(to_client_error)
}

#[cfg(feature = "desktop")]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            let settings = DashboardSettings::load(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir.join("logs"), &settings.log_filter)?;

            tracing::info!(
                store = settings.store.as_str(),
                path = %settings.data_path.display(),
                "dashboard starting"
            );

            app.manage(AppState {
                dashboard: Arc::new(DashboardCore::new(settings)),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            fetch_content,
            fetch_stats,
            fetch_filter_options
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

/// JSON logs to a daily rolling file under `log_dir`. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(log_dir: &Path, default_filter: &str) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

pub fn init_stderr_tracing(default_filter: &str) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| error.to_string())
}

fn env_filter(default_filter: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter))
}

#[cfg(feature = "desktop")]
fn to_client_error(error: AppError) -> String {
    if !error.is_client_error() {
        tracing::error!(error = %error, "dashboard request failed");
    }
    error.to_string()
}
