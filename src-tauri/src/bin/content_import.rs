use anyhow::Context;
use clap::Parser;
use fashion_insights_lib::import::load_csv_into_database;
use fashion_insights_lib::init_stderr_tracing;
use fashion_insights_lib::settings::{ENV_DATA_PATH, ENV_LOG};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "content-import",
    version,
    about = "Replace the SQLite content mirror with the rows of a content CSV"
)]
struct Args {
    /// Content CSV to load
    csv: PathBuf,

    /// SQLite mirror to replace
    #[arg(env = ENV_DATA_PATH, default_value = "content.db")]
    db: PathBuf,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, env = ENV_LOG, default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_stderr_tracing(&args.log).map_err(anyhow::Error::msg)?;

    let inserted = load_csv_into_database(&args.csv, &args.db).with_context(|| {
        format!("failed to import {} into {}", args.csv.display(), args.db.display())
    })?;
    tracing::info!(rows = inserted, db = %args.db.display(), "content import finished");
    Ok(())
}
