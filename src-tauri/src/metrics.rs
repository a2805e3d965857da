use crate::errors::{AppError, AppResult};
use crate::models::{ContentRecord, ContentStats, FilterOptions};
use std::collections::BTreeSet;

/// Summary statistics over the full, unfiltered record set.
///
/// An empty set yields zero-valued aggregates rather than NaN averages.
/// Totals that do not fit in an `i64` are an error, matching SQLite's `SUM`.
pub fn aggregate(records: &[ContentRecord]) -> AppResult<ContentStats> {
    let mut stats = ContentStats {
        total_records: records.len() as i64,
        categories: distinct(records, |record| &record.category),
        sources: distinct(records, |record| &record.source),
        ..ContentStats::default()
    };
    if records.is_empty() {
        return Ok(stats);
    }

    let mut time_spent = 0.0;
    let mut engagement = 0.0;
    let mut trending = 0.0;
    for record in records {
        time_spent += record.time_spent_minutes;
        engagement += record.engagement_score;
        trending += record.trending_score;
        stats.total_upvotes = checked_total("upvotes", stats.total_upvotes, record.upvotes)?;
        stats.total_views = checked_total("views", stats.total_views, record.views)?;
    }

    let count = records.len() as f64;
    stats.avg_time_spent_minutes = time_spent / count;
    stats.avg_engagement_score = engagement / count;
    stats.avg_trending_score = trending / count;
    Ok(stats)
}

fn checked_total(field: &str, total: i64, value: i64) -> AppResult<i64> {
    total
        .checked_add(value)
        .ok_or_else(|| AppError::Internal(format!("total {} overflows a 64-bit integer", field)))
}

pub fn filter_options(records: &[ContentRecord]) -> FilterOptions {
    FilterOptions {
        categories: distinct(records, |record| &record.category),
        sources: distinct(records, |record| &record.source),
        content_types: distinct(records, |record| &record.content_type),
        difficulty_levels: distinct(records, |record| &record.difficulty_level),
    }
}

fn distinct<F>(records: &[ContentRecord], field: F) -> Vec<String>
where
    F: Fn(&ContentRecord) -> &String,
{
    records
        .iter()
        .map(field)
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}
