use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of fashion-content engagement data as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: i64,
    pub category: String,
    pub url: String,
    pub source: String,
    pub time_spent_minutes: f64,
    pub upvotes: i64,
    pub views: i64,
    pub engagement_score: f64,
    pub content_type: String,
    pub difficulty_level: String,
    pub trending_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated row from the bulk load, before the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContentRecord {
    pub category: String,
    pub url: String,
    pub source: String,
    pub time_spent_minutes: f64,
    pub upvotes: i64,
    pub views: i64,
    pub engagement_score: f64,
    pub content_type: String,
    pub difficulty_level: String,
    pub trending_score: f64,
}

impl NewContentRecord {
    pub fn into_record(self, id: i64, loaded_at: DateTime<Utc>) -> ContentRecord {
        ContentRecord {
            id,
            category: self.category,
            url: self.url,
            source: self.source,
            time_spent_minutes: self.time_spent_minutes,
            upvotes: self.upvotes,
            views: self.views,
            engagement_score: self.engagement_score,
            content_type: self.content_type,
            difficulty_level: self.difficulty_level,
            trending_score: self.trending_score,
            created_at: loaded_at,
            updated_at: loaded_at,
        }
    }
}

/// Raw parameters of the fetch-content endpoint.
///
/// `limit` and `offset` stay untyped so malformed values surface as a
/// validation error instead of being coerced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchContentParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub content_type: Option<String>,
    pub difficulty_level: Option<String>,
    pub limit: Option<serde_json::Value>,
    pub offset: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub total_records: i64,
    pub avg_time_spent_minutes: f64,
    pub total_upvotes: i64,
    pub total_views: i64,
    pub avg_engagement_score: f64,
    pub avg_trending_score: f64,
    pub categories: Vec<String>,
    pub sources: Vec<String>,
}

/// Distinct values for each filterable field, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub sources: Vec<String>,
    pub content_types: Vec<String>,
    pub difficulty_levels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{FetchContentParams, NewContentRecord};
    use chrono::Utc;

    #[test]
    fn fetch_params_accept_camel_case_and_raw_page_values() {
        let params: FetchContentParams = serde_json::from_value(serde_json::json!({
            "search": "denim",
            "contentType": "Video",
            "difficultyLevel": "All",
            "limit": "10",
            "offset": 5
        }))
        .expect("params");
        assert_eq!(params.search.as_deref(), Some("denim"));
        assert_eq!(params.content_type.as_deref(), Some("Video"));
        assert_eq!(params.limit, Some(serde_json::json!("10")));
        assert_eq!(params.offset, Some(serde_json::json!(5)));
        assert!(params.category.is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let now = Utc::now();
        let record = NewContentRecord {
            category: "Streetwear".to_string(),
            url: "https://example.com/a".to_string(),
            source: "TikTok".to_string(),
            time_spent_minutes: 3.5,
            upvotes: 10,
            views: 200,
            engagement_score: 0.4,
            content_type: "Video".to_string(),
            difficulty_level: "Beginner".to_string(),
            trending_score: 0.7,
        }
        .into_record(1, now);

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["timeSpentMinutes"], serde_json::json!(3.5));
        assert_eq!(value["engagementScore"], serde_json::json!(0.4));
        assert_eq!(value["difficultyLevel"], serde_json::json!("Beginner"));
        assert_eq!(record.created_at, record.updated_at);
    }
}
