use crate::errors::{AppError, AppResult};
use crate::models::{ContentRecord, FetchContentParams};
use rusqlite::types::Value as SqlValue;

/// Filter value that disables the filter for its field.
pub const ALL_FILTER: &str = "All";

pub const CONTENT_COLUMNS: &str = "id, category, url, source, time_spent_minutes, upvotes, views, engagement_score, content_type, difficulty_level, trending_score, created_at, updated_at";

const SEARCH_COLUMNS: [&str; 4] = ["category", "source", "content_type", "difficulty_level"];

/// SQL scalar function registered on every mirror connection; applies [`fold_case`].
pub const FOLD_CASE_FN: &str = "fold_case";

/// Case folding shared by the in-memory and SQLite search paths.
///
/// SQLite's `LIKE` only folds ASCII, so both sides are folded here before comparing.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Normalized content query: search text, equality filters and pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub content_type: Option<String>,
    pub difficulty_level: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl ContentQuery {
    pub fn from_params(params: &FetchContentParams) -> AppResult<Self> {
        Ok(Self {
            search: normalize_filter(params.search.as_deref()),
            category: normalize_filter(params.category.as_deref()),
            source: normalize_filter(params.source.as_deref()),
            content_type: normalize_filter(params.content_type.as_deref()),
            difficulty_level: normalize_filter(params.difficulty_level.as_deref()),
            limit: parse_page_param("limit", params.limit.as_ref())?,
            offset: parse_page_param("offset", params.offset.as_ref())?,
        })
    }

    /// `(limit, offset)` when paginated. An offset only applies alongside a limit.
    pub fn page(&self) -> Option<(u32, u32)> {
        self.limit.map(|limit| (limit, self.offset.unwrap_or(0)))
    }

    fn equality_filters(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("category", self.category.as_deref()),
            ("source", self.source.as_deref()),
            ("content_type", self.content_type.as_deref()),
            ("difficulty_level", self.difficulty_level.as_deref()),
        ]
    }

    pub fn to_sql(&self) -> SqlQuery {
        let mut sql = format!("SELECT {} FROM content_records WHERE 1 = 1", CONTENT_COLUMNS);
        let mut params: Vec<SqlValue> = Vec::new();

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(&fold_case(search)));
            let clauses: Vec<String> = SEARCH_COLUMNS
                .iter()
                .map(|column| format!("{}({}) LIKE ? ESCAPE '\\'", FOLD_CASE_FN, column))
                .collect();
            sql.push_str(" AND (");
            sql.push_str(&clauses.join(" OR "));
            sql.push(')');
            for _ in SEARCH_COLUMNS {
                params.push(SqlValue::Text(pattern.clone()));
            }
        }

        for (column, value) in self.equality_filters() {
            if let Some(value) = value {
                sql.push_str(&format!(" AND {} = ?", column));
                params.push(SqlValue::Text(value.to_string()));
            }
        }

        sql.push_str(" ORDER BY engagement_score DESC, trending_score DESC, id ASC");

        if let Some((limit, offset)) = self.page() {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Integer(i64::from(limit)));
            params.push(SqlValue::Integer(i64::from(offset)));
        }

        SqlQuery { sql, params }
    }

    pub fn matches(&self, record: &ContentRecord) -> bool {
        let fields = [
            record.category.as_str(),
            record.source.as_str(),
            record.content_type.as_str(),
            record.difficulty_level.as_str(),
        ];

        let equality_ok = self
            .equality_filters()
            .iter()
            .zip(fields.iter())
            .all(|((_, wanted), actual)| wanted.map_or(true, |wanted| wanted == *actual));
        if !equality_ok {
            return false;
        }

        match &self.search {
            Some(search) => {
                let needle = fold_case(search);
                fields.iter().any(|field| fold_case(field).contains(&needle))
            }
            None => true,
        }
    }

    /// Filters, sorts and paginates an in-memory record set.
    pub fn apply(&self, records: &[ContentRecord]) -> Vec<ContentRecord> {
        let mut matched: Vec<ContentRecord> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();
        matched.sort_by(compare_for_ranking);

        match self.page() {
            Some((limit, offset)) => matched
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            None => matched,
        }
    }
}

pub fn compare_for_ranking(left: &ContentRecord, right: &ContentRecord) -> std::cmp::Ordering {
    right
        .engagement_score
        .total_cmp(&left.engagement_score)
        .then_with(|| right.trending_score.total_cmp(&left.trending_score))
        .then_with(|| left.id.cmp(&right.id))
}

fn normalize_filter(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value == ALL_FILTER {
        return None;
    }
    Some(value.to_string())
}

fn parse_page_param(name: &str, raw: Option<&serde_json::Value>) -> AppResult<Option<u32>> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(number)) => {
            if let Some(value) = number.as_u64() {
                return u32::try_from(value)
                    .map(Some)
                    .map_err(|_| invalid_page_param(name, number));
            }
            match number.as_f64() {
                Some(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) => {
                    Ok(Some(value as u32))
                }
                _ => Err(invalid_page_param(name, number)),
            }
        }
        Some(serde_json::Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
                return Err(invalid_page_param(name, trimmed));
            }
            trimmed
                .parse::<u32>()
                .map(Some)
                .map_err(|_| invalid_page_param(name, trimmed))
        }
        Some(other) => Err(invalid_page_param(name, other)),
    }
}

fn invalid_page_param(name: &str, shown: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("{} must be a non-negative integer, got '{}'", name, shown))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, ContentQuery};
    use crate::errors::AppError;
    use crate::models::{ContentRecord, FetchContentParams};
    use chrono::Utc;
    use rusqlite::types::Value as SqlValue;

    fn record(id: i64, category: &str, source: &str, engagement: f64, trending: f64) -> ContentRecord {
        let now = Utc::now();
        ContentRecord {
            id,
            category: category.to_string(),
            url: format!("https://example.com/{}", id),
            source: source.to_string(),
            time_spent_minutes: 4.0,
            upvotes: 10,
            views: 100,
            engagement_score: engagement,
            content_type: if id % 2 == 0 { "Video" } else { "Article" }.to_string(),
            difficulty_level: if id % 3 == 0 { "Advanced" } else { "Beginner" }.to_string(),
            trending_score: trending,
            created_at: now,
            updated_at: now,
        }
    }

    fn fixture() -> Vec<ContentRecord> {
        vec![
            record(1, "Sustainable Fashion", "Instagram", 0.50, 0.20),
            record(2, "Streetwear", "TikTok", 0.90, 0.10),
            record(3, "Fashion History", "Substack", 0.50, 0.80),
            record(4, "Beauty", "Instagram", 0.30, 0.30),
            record(5, "Streetwear", "Instagram", 0.90, 0.40),
            record(6, "Accessories", "TikTok", 0.10, 0.90),
        ]
    }

    fn params(json: serde_json::Value) -> FetchContentParams {
        serde_json::from_value(json).expect("params")
    }

    #[test]
    fn source_filter_and_search_select_single_record() {
        let records = vec![
            record(1, "Sustainable Fashion", "Instagram", 0.5, 0.5),
            record(2, "Fashion Week", "TikTok", 0.6, 0.5),
            record(3, "Beauty", "Substack", 0.7, 0.5),
        ];
        let query = ContentQuery::from_params(&params(serde_json::json!({
            "source": "Instagram",
            "search": "fashion"
        })))
        .expect("query");

        let result = query.apply(&records);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, 1);
    }

    #[test]
    fn every_returned_record_satisfies_all_filters() {
        let records = fixture();
        let categories = [None, Some("Streetwear"), Some("Beauty"), Some("All")];
        let sources = [None, Some("Instagram"), Some("TikTok")];
        let searches = [None, Some("street"), Some("INSTA"), Some("advanced"), Some("nothing-matches")];

        for category in categories {
            for source in sources {
                for search in searches {
                    let query = ContentQuery::from_params(&FetchContentParams {
                        search: search.map(ToString::to_string),
                        category: category.map(ToString::to_string),
                        source: source.map(ToString::to_string),
                        ..FetchContentParams::default()
                    })
                    .expect("query");

                    for item in query.apply(&records) {
                        if let Some(category) = category.filter(|value| *value != "All") {
                            assert_eq!(item.category, category);
                        }
                        if let Some(source) = source {
                            assert_eq!(item.source, source);
                        }
                        if let Some(search) = search {
                            let needle = search.to_lowercase();
                            assert!(
                                [&item.category, &item.source, &item.content_type, &item.difficulty_level]
                                    .iter()
                                    .any(|field| field.to_lowercase().contains(&needle)),
                                "record {} does not contain {}",
                                item.id,
                                search
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn results_are_ranked_by_engagement_then_trending() {
        let result = ContentQuery::default().apply(&fixture());
        let ids: Vec<i64> = result.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![5, 2, 3, 1, 4, 6]);
    }

    #[test]
    fn limit_and_offset_window_the_ranked_matches() {
        let records = fixture();
        let limited = ContentQuery::from_params(&params(serde_json::json!({ "limit": 2 })))
            .expect("query")
            .apply(&records);
        assert_eq!(limited.iter().map(|item| item.id).collect::<Vec<_>>(), vec![5, 2]);

        let paged = ContentQuery::from_params(&params(serde_json::json!({ "limit": "2", "offset": "2" })))
            .expect("query")
            .apply(&records);
        assert_eq!(paged.iter().map(|item| item.id).collect::<Vec<_>>(), vec![3, 1]);

        let past_end = ContentQuery::from_params(&params(serde_json::json!({ "limit": 10, "offset": 50 })))
            .expect("query")
            .apply(&records);
        assert!(past_end.is_empty());
    }

    #[test]
    fn offset_without_limit_is_ignored() {
        let query = ContentQuery::from_params(&params(serde_json::json!({ "offset": 3 }))).expect("query");
        assert_eq!(query.page(), None);
        assert_eq!(query.apply(&fixture()).len(), 6);
        assert!(!query.to_sql().sql.contains("LIMIT"));
    }

    #[test]
    fn all_and_blank_values_disable_filters() {
        let query = ContentQuery::from_params(&params(serde_json::json!({
            "category": "All",
            "source": "  ",
            "contentType": "All",
            "difficultyLevel": "",
            "search": ""
        })))
        .expect("query");
        assert_eq!(query, ContentQuery::default());
    }

    #[test]
    fn malformed_page_params_are_rejected() {
        for bad in [
            serde_json::json!("abc"),
            serde_json::json!("NaN"),
            serde_json::json!("-1"),
            serde_json::json!(-3),
            serde_json::json!(2.5),
            serde_json::json!("2.5"),
            serde_json::json!("+5"),
            serde_json::json!(true),
        ] {
            let result = ContentQuery::from_params(&FetchContentParams {
                limit: Some(bad.clone()),
                ..FetchContentParams::default()
            });
            assert!(matches!(result, Err(AppError::Validation(_))), "accepted {}", bad);
        }

        let result = ContentQuery::from_params(&FetchContentParams {
            offset: Some(serde_json::json!("ten")),
            ..FetchContentParams::default()
        });
        match result {
            Err(AppError::Validation(message)) => assert!(message.starts_with("offset")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn whole_number_floats_are_accepted() {
        let query = ContentQuery::from_params(&params(serde_json::json!({ "limit": 5.0 }))).expect("query");
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn zero_matches_is_an_empty_result() {
        let query = ContentQuery {
            category: Some("Nonexistent".to_string()),
            ..ContentQuery::default()
        };
        assert!(query.apply(&fixture()).is_empty());
    }

    #[test]
    fn sql_binds_every_value_as_a_parameter() {
        let query = ContentQuery {
            search: Some("50%_OFF".to_string()),
            source: Some("Instagram".to_string()),
            difficulty_level: Some("Beginner".to_string()),
            limit: Some(10),
            offset: Some(20),
            ..ContentQuery::default()
        };
        let built = query.to_sql();

        assert!(built.sql.contains("fold_case(category) LIKE ? ESCAPE '\\' OR fold_case(source) LIKE ?"));
        assert!(built.sql.contains(" AND source = ?"));
        assert!(built.sql.contains(" AND difficulty_level = ?"));
        assert!(!built.sql.contains("Instagram"));
        assert!(built.sql.ends_with("ORDER BY engagement_score DESC, trending_score DESC, id ASC LIMIT ? OFFSET ?"));
        assert_eq!(built.params.len(), 4 + 2 + 2);
        assert_eq!(built.params[0], SqlValue::Text("%50\\%\\_off%".to_string()));
        assert_eq!(built.params[6], SqlValue::Integer(10));
        assert_eq!(built.params[7], SqlValue::Integer(20));
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("a\\b%c_d"), "a\\\\b\\%c\\_d");
    }
}
