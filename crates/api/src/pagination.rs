use serde::{Deserialize, Serialize};

/// Offset-paged envelope used by Jira list endpoints.
///
/// Most endpoints name the item array `values`; the comment listing calls it
/// `comments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    #[serde(alias = "comments", default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(rename = "startAt")]
    pub start_at: Option<u32>,
    #[serde(rename = "maxResults")]
    pub max_results: Option<u32>,
    pub total: Option<u32>,
    #[serde(rename = "isLast")]
    pub is_last: Option<bool>,
}

impl<T> PagedResponse<T> {
    pub fn has_next(&self) -> bool {
        if let Some(is_last) = self.is_last {
            return !is_last;
        }

        if let (Some(start), Some(max), Some(total)) = (self.start_at, self.max_results, self.total)
        {
            return start.saturating_add(max) < total;
        }

        false
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// Builds `startAt`/`maxResults` query parameters for a paged endpoint.
pub fn page_query(path: &str, start_at: u32, max_results: u32) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}startAt={start_at}&maxResults={max_results}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_last_wins() {
        let page: PagedResponse<String> = serde_json::from_value(json!({
            "values": ["A"],
            "startAt": 0,
            "maxResults": 1,
            "total": 10,
            "isLast": true
        }))
        .unwrap();
        assert!(!page.has_next());
    }

    #[test]
    fn test_totals_drive_has_next() {
        let page: PagedResponse<String> = serde_json::from_value(json!({
            "values": ["A", "B"],
            "startAt": 0,
            "maxResults": 2,
            "total": 5
        }))
        .unwrap();
        assert!(page.has_next());
    }

    #[test]
    fn test_out_of_range_offsets_do_not_overflow() {
        let page: PagedResponse<String> = serde_json::from_value(json!({
            "values": [],
            "startAt": u32::MAX,
            "maxResults": 50,
            "total": 1
        }))
        .unwrap();
        assert!(!page.has_next());
        assert!(page.into_values().is_empty());
    }

    #[test]
    fn test_comments_alias() {
        let page: PagedResponse<u32> = serde_json::from_value(json!({
            "comments": [1, 2, 3],
            "startAt": 0,
            "maxResults": 50,
            "total": 3
        }))
        .unwrap();
        assert_eq!(page.into_values(), vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_values_default_to_empty() {
        let page: PagedResponse<u32> = serde_json::from_value(json!({"total": 0})).unwrap();
        assert!(page.values.is_empty());
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_query_separator() {
        assert_eq!(
            page_query("/rest/api/3/project/search", 0, 50),
            "/rest/api/3/project/search?startAt=0&maxResults=50"
        );
        assert_eq!(
            page_query("/rest/api/3/user/assignable/search?project=OPS", 0, 100),
            "/rest/api/3/user/assignable/search?project=OPS&startAt=0&maxResults=100"
        );
    }
}
