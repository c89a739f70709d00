use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

/// Body of `DELETE /api/user/urls`: a bare array or `{"short_urls": [...]}`.
/// Entries may be codes or full short URLs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DeleteRequest {
    Codes(Vec<String>),
    Wrapped { short_urls: Vec<String> },
}

impl DeleteRequest {
    /// The short codes named by the request, in order.
    pub fn into_codes(self) -> Vec<String> {
        let entries = match self {
            DeleteRequest::Codes(entries) => entries,
            DeleteRequest::Wrapped { short_urls } => short_urls,
        };
        entries
            .iter()
            .map(|entry| code_of(entry).to_string())
            .collect()
    }
}

/// Last path segment of `entry`, so `http://host/abc123` and `abc123` both
/// yield `abc123`.
fn code_of(entry: &str) -> &str {
    let entry = entry.trim().trim_end_matches('/');
    entry.rsplit('/').next().unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_request_accepts_both_shapes() {
        let bare: DeleteRequest = serde_json::from_str(r#"["abc123", "xyz789"]"#).unwrap();
        assert_eq!(bare.into_codes(), ["abc123", "xyz789"]);

        let wrapped: DeleteRequest =
            serde_json::from_str(r#"{"short_urls": ["http://localhost:8080/abc123/"]}"#).unwrap();
        assert_eq!(wrapped.into_codes(), ["abc123"]);
    }

    #[test]
    fn delete_request_rejects_other_shapes() {
        assert!(serde_json::from_str::<DeleteRequest>(r#"{"codes": ["a"]}"#).is_err());
        assert!(serde_json::from_str::<DeleteRequest>(r#""abc123""#).is_err());
    }
}
