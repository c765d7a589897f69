use serde::{Deserialize, Serialize};

/// Rows returned by a table select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub table: String,
    pub rows: Vec<serde_json::Value>,
    /// Exact row count, when the service reports one.
    pub count: Option<u64>,
}

impl QueryResponse {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub function: String,
    pub status: u16,
    pub body: serde_json::Value,
}

impl FunctionResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error text reported by the function body, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(|e| {
            e.as_str()
                .or_else(|| e.get("message").and_then(|m| m.as_str()))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
