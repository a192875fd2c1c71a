//! Invocation response shared by both functions
//!
//! Both Lambdas answer with `{"statusCode": 200|500, "body": "..."}` and nothing
//! else; partial progress is only visible through the body text.

use serde::{Deserialize, Serialize};

pub const STATUS_OK: u16 = 200;
pub const STATUS_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn success(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_OK,
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_ERROR,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}
