use serde::{Deserialize, Serialize};

/// JSON envelope for failed API calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    success: bool,
    message: String,
}

impl ApiResponse {
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }
}
