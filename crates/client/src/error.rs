/// Errors from the Immich client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status} on {endpoint}: {message}")]
    Api {
        status: u16,
        message: String,
        endpoint: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid API key")]
    InvalidKey,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// HTTP status of an API error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Builds an `Api` error from a non-success response body.
    ///
    /// The server reports failures as `{"message": ..., "error": ...}` where
    /// `message` may be a string or a list of validation messages.
    pub(crate) fn from_response(status: u16, endpoint: &str, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| message_field(&v, "message").or_else(|| message_field(&v, "error")))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.trim().to_string()
                }
            });
        Self::Api {
            status,
            message,
            endpoint: endpoint.to_string(),
        }
    }
}

fn message_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .map(|i| i.as_str().map_or_else(|| i.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}
