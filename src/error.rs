/// Error types for storage, auth, and backend API calls

use thiserror::Error;

/// Extension-local storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Backend(String),

    #[error("corrupt storage entry: {0}")]
    Decode(String),
}

/// Auth provider failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx from the provider, message extracted from the response body.
    #[error("{message}")]
    Provider { status: u16, message: String },
}

/// Backend API failures.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx from the backend; `detail` comes from the response body when
    /// the backend provides one.
    #[error("backend error ({status}): {detail}")]
    Backend { status: u16, detail: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid payload: {0}")]
    Encode(#[from] serde_json::Error),
}
