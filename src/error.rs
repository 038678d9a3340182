//! Error types shared by all marketplace adapters.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any network call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The marketplace answered with a non-success HTTP status.
    #[error("request failed with status {status}")]
    Transport { status: u16 },

    /// The response body did not have the expected shape.
    #[error("malformed response: field `{field}`")]
    MalformedResponse { field: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
