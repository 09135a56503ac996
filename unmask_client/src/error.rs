use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnmaskError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),

    #[error("remote inference failed: {0}")]
    Remote(String),

    #[error("invalid space reference {0:?}: expected owner/name or an http(s) URL")]
    InvalidSpace(String),
}
