use thiserror::Error;

/// Failures that terminate an extraction run.
///
/// There is no per-chunk recovery: any of these aborts the remaining
/// chunks and the run surfaces a degraded result (see `processor`).
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("script is empty")]
    EmptyScript,

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("extraction canceled")]
    Canceled,
}
