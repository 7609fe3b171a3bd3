//! Typed errors for the coordinator façade, partitioned the way §7 of the
//! spec partitions failures: transient I/O gets a distinct variant so callers
//! can retry, a claim rejection gets its own variant so the claim engine
//! never has to parse a response body to recognize a lost race (§9 open
//! question).

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The coordinator's claim hook rejected a conditional update. Per §9,
    /// any non-2xx response to a claim attempt is treated as a race and the
    /// body is never inspected.
    #[error("claim rejected (lost race on the lease)")]
    ClaimRejected,

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    /// Transient failure (network error, 5xx, rate limit) worth retrying.
    #[error("transient coordinator error: {0}")]
    Transient(String),

    /// A non-2xx, non-claim, non-auth response the caller should treat as
    /// fatal for this request.
    #[error("coordinator returned {status}: {body}")]
    Unexpected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Transient errors (and, conservatively, `Unexpected` 5xx) are worth a
    /// bounded retry; everything else should surface immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            Error::Unexpected { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}
