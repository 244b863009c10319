use thiserror::Error;

pub type LeagueResult<T> = Result<T, LeagueError>;

/// Failures surfaced by the league core.
///
/// Missing teams during enrichment are not errors; they resolve to
/// placeholder display data instead.
#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("Not found: {0}")]
    NotFound(String),
    /// Rejected before any store write.
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Write conflict on {0}")]
    Conflict(String),
    #[error("Network error for {url}: {source}")]
    Network {
        source: reqwest::Error,
        url: String,
    },
    #[error("Store error for {url}: {source}")]
    Api {
        source: reqwest::Error,
        url: String,
    },
    #[error("Parse error for {url}: {source}")]
    Parsing {
        source: reqwest::Error,
        url: String,
    },
    #[error("Malformed document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeagueError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
