#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("Database error")]
    Database(#[from] sqlx::error::Error),

    #[error("HTTP error")]
    Http(#[from] reqwest::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("Invalid selector `{0}`")]
    Selector(String),

    #[error("No element matches `{0}`")]
    ElementNotFound(String),

    #[error("{url} still empty after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    #[error("{url} has more than {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },

    #[error("Malformed credentials: {0}")]
    Credentials(String),

    #[error("Row {index} has {width} values, expected {expected}")]
    RowWidth {
        index: usize,
        width: usize,
        expected: usize,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[cfg(feature = "browser")]
    #[error("Browser protocol error")]
    Cdp(#[from] chromiumoxide::error::CdpError),
}
