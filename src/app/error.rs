use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdlogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No title could be extracted from {0}")]
    UnparseableContent(String),

    #[error("Not an image (content type: {})", .0.as_deref().unwrap_or("none"))]
    NotAnImage(Option<String>),

    #[error("Image exceeds {limit} bytes")]
    ImageTooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listing not found: {0}")]
    ListingNotFound(i64),

    #[error("{failed} of {total} URLs failed to ingest")]
    BatchFailed { failed: usize, total: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdlogError {
    /// Whether this is one of the failures `ingest` reports to its caller.
    pub fn is_caller_visible_ingest_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidUrl(_)
                | Self::Fetch(_)
                | Self::HttpStatus { .. }
                | Self::UnparseableContent(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ListingNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, AdlogError>;
