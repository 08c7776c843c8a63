use thiserror::Error;

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors that can end a load
#[derive(Error, Debug)]
pub enum LoadError {
    /// The request completed with a non-success status, or never completed
    /// at all (`status` is `None` for transport failures).
    #[error("Failed to fetch: {message}")]
    Fetch { status: Option<u16>, message: String },

    #[error("Decompression failed: {reason}")]
    Decompression { reason: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl LoadError {
    /// Create a fetch error from a non-success HTTP status
    pub fn fetch_status<S: Into<String>>(status: u16, status_text: S) -> Self {
        Self::Fetch {
            status: Some(status),
            message: status_text.into(),
        }
    }

    /// Create a fetch error from a transport failure
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error,
    {
        Self::Fetch {
            status: None,
            message: error.to_string(),
        }
    }

    /// Create a decompression error
    pub fn decompression<S: Into<String>>(reason: S) -> Self {
        Self::Decompression {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    pub fn is_decompression(&self) -> bool {
        matches!(self, Self::Decompression { .. })
    }

    /// HTTP status carried by a fetch error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}
