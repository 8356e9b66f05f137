use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared by every transport.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Outbound text was empty or whitespace only.
    #[error("message text must not be empty")]
    EmptyText,

    /// Outbound endpoint (chat id, space name) was empty.
    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    /// Endpoint is not in the transport's format.
    #[error("invalid endpoint for {channel}: {endpoint}")]
    InvalidEndpoint {
        channel: &'static str,
        endpoint: String,
    },

    /// The transport cannot perform this operation at all.
    #[error("{channel} does not support {operation}")]
    Unsupported {
        channel: &'static str,
        operation: &'static str,
    },

    /// Wrapped source error from the underlying transport.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Rejected at the call boundary, before any transport call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyText | Self::EmptyEndpoint | Self::InvalidEndpoint { .. }
        )
    }
}
