use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no config directory (could not resolve the home directory)")]
    NoConfigDirectory,

    /// A required environment value is absent or empty.
    #[error("{name} environment variable is not set.\n{hint}")]
    MissingEnv {
        name: &'static str,
        hint: &'static str,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Whether this error is a configuration problem the user must fix by hand.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingEnv { .. } | Self::NoConfigDirectory | Self::Parse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
