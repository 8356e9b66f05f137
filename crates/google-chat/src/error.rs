pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Google Chat API error HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Google Chat response is missing `{field}`")]
    MissingField { field: &'static str },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    OAuth(#[from] corphish_oauth::Error),

    #[error(transparent)]
    Channel(#[from] corphish_channels::Error),
}
