pub type Result<T> = std::result::Result<T, Error>;

/// Loop failures. All of them stop the daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Channel(#[from] corphish_channels::Error),

    #[error(transparent)]
    Model(#[from] corphish_agents::Error),
}
