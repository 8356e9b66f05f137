use std::path::PathBuf;

fn corphish_config_dir() -> PathBuf {
    corphish_config::config_dir().unwrap_or_else(|| PathBuf::from(".config/corphish"))
}

/// `<config_dir>/client_secret.json`, downloaded from the Google Cloud Console.
pub fn default_client_secret_path() -> PathBuf {
    corphish_config_dir().join("client_secret.json")
}

/// `<config_dir>/google_token.json`, written after every authorization or refresh.
pub fn default_token_path() -> PathBuf {
    corphish_config_dir().join("google_token.json")
}
