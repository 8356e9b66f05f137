use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    config_dir::default_token_path,
    error::Result,
    types::OAuthTokens,
};

/// Single-file token cache. Saves overwrite the whole file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            path: default_token_path(),
        }
    }

    /// Create a token store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads cached tokens. Missing or unreadable files read as `None`.
    pub fn load(&self) -> Option<OAuthTokens> {
        let path = self.path.display().to_string();
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "token file not found");
                return None;
            },
            Err(e) => {
                warn!(path = %path, error = %e, "token file read failed");
                return None;
            },
        };

        match serde_json::from_str(&data) {
            Ok(tokens) => {
                debug!(path = %path, "OAuth tokens loaded");
                Some(tokens)
            },
            Err(e) => {
                warn!(path = %path, error = %e, "token file parse failed");
                None
            },
        }
    }

    pub fn save(&self, tokens: &OAuthTokens) -> Result<()> {
        let path = self.path.display().to_string();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&self.path, &data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path, "OAuth tokens saved");
        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
