use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Tokens expiring within this many seconds are treated as already expired.
pub const EXPIRY_SKEW_SECS: u64 = 60;

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration, as downloaded from the Google Cloud Console.
#[derive(Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: Secret<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.into()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.into()
}

/// The downloaded JSON wraps the registration in `installed` (desktop apps)
/// or `web`.
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingSecret {
                    path: path.to_path_buf(),
                });
            },
            Err(e) => return Err(e.into()),
        };
        Self::from_json(&raw).map_err(|reason| Error::InvalidSecret {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_json(raw: &str) -> std::result::Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client".to_string())
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Cached OAuth credentials, persisted whole to the token file.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<Secret<String>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Unix timestamp when the access token expires. `None` never expires.
    pub expires_at: Option<u64>,
}

impl OAuthTokens {
    /// Usable right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_secs())
    }

    #[must_use]
    pub fn is_valid_at(&self, now: u64) -> bool {
        !self.access_token.expose_secret().is_empty() && !self.is_expired_at(now)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at
            .is_some_and(|exp| now.saturating_add(EXPIRY_SKEW_SECS) >= exp)
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }
}

impl std::fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// PKCE challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

/// Serialize a `Secret<String>` by exposing its inner value.
/// Only for fields that must round-trip through the token file.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

pub fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
