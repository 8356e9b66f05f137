use std::path::Path;

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    tracing::{info, warn},
};

use crate::{
    callback_server::{CALLBACK_TIMEOUT, CallbackServer},
    error::{Error, Result},
    flow::{OAuthFlow, refresh_tokens},
    storage::TokenStore,
    types::{ClientSecret, OAuthTokens},
};

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, secret: &ClientSecret, refresh_token: &str) -> Result<OAuthTokens>;
}

/// Runs an interactive authorization and returns fresh tokens.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<OAuthTokens>;
}

/// Refresh over HTTP against the client's `token_uri`.
#[derive(Default)]
pub struct HttpRefresher {
    client: reqwest::Client,
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self, secret: &ClientSecret, refresh_token: &str) -> Result<OAuthTokens> {
        refresh_tokens(&self.client, secret, refresh_token).await
    }
}

/// Loopback PKCE flow: open the browser, wait for the redirect, exchange the code.
#[derive(Default)]
pub struct BrowserAuthorizer;

#[async_trait]
impl Authorizer for BrowserAuthorizer {
    async fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<OAuthTokens> {
        let server = CallbackServer::bind().await?;
        let flow = OAuthFlow::new(secret.clone(), server.redirect_uri()?, scopes.to_vec());
        let req = flow.start()?;

        eprintln!("Opening your browser to authorize corphish:\n  {}", req.url);
        if let Err(e) = open::that(&req.url) {
            warn!(error = %e, "could not open browser, visit the URL manually");
        }

        let code = server.wait_for_code(req.state, CALLBACK_TIMEOUT).await?;
        flow.exchange(&code, &req.pkce.verifier).await
    }
}

/// Returns valid credentials, refreshing or re-authorizing as needed.
pub struct CredentialStore {
    scopes: Vec<String>,
    refresher: Box<dyn TokenRefresher>,
    authorizer: Box<dyn Authorizer>,
}

impl CredentialStore {
    pub fn new(scopes: &[&str]) -> Self {
        Self::with_collaborators(
            scopes,
            Box::new(HttpRefresher::default()),
            Box::new(BrowserAuthorizer),
        )
    }

    pub fn with_collaborators(
        scopes: &[&str],
        refresher: Box<dyn TokenRefresher>,
        authorizer: Box<dyn Authorizer>,
    ) -> Self {
        Self {
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            refresher,
            authorizer,
        }
    }

    /// Load cached credentials from `token_path` if still valid; refresh them
    /// if expired and a refresh token exists; otherwise authorize
    /// interactively. New tokens overwrite `token_path`.
    ///
    /// Fails with [`Error::MissingSecret`] when `client_secret_path` is absent.
    pub async fn get(&self, client_secret_path: &Path, token_path: &Path) -> Result<OAuthTokens> {
        if !client_secret_path.exists() {
            return Err(Error::MissingSecret {
                path: client_secret_path.to_path_buf(),
            });
        }
        let secret = ClientSecret::from_file(client_secret_path)?;
        let store = TokenStore::with_path(token_path.to_path_buf());

        let cached = store.load();

        if let Some(tokens) = &cached
            && tokens.is_valid()
        {
            return Ok(tokens.clone());
        }

        if let Some(tokens) = cached
            && tokens.has_refresh_token()
            && let Some(refresh_token) = &tokens.refresh_token
        {
            info!(path = %token_path.display(), "access token expired, refreshing");
            let mut refreshed = self
                .refresher
                .refresh(&secret, refresh_token.expose_secret())
                .await?;
            // Refresh responses usually omit the refresh token; keep ours.
            if refreshed.refresh_token.is_none() {
                refreshed.refresh_token = tokens.refresh_token.clone();
            }
            if refreshed.scopes.is_empty() {
                refreshed.scopes = tokens.scopes.clone();
            }
            store.save(&refreshed)?;
            return Ok(refreshed);
        }

        info!("no usable token, starting browser authorization");
        let tokens = self.authorizer.authorize(&secret, &self.scopes).await?;
        store.save(&tokens)?;
        Ok(tokens)
    }
}
