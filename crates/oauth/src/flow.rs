use {
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
    url::Url,
};

use crate::{
    error::{Error, Result},
    pkce::{generate_pkce, generate_state},
    types::{ClientSecret, OAuthTokens, PkceChallenge, now_secs},
};

/// Authorization code flow with PKCE against the client's token endpoint.
pub struct OAuthFlow {
    secret: ClientSecret,
    redirect_uri: String,
    scopes: Vec<String>,
    client: reqwest::Client,
}

/// Result of starting the OAuth flow.
pub struct AuthorizationRequest {
    pub url: String,
    pub pkce: PkceChallenge,
    pub state: String,
}

impl OAuthFlow {
    pub fn new(secret: ClientSecret, redirect_uri: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            secret,
            redirect_uri: redirect_uri.into(),
            scopes,
            client: reqwest::Client::new(),
        }
    }

    /// Build the authorization URL and generate PKCE + state.
    pub fn start(&self) -> Result<AuthorizationRequest> {
        let pkce = generate_pkce();
        let state = generate_state();

        let mut url = Url::parse(&self.secret.auth_uri)
            .map_err(|source| Error::external("invalid auth_uri", source))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.secret.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &state)
            // Google only returns a refresh token for offline access.
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        if !self.scopes.is_empty() {
            url.query_pairs_mut()
                .append_pair("scope", &self.scopes.join(" "));
        }

        Ok(AuthorizationRequest {
            url: url.to_string(),
            pkce,
            state,
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<OAuthTokens> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.expose_secret()),
            ("code_verifier", verifier),
        ];
        let mut tokens = request_tokens(&self.client, &self.secret.token_uri, &form).await?;
        if tokens.scopes.is_empty() {
            tokens.scopes = self.scopes.clone();
        }
        Ok(tokens)
    }

    /// Refresh an access token using a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        refresh_tokens(&self.client, &self.secret, refresh_token).await
    }
}

pub(crate) async fn refresh_tokens(
    client: &reqwest::Client,
    secret: &ClientSecret,
    refresh_token: &str,
) -> Result<OAuthTokens> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", secret.client_id.as_str()),
        ("client_secret", secret.client_secret.expose_secret()),
    ];
    request_tokens(client, &secret.token_uri, &form).await
}

async fn request_tokens(
    client: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<OAuthTokens> {
    debug!(token_uri, grant_type = ?form.first().map(|(_, v)| *v), "requesting OAuth tokens");
    let resp = client
        .post(token_uri)
        .form(form)
        .send()
        .await?
        .error_for_status()?
        .json::<serde_json::Value>()
        .await?;
    parse_token_response(&resp, now_secs())
}

fn parse_token_response(resp: &serde_json::Value, now: u64) -> Result<OAuthTokens> {
    let access_token = resp["access_token"]
        .as_str()
        .ok_or_else(|| Error::message("missing access_token in response"))?
        .to_string();

    let refresh_token = resp["refresh_token"].as_str().map(|s| Secret::new(s.to_string()));
    let scopes = resp["scope"]
        .as_str()
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let expires_at = resp["expires_in"].as_u64().map(|secs| now + secs);

    Ok(OAuthTokens {
        access_token: Secret::new(access_token),
        refresh_token,
        scopes,
        expires_at,
    })
}
