use {
    anyhow::Result,
    clap::Subcommand,
    corphish_oauth::{
        CredentialStore, GOOGLE_CHAT_SCOPES, OAuthTokens, TokenStore, default_client_secret_path,
        default_token_path,
    },
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Authorize the Google account used for Google Chat.
    Login,
    /// Show whether cached Google credentials exist and are usable.
    Status,
    /// Delete cached Google credentials.
    Logout,
}

pub async fn handle_auth(action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login => login().await,
        AuthAction::Status => status(),
        AuthAction::Logout => logout(),
    }
}

async fn login() -> Result<()> {
    let client_secret = default_client_secret_path();
    if !client_secret.exists() {
        anyhow::bail!(
            "client secret not found at {}. Download an OAuth desktop client from the Google Cloud console first.",
            client_secret.display()
        );
    }
    let tokens = CredentialStore::new(GOOGLE_CHAT_SCOPES)
        .get(&client_secret, &default_token_path())
        .await?;
    println!("Authorized ({})", describe(&tokens));
    Ok(())
}

fn describe(tokens: &OAuthTokens) -> String {
    let validity = if tokens.is_valid() {
        "valid"
    } else if tokens.has_refresh_token() {
        "expired, refreshable"
    } else {
        "expired"
    };
    format!("{validity}, {} scope(s)", tokens.scopes.len())
}

fn status() -> Result<()> {
    let store = TokenStore::with_path(default_token_path());
    match store.load() {
        Some(tokens) => println!("google: {} [{}]", describe(&tokens), store.path().display()),
        None => println!("google: not logged in"),
    }
    Ok(())
}

fn logout() -> Result<()> {
    TokenStore::with_path(default_token_path()).delete()?;
    println!("Logged out of google");
    Ok(())
}
