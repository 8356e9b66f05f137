use {
    anyhow::{Result, bail},
    clap::Subcommand,
    corphish_config::ConfigStore,
    corphish_google_chat::GoogleChatChannel,
    corphish_oauth::{default_client_secret_path, default_token_path},
    tracing::info,
};

#[derive(Subcommand)]
pub enum SpacesAction {
    /// Create a Google Chat space and remember it for `send --google-chat`.
    Create {
        #[arg(long, default_value = "Corphish")]
        display_name: String,
    },
}

pub async fn handle_spaces(action: SpacesAction) -> Result<()> {
    match action {
        SpacesAction::Create { display_name } => create(&display_name).await,
    }
}

async fn authorized_channel() -> Result<GoogleChatChannel> {
    let channel =
        GoogleChatChannel::authorize(&default_client_secret_path(), &default_token_path()).await?;
    Ok(channel)
}

async fn create(display_name: &str) -> Result<()> {
    let channel = authorized_channel().await?;
    let space_name = channel.create_space(display_name).await?;

    let mut google_chat = toml::Table::new();
    google_chat.insert("space_name".into(), toml::Value::String(space_name.clone()));
    let mut patch = toml::Table::new();
    patch.insert("google_chat".into(), toml::Value::Table(google_chat));
    ConfigStore::new()?.save(patch)?;

    info!(space = %space_name, "google chat space saved to config");
    println!("Created space {space_name}");
    Ok(())
}

/// Post `text` into the configured Google Chat space.
pub async fn send(text: &str) -> Result<()> {
    let config = ConfigStore::new()?.load_typed()?;
    let Some(space_name) = config.google_chat.space_name.filter(|s| !s.is_empty()) else {
        bail!("google_chat.space_name is not configured. Run `corphish spaces create` first.");
    };
    let channel = authorized_channel().await?;
    channel.send_message(&space_name, text).await?;
    info!(space = %space_name, "message sent to google chat");
    Ok(())
}
