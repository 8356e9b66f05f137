use std::sync::Arc;

use {
    anyhow::{Context, Result},
    corphish_agents::{
        AnthropicProvider, Conversation, load_system_prompt, policy_for,
        providers::anthropic::resolve_base_url,
    },
    corphish_channels::Channel,
    corphish_config::{ConfigStore, CorphishConfig, DaemonConfig, Secrets, secrets::env_lookup},
    corphish_daemon::{Daemon, DaemonSettings, HeartbeatSettings},
    corphish_onboarding::{Bootstrap, BootstrapSettings, platform_installer},
    corphish_telegram::{TelegramChannel, TelegramConfig},
    secrecy::Secret,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

/// Headroom between the long-poll timeout and the HTTP client timeout.
const HTTP_TIMEOUT_MARGIN_SECS: u64 = 35;

pub(crate) fn telegram_channel(
    token: Secret<String>,
    daemon: &DaemonConfig,
) -> corphish_channels::Result<TelegramChannel> {
    let config = TelegramConfig {
        request_timeout_secs: u64::from(daemon.poll_timeout_secs) + HTTP_TIMEOUT_MARGIN_SECS,
        ..TelegramConfig::new(token)
    };
    TelegramChannel::new(&config)
}

pub(crate) fn build_conversation(config: &CorphishConfig, api_key: Secret<String>) -> Conversation {
    let base_url = resolve_base_url(config.model.base_url.as_deref(), env_lookup);
    let provider = AnthropicProvider::new(api_key, config.model.name.clone(), base_url)
        .with_max_tokens(config.model.max_tokens);

    let config_dir = corphish_config::config_dir();
    let cwd = std::env::current_dir().ok();
    let dirs: Vec<&std::path::Path> = config_dir
        .iter()
        .chain(cwd.iter())
        .map(|p| p.as_path())
        .collect();
    let system_prompt = load_system_prompt(&dirs);

    Conversation::new(Arc::new(provider))
        .with_system_prompt(system_prompt)
        .with_policy(policy_for(config.daemon.history_turns))
}

/// Default command: bootstrap on first run, otherwise run the daemon.
///
/// After a first-run bootstrap the installed service starts the daemon, so
/// this process exits instead of running a second copy.
pub async fn run() -> Result<()> {
    let store = ConfigStore::new()?;
    if store.is_first_run()? {
        info!(path = %store.path().display(), "no chat configured, starting bootstrap");
        return bootstrap_with(&store).await;
    }
    run_daemon(&store).await
}

pub async fn bootstrap() -> Result<()> {
    let store = ConfigStore::new()?;
    bootstrap_with(&store).await
}

async fn bootstrap_with(store: &ConfigStore) -> Result<()> {
    let config = store.load_typed()?;
    let installer = platform_installer()?;
    let bootstrap = Bootstrap {
        store,
        installer: installer.as_ref(),
        settings: BootstrapSettings::from_config(&config.daemon),
        program: std::env::current_exe().context("failed to resolve the corphish binary path")?,
        log_dir: corphish_config::ensure_config_dir()?,
    };

    let chat_id = bootstrap
        .run(Secrets::from_env, |secrets| {
            let channel = telegram_channel(secrets.telegram_bot_token.clone(), &config.daemon)?;
            Ok(Arc::new(channel) as Arc<dyn Channel>)
        })
        .await?;

    println!("Bootstrap complete. Corphish is now talking to chat {chat_id}.");
    Ok(())
}

async fn run_daemon(store: &ConfigStore) -> Result<()> {
    let config = store.load_typed()?;
    let chat_id = config
        .chat_id
        .context("chat_id is not configured. Run `corphish bootstrap` first.")?;
    let secrets = Secrets::from_env()?;

    let telegram = telegram_channel(secrets.telegram_bot_token.clone(), &config.daemon)?;
    telegram.connect().await?;

    let conversation = Arc::new(build_conversation(&config, secrets.anthropic_api_key));
    let heartbeat = HeartbeatSettings::from_config(&config.heartbeat);
    let mut daemon = Daemon::new(
        Arc::new(telegram),
        conversation,
        chat_id,
        DaemonSettings::from_config(&config.daemon),
    )
    .with_heartbeat(heartbeat);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupt received, shutting down"),
                Err(e) => warn!(error = %e, "failed to listen for interrupt"),
            }
            cancel.cancel();
        });
    }

    daemon.run(cancel).await?;
    Ok(())
}

/// Send one message to the model and print the reply.
pub async fn run_once(text: &str) -> Result<()> {
    let api_key = corphish_config::secrets::anthropic_api_key(env_lookup)?;
    let config = ConfigStore::new()?.load_typed()?;
    let conversation = build_conversation(&config, api_key);
    let reply = conversation.send(text).await?;
    println!("{reply}");
    Ok(())
}
