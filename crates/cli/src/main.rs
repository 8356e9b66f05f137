mod auth_commands;
mod run_commands;
mod send_commands;
mod spaces_commands;
mod status_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "corphish",
    version,
    about = "Corphish, a personal AI assistant on Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/corphish/).
    #[arg(long, global = true, env = "CORPHISH_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon loop (default). Bootstraps on first run.
    Run,
    /// Run first-time setup: capture the chat, greet, install the service.
    Bootstrap,
    /// Send a message to the configured Telegram chat.
    Send {
        /// Post to the configured Google Chat space instead.
        #[arg(long)]
        google_chat: bool,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Send one message to the model and print the reply.
    RunOnce {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show configuration status.
    Status,
    /// Google Chat space management.
    Spaces {
        #[command(subcommand)]
        action: spaces_commands::SpacesAction,
    },
    /// Google account authorization for the Google Chat transport.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    if let Some(ref dir) = cli.config_dir {
        corphish_config::set_config_dir(dir.clone());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "corphish starting");

    match cli.command {
        None | Some(Commands::Run) => run_commands::run().await,
        Some(Commands::Bootstrap) => run_commands::bootstrap().await,
        Some(Commands::Send { google_chat, text }) => {
            let text = text.join(" ");
            if google_chat {
                spaces_commands::send(&text).await
            } else {
                send_commands::send(&text).await
            }
        },
        Some(Commands::RunOnce { text }) => run_commands::run_once(&text.join(" ")).await,
        Some(Commands::Status) => status_commands::status(),
        Some(Commands::Spaces { action }) => spaces_commands::handle_spaces(action).await,
        Some(Commands::Auth { action }) => auth_commands::handle_auth(action).await,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["corphish"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn send_joins_words_and_requires_text() {
        let cli = Cli::try_parse_from(["corphish", "send", "hello", "there"]).unwrap();
        match cli.command {
            Some(Commands::Send { google_chat, text }) => {
                assert!(!google_chat);
                assert_eq!(text.join(" "), "hello there");
            },
            _ => panic!("expected send"),
        }
        assert!(Cli::try_parse_from(["corphish", "send"]).is_err());
    }

    #[test]
    fn run_once_is_kebab_case() {
        let cli = Cli::try_parse_from(["corphish", "run-once", "ping"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::RunOnce { .. })));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "corphish",
            "status",
            "--log-level",
            "debug",
            "--json-logs",
            "--config-dir",
            "/tmp/corphish",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(cli.json_logs);
        assert_eq!(
            cli.config_dir.as_deref(),
            Some(std::path::Path::new("/tmp/corphish"))
        );
    }
}
