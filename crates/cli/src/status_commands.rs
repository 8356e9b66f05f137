use {
    anyhow::Result,
    corphish_config::{ConfigStore, CorphishConfig},
    std::path::Path,
};

/// Human-readable status report. `config` is `None` when the file is absent.
pub(crate) fn status_lines(path: &Path, config: Option<&CorphishConfig>) -> Vec<String> {
    let Some(config) = config else {
        return vec![
            format!("Config file: not found ({})", path.display()),
            "Status: not bootstrapped".into(),
        ];
    };

    let mut lines = vec![format!("Config file: {}", path.display())];
    match config.chat_id {
        Some(chat_id) => {
            lines.push(format!("Chat ID: {chat_id}"));
            lines.push("Status: bootstrapped".into());
        },
        None => {
            lines.push("Chat ID: not set".into());
            lines.push("Status: not bootstrapped".into());
        },
    }
    lines.push(format!("Model: {}", config.model.name));
    match config.heartbeat.interval_minutes.filter(|m| *m > 0) {
        Some(minutes) => lines.push(format!("Heartbeat: every {minutes} min")),
        None => lines.push("Heartbeat: off".into()),
    }
    if let Some(space) = &config.google_chat.space_name {
        lines.push(format!("Google Chat space: {space}"));
    }
    lines
}

pub fn status() -> Result<()> {
    let store = ConfigStore::new()?;
    let config = if store.exists() {
        Some(store.load_typed()?)
    } else {
        None
    };
    for line in status_lines(store.path(), config.as_ref()) {
        println!("{line}");
    }
    Ok(())
}
