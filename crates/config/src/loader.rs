use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    merge::deep_merge,
    schema::CorphishConfig,
};

/// Config file name inside the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

const APP_DIR: &str = "corphish";
const CONFIG_DIR_ENV: &str = "CORPHISH_CONFIG_DIR";

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the config directory for the rest of the process (CLI `--config-dir`).
pub fn set_config_dir(dir: PathBuf) {
    let mut guard = CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    *guard = Some(dir);
}

/// Drop a previous [`set_config_dir`] override.
pub fn clear_config_dir() {
    let mut guard = CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

/// Returns the corphish config directory.
///
/// Resolution order:
/// 1. programmatic override (`set_config_dir`)
/// 2. `CORPHISH_CONFIG_DIR`
/// 3. `$XDG_CONFIG_HOME/corphish` (ignored when empty)
/// 4. `~/.config/corphish`
pub fn config_dir() -> Option<PathBuf> {
    let override_dir = CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone();
    let home = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf());
    resolve_config_dir(
        override_dir,
        std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from),
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        home,
    )
}

fn resolve_config_dir(
    override_dir: Option<PathBuf>,
    env_dir: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    let non_empty = |p: &PathBuf| !p.as_os_str().is_empty();

    if let Some(dir) = override_dir.filter(non_empty) {
        return Some(dir);
    }
    if let Some(dir) = env_dir.filter(non_empty) {
        return Some(dir);
    }
    if let Some(xdg) = xdg_config_home.filter(non_empty) {
        return Some(xdg.join(APP_DIR));
    }
    home.map(|h| h.join(".config").join(APP_DIR))
}

/// Creates the config directory if needed and returns it.
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().ok_or(Error::NoConfigDirectory)?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Key/value persistence for `config.toml`.
///
/// Only one daemon instance may write a given config directory; the store
/// guards against torn writes (atomic rename) but not against concurrent
/// writers.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `<config_dir>/config.toml`.
    pub fn new() -> Result<Self> {
        let dir = config_dir().ok_or(Error::NoConfigDirectory)?;
        Ok(Self {
            path: dir.join(CONFIG_FILENAME),
        })
    }

    /// Create a store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the raw document. A missing file reads as an empty table.
    pub fn load(&self) -> Result<toml::Table> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "config file not found, using empty config");
                return Ok(toml::Table::new());
            },
            Err(e) => return Err(e.into()),
        };
        raw.parse::<toml::Table>().map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Reads the document into the typed schema, filling defaults.
    pub fn load_typed(&self) -> Result<CorphishConfig> {
        let table = self.load()?;
        toml::Value::Table(table)
            .try_into()
            .map_err(|source| Error::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Deep-merges `patch` into the stored document and writes it back
    /// atomically. Returns the merged document.
    pub fn save(&self, patch: toml::Table) -> Result<toml::Table> {
        let mut merged = self.load()?;
        deep_merge(&mut merged, patch);
        self.write_atomic(&merged)?;
        info!(path = %self.path.display(), "saved config");
        Ok(merged)
    }

    /// Convenience for the single most common write.
    pub fn save_chat_id(&self, chat_id: i64) -> Result<toml::Table> {
        let mut patch = toml::Table::new();
        patch.insert("chat_id".into(), toml::Value::Integer(chat_id));
        self.save(patch)
    }

    /// True until a conversation (`chat_id`) has been configured.
    pub fn is_first_run(&self) -> Result<bool> {
        Ok(!self.load()?.contains_key("chat_id"))
    }

    fn write_atomic(&self, table: &toml::Table) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let serialized = toml::to_string_pretty(table)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
