//! Registration with the OS service manager so the daemon starts at login
//! and restarts when it exits.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use {
    corphish_config::{ANTHROPIC_API_KEY_ENV, Secrets, TELEGRAM_BOT_TOKEN_ENV},
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
};

use crate::error::{Context, Error, Result};

pub const SERVICE_LABEL: &str = "com.corphish.daemon";
const SYSTEMD_UNIT: &str = "corphish.service";

/// What to run and with which environment.
pub struct ServiceSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Directory for stdout/stderr logs.
    pub log_dir: PathBuf,
    pub env: Vec<(String, Secret<String>)>,
}

impl ServiceSpec {
    /// `program run` with both secrets embedded, so the service does not
    /// depend on the login shell's environment.
    pub fn for_daemon(program: PathBuf, log_dir: PathBuf, secrets: &Secrets) -> Self {
        Self {
            program,
            args: vec!["run".into()],
            log_dir,
            env: vec![
                (
                    TELEGRAM_BOT_TOKEN_ENV.into(),
                    secrets.telegram_bot_token.clone(),
                ),
                (
                    ANTHROPIC_API_KEY_ENV.into(),
                    secrets.anthropic_api_key.clone(),
                ),
            ],
        }
    }
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ServiceSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("log_dir", &self.log_dir)
            .field("env", &env)
            .finish()
    }
}

pub trait ServiceInstaller: Send + Sync {
    /// Write the service definition, activate it, and return its path.
    fn install(&self, spec: &ServiceSpec) -> Result<PathBuf>;
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_launchd_plist(spec: &ServiceSpec) -> String {
    let mut args = format!(
        "        <string>{}</string>\n",
        xml_escape(&spec.program.to_string_lossy())
    );
    for arg in &spec.args {
        args.push_str(&format!("        <string>{}</string>\n", xml_escape(arg)));
    }
    let mut env = String::new();
    for (key, value) in &spec.env {
        env.push_str(&format!(
            "        <key>{}</key>\n        <string>{}</string>\n",
            xml_escape(key),
            xml_escape(value.expose_secret())
        ));
    }
    let log_dir = xml_escape(&spec.log_dir.to_string_lossy());

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN"
    "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{SERVICE_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
{args}    </array>
    <key>EnvironmentVariables</key>
    <dict>
{env}    </dict>
    <key>KeepAlive</key>
    <true/>
    <key>RunAtLoad</key>
    <true/>
    <key>StandardOutPath</key>
    <string>{log_dir}/corphish.log</string>
    <key>StandardErrorPath</key>
    <string>{log_dir}/corphish.error.log</string>
</dict>
</plist>
"#
    )
}

/// Quote a value for a systemd `Environment=` or `ExecStart=` line.
fn systemd_quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('%', "%%");
    format!("\"{escaped}\"")
}

pub fn render_systemd_unit(spec: &ServiceSpec) -> String {
    let mut exec = systemd_quote(&spec.program.to_string_lossy());
    for arg in &spec.args {
        exec.push(' ');
        exec.push_str(&systemd_quote(arg));
    }
    let mut env = String::new();
    for (key, value) in &spec.env {
        env.push_str(&format!(
            "Environment={}\n",
            systemd_quote(&format!("{key}={}", value.expose_secret()))
        ));
    }
    let log_dir = spec.log_dir.display();

    format!(
        "[Unit]
Description=Corphish personal assistant daemon
After=network-online.target

[Service]
ExecStart={exec}
Restart=always
RestartSec=5
{env}StandardOutput=append:{log_dir}/corphish.log
StandardError=append:{log_dir}/corphish.error.log

[Install]
WantedBy=default.target
"
    )
}

/// Write `content` readable by the owner only, since it embeds secrets.
fn write_private(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Run a service-manager command. Failure is reported, not fatal: the
/// definition is already on disk and will be picked up at next login.
fn run_activation(program: &str, args: &[&str]) {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            info!(program, ?args, "service manager command succeeded");
        },
        Ok(output) => warn!(
            program,
            ?args,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "service manager command failed"
        ),
        Err(e) => warn!(program, ?args, error = %e, "failed to run service manager command"),
    }
}

/// macOS launchd user agent.
pub struct LaunchdInstaller {
    pub agents_dir: PathBuf,
    /// Run `launchctl load` after writing the plist.
    pub activate: bool,
}

impl ServiceInstaller for LaunchdInstaller {
    fn install(&self, spec: &ServiceSpec) -> Result<PathBuf> {
        let path = self.agents_dir.join(format!("{SERVICE_LABEL}.plist"));
        write_private(&path, &render_launchd_plist(spec))?;
        info!(path = %path.display(), "installed launchd plist");
        if self.activate {
            run_activation("launchctl", &["load", &path.to_string_lossy()]);
        }
        Ok(path)
    }
}

/// Linux systemd user unit.
pub struct SystemdInstaller {
    pub unit_dir: PathBuf,
    /// Run `systemctl --user daemon-reload` and `enable --now` after writing.
    pub activate: bool,
}

impl ServiceInstaller for SystemdInstaller {
    fn install(&self, spec: &ServiceSpec) -> Result<PathBuf> {
        let path = self.unit_dir.join(SYSTEMD_UNIT);
        write_private(&path, &render_systemd_unit(spec))?;
        info!(path = %path.display(), "installed systemd user unit");
        if self.activate {
            run_activation("systemctl", &["--user", "daemon-reload"]);
            run_activation("systemctl", &["--user", "enable", "--now", SYSTEMD_UNIT]);
        }
        Ok(path)
    }
}

/// Installer for the running OS.
pub fn platform_installer() -> Result<Box<dyn ServiceInstaller>> {
    let base = directories::BaseDirs::new()
        .ok_or_else(|| Error::message("could not resolve the home directory"))?;
    let home = base.home_dir();

    if cfg!(target_os = "macos") {
        Ok(Box::new(LaunchdInstaller {
            agents_dir: home.join("Library").join("LaunchAgents"),
            activate: true,
        }))
    } else if cfg!(target_os = "linux") {
        Ok(Box::new(SystemdInstaller {
            unit_dir: home.join(".config").join("systemd").join("user"),
            activate: true,
        }))
    } else {
        Err(Error::message(format!(
            "no supported service manager on {}; run `corphish run` under your own supervisor",
            std::env::consts::OS
        )))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ServiceSpec {
        ServiceSpec::for_daemon(
            PathBuf::from("/usr/local/bin/corphish"),
            PathBuf::from("/home/me/.config/corphish"),
            &Secrets {
                telegram_bot_token: Secret::new("123:ABC".into()),
                anthropic_api_key: Secret::new("sk-ant-<x>&y".into()),
            },
        )
    }

    #[test]
    fn plist_embeds_program_env_and_keepalive() {
        let plist = render_launchd_plist(&spec());
        assert!(plist.contains("<string>com.corphish.daemon</string>"));
        assert!(plist.contains("<string>/usr/local/bin/corphish</string>"));
        assert!(plist.contains("<string>run</string>"));
        assert!(plist.contains("<key>TELEGRAM_BOT_TOKEN</key>\n        <string>123:ABC</string>"));
        assert!(plist.contains("<string>sk-ant-&lt;x&gt;&amp;y</string>"));
        assert!(plist.contains("<key>KeepAlive</key>\n    <true/>"));
        assert!(plist.contains("<key>RunAtLoad</key>\n    <true/>"));
        assert!(plist.contains("/home/me/.config/corphish/corphish.error.log"));
    }

    #[test]
    fn systemd_unit_quotes_env_and_exec() {
        let mut spec = spec();
        spec.env.push(("PCT".into(), Secret::new("50%\"off".into())));
        let unit = render_systemd_unit(&spec);
        assert!(unit.contains("ExecStart=\"/usr/local/bin/corphish\" \"run\"\n"));
        assert!(unit.contains("Environment=\"TELEGRAM_BOT_TOKEN=123:ABC\"\n"));
        assert!(unit.contains("Environment=\"PCT=50%%\\\"off\"\n"));
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains("WantedBy=default.target"));
    }

    #[test]
    fn debug_hides_secret_values() {
        let dbg = format!("{:?}", spec());
        assert!(dbg.contains("TELEGRAM_BOT_TOKEN"));
        assert!(!dbg.contains("123:ABC"));
    }

    #[test]
    fn launchd_installer_writes_private_plist() {
        let dir = tempfile::tempdir().unwrap();
        let installer = LaunchdInstaller {
            agents_dir: dir.path().join("LaunchAgents"),
            activate: false,
        };
        let path = installer.install(&spec()).unwrap();
        assert_eq!(
            path,
            dir.path().join("LaunchAgents").join("com.corphish.daemon.plist")
        );
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("com.corphish.daemon"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn systemd_installer_writes_unit() {
        let dir = tempfile::tempdir().unwrap();
        let installer = SystemdInstaller {
            unit_dir: dir.path().to_path_buf(),
            activate: false,
        };
        let path = installer.install(&spec()).unwrap();
        assert_eq!(path, dir.path().join("corphish.service"));
        assert!(
            std::fs::read_to_string(&path)
                .unwrap()
                .contains("[Service]")
        );
    }
}
