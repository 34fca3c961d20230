//! run configuration
//!
//! [Config] is the value object every other module reads from. It is loaded from an optional
//! YAML file and then overridden by command line flags (see the `gron` binary).
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT_DIR: &str = "~/ansible-ng";
pub const DEFAULT_ANSIBLE_BIN: &str = "/usr/bin/ansible-playbook";
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Task names recognized when the config file does not list its own
pub const DEFAULT_DEPLOYMENT_TASKS: [&str; 4] = [
    "_deploy_cert",
    "_certbot_acme",
    "_certbot_upload",
    "_gcore_upload",
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for inventory files. A leading `~/` is expanded.
    pub root_dir: Option<String>,
    pub deployment_tasks: Vec<String>,
    /// Pre-rendered `-e key=value` arguments appended to every descriptor
    pub environment: Vec<String>,
    /// Host limit that overrides every descriptor's hosts
    pub limit: Option<String>,
    pub skip_dg_notfound: bool,
    pub ansible_bin: Option<PathBuf>,
    /// Pass `-C` to every playbook run
    pub ansible_dry_run: bool,
    /// Pass `-D` to every playbook run
    pub ansible_debug: bool,
    /// Log commands instead of spawning them
    pub dry_run: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: None,
            deployment_tasks: DEFAULT_DEPLOYMENT_TASKS.map(String::from).to_vec(),
            environment: vec![],
            limit: None,
            skip_dg_notfound: false,
            ansible_bin: None,
            ansible_dry_run: false,
            ansible_debug: false,
            dry_run: false,
            debug: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!(path=%path.display(), "loading config");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;

        // an empty file is a valid (empty) config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// `config.yml` next to the running executable, if it exists
    pub fn default_path() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let path = exe.parent()?.join(DEFAULT_CONFIG_FILE);
        path.is_file().then_some(path)
    }

    /// Root directory with the fallback applied. Not yet home-expanded.
    pub fn root_dir(&self) -> &str {
        match self.root_dir.as_deref() {
            Some(root_dir) if !root_dir.is_empty() => root_dir,
            _ => DEFAULT_ROOT_DIR,
        }
    }

    pub fn ansible_bin(&self) -> &Path {
        match self.ansible_bin.as_deref() {
            Some(bin) if !bin.as_os_str().is_empty() => bin,
            _ => Path::new(DEFAULT_ANSIBLE_BIN),
        }
    }

    /// Adds a raw `key=value` string as an `-e` argument
    ///
    /// Strings without `=` are ignored. Returns whether the value was added.
    pub fn push_environment(&mut self, raw: &str) -> bool {
        if !raw.contains('=') {
            tracing::debug!(value = raw, "ignoring environment value without '='");
            return false;
        }

        self.environment.push(format!("-e {raw}"));
        true
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}
