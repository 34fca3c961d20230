//! ansible-playbook command lines
//!
//! The rendered string is handed to `sh -c`, so quoting matters:
//! - tags are joined with `,` and single quoted: `-t 'a,b'`
//! - the host pattern is double quoted: `-l "host-1:host-2"`
//! - extra vars are rendered as `-e 'key="value"'`
use crate::config::{Config, DEFAULT_ANSIBLE_BIN};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub const CHECK_FLAG: &str = "-C";
pub const DIFF_FLAG: &str = "-D";

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct CommandOptions {
    pub ansible_bin: PathBuf,
    /// Adds `-C`
    pub check: bool,
    /// Adds `-D`
    pub diff: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self::new(DEFAULT_ANSIBLE_BIN.into(), false, false)
    }
}

impl From<&Config> for CommandOptions {
    fn from(config: &Config) -> Self {
        Self::new(
            config.ansible_bin().to_owned(),
            config.ansible_dry_run,
            config.ansible_debug,
        )
    }
}

pub fn extra_vars_flag(key: &str, value: &str) -> String {
    format!("-e '{key}=\"{value}\"'")
}

/// Appends extra vars and the check/diff flags to `args`
///
/// Check and diff flags are only added when not already present.
pub fn finalize_args(
    mut args: Vec<String>,
    extra: &IndexMap<String, String>,
    options: &CommandOptions,
) -> Vec<String> {
    args.extend(extra.iter().map(|(key, value)| extra_vars_flag(key, value)));

    for (enabled, flag) in [(options.check, CHECK_FLAG), (options.diff, DIFF_FLAG)] {
        if enabled && !args.iter().any(|arg| arg == flag) {
            args.push(flag.to_string());
        }
    }

    args
}

pub fn render(
    playbook: &Path,
    tags: &[String],
    hosts: Option<&str>,
    args: &[String],
    options: &CommandOptions,
) -> String {
    let mut cmd = format!("{} {}", options.ansible_bin.display(), playbook.display());

    if !tags.is_empty() {
        cmd.push_str(&format!(" -t '{}'", tags.join(",")));
    }

    if let Some(hosts) = hosts.filter(|hosts| !hosts.is_empty()) {
        cmd.push_str(&format!(" -l \"{hosts}\""));
    }

    for arg in args {
        cmd.push(' ');
        cmd.push_str(arg);
    }

    cmd
}
