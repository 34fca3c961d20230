//! executing rendered commands
//!
//! Commands run one after another through `sh -c`, inheriting stdio. A failing command is logged
//! and the next one still runs.
use crate::config::Config;
use crate::descriptor::ResolvedDescriptor;
use std::ffi::OsString;
use std::process::Command;

#[derive(Debug, Clone, derive_new::new)]
pub struct Runner {
    /// Log commands instead of spawning them
    dry_run: bool,
}

impl From<&Config> for Runner {
    fn from(config: &Config) -> Self {
        Self::new(config.dry_run)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    DryRun,
    Success,
    /// Exit code, `None` when killed by a signal or not spawned at all
    Failed(Option<i32>),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunReport {
    pub total: usize,
    /// Commands that did not exit successfully
    pub failed: Vec<String>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl Runner {
    pub fn run(&self, descriptor: &ResolvedDescriptor) -> Result<RunStatus, RunError> {
        let cmd = descriptor.cmd();
        if cmd.trim().is_empty() {
            tracing::error!("no command in task (see debug)");
            tracing::debug!(?descriptor);
            return Err(RunError::MissingCommand {
                group: descriptor.dg().to_string(),
                playbook: descriptor.playbook().to_owned(),
            });
        }

        if self.dry_run {
            tracing::info!("Dry run: {cmd}");
            return Ok(RunStatus::DryRun);
        }

        tracing::info!("Run {cmd}");
        let status = match shell_command(cmd, std::env::vars_os()).status() {
            Ok(status) if status.success() => return Ok(RunStatus::Success),
            Ok(status) => RunStatus::Failed(status.code()),
            Err(e) => {
                tracing::error!(error=%e, "unable to spawn shell");
                RunStatus::Failed(None)
            }
        };

        tracing::error!("Error! {cmd}");
        Ok(status)
    }

    /// Runs all descriptors in order, regardless of earlier failures
    pub fn run_all(&self, descriptors: &[ResolvedDescriptor]) -> Result<RunReport, RunError> {
        let mut report = RunReport::default();
        for descriptor in descriptors {
            report.total += 1;
            if let RunStatus::Failed(_) = self.run(descriptor)? {
                report.failed.push(descriptor.cmd().to_string());
            }
        }
        Ok(report)
    }
}

/// `sh -c cmd` with exactly the given environment, minus virtualenv variables
pub fn shell_command<I>(cmd: &str, vars: I) -> Command
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(cmd)
        .env_clear()
        .envs(filtered_env(vars));
    command
}

/// Drops every variable that would leak the caller's python virtualenv into the playbook run
pub fn filtered_env<I>(vars: I) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter(|(key, _)| !is_virtualenv_var(&key.to_string_lossy()))
        .collect()
}

pub fn is_virtualenv_var(key: &str) -> bool {
    key.contains("VIRTUALENV") || key.contains("VIRTUAL_ENV")
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("Deployment group '{0}' doesn't exist")]
    GroupNotFound(String),
    #[error("Group '{group}' with deployment task '{task}' not found")]
    TaskNotFound { group: String, task: String },
    #[error("No command for group '{group}', playbook {}", playbook.display())]
    MissingCommand {
        group: String,
        playbook: std::path::PathBuf,
    },
}

impl RunError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RunError::GroupNotFound(_) | RunError::TaskNotFound { .. })
    }

    /// Logs the error and returns the process exit code for it
    ///
    /// With `skip_dg_notfound` a missing group or task is reported at info level and exits 0.
    pub fn exit_code(&self, skip_dg_notfound: bool) -> i32 {
        if self.is_not_found() && skip_dg_notfound {
            tracing::info!("{self}");
            return 0;
        }

        tracing::error!("{self}");
        1
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::CommandOptions;
    use crate::descriptor::Descriptor;
    use pretty_assertions::assert_eq;

    fn descriptor(ansible_bin: &str) -> ResolvedDescriptor {
        ResolvedDescriptor::resolve(
            Descriptor {
                dg: "example.com_2024".into(),
                playbook: "/srv/playbooks/nginx/nginx.yml".into(),
                hosts: Some("host-1".into()),
                tags: vec!["nginx_ssl_conf".into()],
                args: vec![],
                extra: Default::default(),
            },
            &CommandOptions::new(ansible_bin.into(), false, false),
        )
    }

    #[test]
    fn virtualenv_vars() {
        assert!(is_virtualenv_var("VIRTUAL_ENV"));
        assert!(is_virtualenv_var("VIRTUAL_ENV_PROMPT"));
        assert!(is_virtualenv_var("VIRTUALENVWRAPPER_PYTHON"));
        assert!(is_virtualenv_var("PIP_VIRTUALENV_BASE"));
        assert!(!is_virtualenv_var("PATH"));
        assert!(!is_virtualenv_var("HOME"));
    }

    #[test]
    fn dry_run_spawns_nothing() {
        // would fail if it was spawned
        let status = Runner::new(true).run(&descriptor("false")).unwrap();
        assert_eq!(status, RunStatus::DryRun);
    }

    #[test]
    fn exit_status_is_reported() {
        let runner = Runner::new(false);
        assert_eq!(runner.run(&descriptor("true")).unwrap(), RunStatus::Success);
        assert_eq!(
            runner.run(&descriptor("false")).unwrap(),
            RunStatus::Failed(Some(1))
        );
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let descriptors = [descriptor("false"), descriptor("true"), descriptor("false")];
        let report = Runner::new(false).run_all(&descriptors).unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.failed.len(), 2);
        assert!(!report.success());
    }

    fn env(vars: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        vars.iter()
            .map(|(key, value)| (OsString::from(key), OsString::from(value)))
            .collect()
    }

    #[test]
    fn filtered_env_keeps_everything_else() {
        let vars = env(&[
            ("PATH", "/usr/bin:/bin"),
            ("VIRTUAL_ENV", "/tmp/venv"),
            ("VIRTUALENVWRAPPER_PYTHON", "/usr/bin/python3"),
            ("HOME", "/root"),
        ]);

        assert_eq!(
            filtered_env(vars),
            env(&[("PATH", "/usr/bin:/bin"), ("HOME", "/root")])
        );
    }

    #[test]
    fn virtualenv_is_not_inherited() {
        let vars = env(&[("PATH", "/usr/bin:/bin"), ("VIRTUAL_ENV", "/tmp/venv")]);
        let status = shell_command(r#"test -z "$VIRTUAL_ENV" && test -n "$PATH""#, vars)
            .status()
            .unwrap();

        assert!(status.success());
    }

    #[test]
    fn not_found_policy() {
        let group = RunError::GroupNotFound("missing-group".into());
        assert_eq!(group.exit_code(false), 1);
        assert_eq!(group.exit_code(true), 0);

        let task = RunError::TaskNotFound {
            group: "a".into(),
            task: "_deploy_cert".into(),
        };
        assert_eq!(task.exit_code(true), 0);

        let missing = RunError::MissingCommand {
            group: "a".into(),
            playbook: "/p.yml".into(),
        };
        assert_eq!(missing.exit_code(true), 1);
    }
}
