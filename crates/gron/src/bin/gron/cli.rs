//! gron cli interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show all collected data
    Show(ShowCommand),

    /// Show deployment groups with their tasks and playbooks
    #[command(alias = "dg")]
    Groups,

    /// Show recognized deployment tasks
    Tasks,

    /// Run all playbooks of a deployment group's task
    ///
    /// gron run -g example.com_2024 -t _deploy_cert -C -D
    Run(RunCommand),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config file path
    ///
    /// Defaults to config.yml next to the executable, if it exists
    #[clap(short = 'c', long = "config", global(true), conflicts_with("no_config"))]
    pub config: Option<PathBuf>,

    /// Don't use a config file
    #[clap(long = "no-config", global(true))]
    pub no_config: bool,

    /// Directory with playbooks, ~/ansible-ng by default
    #[clap(long = "root-dir", global(true))]
    pub root_dir: Option<String>,

    /// Path to ansible-playbook, /usr/bin/ansible-playbook by default
    #[clap(long = "ansible-bin", global(true))]
    pub ansible_bin: Option<PathBuf>,

    /// Additional variables for ansible: -e "a='b' c='d'"
    ///
    /// Can be specified multiple times. Values without '=' are ignored.
    #[clap(short = 'e', long = "environment", global(true))]
    pub environment: Vec<String>,

    /// Limit execution by host (ansible-playbook -l)
    #[clap(short = 'l', long = "limit", global(true))]
    pub limit: Option<String>,

    /// ansible's '-C' flag for all playbooks
    #[clap(short = 'C', long = "ansible-dry-run", global(true))]
    pub ansible_dry_run: bool,

    /// ansible's '-D' flag for all playbooks
    #[clap(short = 'D', long = "ansible-debug", global(true))]
    pub ansible_debug: bool,

    /// Show the commands instead of running them
    #[clap(long = "dry-run", global(true))]
    pub dry_run: bool,

    /// Debug logging; errors in task metadata are returned with full context
    #[clap(long = "debug", global(true))]
    pub debug: bool,

    /// Only show warnings and errors
    #[clap(long = "silent", global(true), conflicts_with("debug"))]
    pub silent: bool,

    /// Exit successfully when the deployment group or task is not found
    #[clap(long = "skip-dg-notfound", global(true))]
    pub skip_dg_notfound: bool,
}

#[derive(Args, Debug)]
pub struct ShowCommand {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Deployment group
    #[clap(short = 'g', long = "deployment-group")]
    pub group: String,

    /// Deployment task
    #[clap(short = 't', long = "deployment-task")]
    pub task: String,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
