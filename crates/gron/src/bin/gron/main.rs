mod cli;

use gron::runner::Runner;
use gron::{Config, DeploymentGroups};

fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();

    init_logging(&cli.config);

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(1);
        }
    };

    let groups = match DeploymentGroups::discover(&config) {
        Ok(groups) => groups,
        Err(e) => match e.exit_code(config.debug) {
            Some(code) => std::process::exit(code),
            // debug mode keeps the full error for inspection
            None => return Err(e.into()),
        },
    };

    if groups.is_empty() {
        tracing::warn!(root = config.root_dir(), "no deployment groups found");
    }

    match cli.command {
        cli::Command::Show(show_cli) => show(&show_cli, &groups)?,
        cli::Command::Groups => print!("{}", groups.show_groups()),
        cli::Command::Tasks => print!(
            "{}",
            gron::deployment_groups::show_tasks(&config.deployment_tasks)
        ),
        cli::Command::Run(run_cli) => {
            let runner = Runner::from(&config);
            match groups.run(&run_cli.group, &run_cli.task, &runner) {
                Ok(report) => {
                    tracing::info!(
                        total = report.total,
                        failed = report.failed.len(),
                        "deployment task finished"
                    );
                }
                Err(e) => std::process::exit(e.exit_code(config.skip_dg_notfound)),
            }
        }
    }

    Ok(())
}

fn init_logging(args: &cli::ConfigArgs) {
    let default_level = if args.debug {
        "debug"
    } else if args.silent {
        "warn"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("GRON_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file values overridden by command line flags
fn load_config(args: &cli::ConfigArgs) -> anyhow::Result<Config> {
    let path = match (&args.config, args.no_config) {
        (_, true) => None,
        (Some(path), false) => Some(path.clone()),
        (None, false) => Config::default_path(),
    };

    let mut config = match path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    if args.root_dir.is_some() {
        config.root_dir.clone_from(&args.root_dir);
    }
    if args.ansible_bin.is_some() {
        config.ansible_bin.clone_from(&args.ansible_bin);
    }
    if args.limit.is_some() {
        config.limit.clone_from(&args.limit);
    }
    for raw in &args.environment {
        config.push_environment(raw);
    }

    config.ansible_dry_run |= args.ansible_dry_run;
    config.ansible_debug |= args.ansible_debug;
    config.dry_run |= args.dry_run;
    config.debug |= args.debug;
    config.skip_dg_notfound |= args.skip_dg_notfound;

    Ok(config)
}

fn show(show_cli: &cli::ShowCommand, groups: &DeploymentGroups) -> anyhow::Result<()> {
    match show_cli.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), groups)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), groups)?,
    };

    Ok(())
}
