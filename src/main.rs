mod cli;
mod config;
mod tasks;
mod tools;
mod ui;
mod workspace;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Config;
use procrun::{CommandRunner, DryRunRunner, SystemRunner};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use taskgraph::Runner;
use tasks::TaskArgs;
use workspace::Workspace;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = match &cli.directory {
        Some(dir) => config::expand_path(&dir.to_string_lossy()),
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let config = Config::load(cli.config.as_deref(), &root)?;

    let (name, args) = match &cli.command {
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "dockhand", &mut io::stdout());
            return Ok(());
        }
        Some(Command::Config) => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        Some(Command::Tasks) => return list_tasks(&root, config),
        Some(command) => {
            let (name, args) = command.task().context("Command does not name a task")?;
            (Some(name), args)
        }
        None => (None, TaskArgs::default()),
    };

    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        Arc::new(DryRunRunner)
    } else {
        Arc::new(SystemRunner)
    };
    let ws = Arc::new(Workspace::new(root, config, runner));
    let registry = tasks::registry(&ws, &args)?;
    let name = match name {
        Some(name) => name,
        None => registry
            .default_task()
            .context("No task given and no default task set")?
            .to_string(),
    };

    log::debug!("Running {name} in {}", ws.root().display());
    let mut runner = Runner::new(Arc::new(registry));
    if !cli.quiet {
        runner = runner.with_observer(ui::TaskReporter::new());
    }
    runner.run(&name)?;
    Ok(())
}

fn list_tasks(root: &std::path::Path, config: Config) -> Result<()> {
    let ws = Arc::new(Workspace::new(root, config, Arc::new(DryRunRunner)));
    let registry = tasks::registry(&ws, &TaskArgs::default())?;
    let width = registry.tasks().map(|t| t.name().len()).max().unwrap_or(0);

    ui::header("Tasks");
    for task in registry.tasks() {
        let mut description = task.description().to_string();
        if !task.prerequisites().is_empty() {
            description.push_str(&format!(" (after {})", task.prerequisites().join(", ")));
        }
        if registry.default_task() == Some(task.name()) {
            description.push_str(" [default]");
        }
        ui::kv(task.name(), &description, width);
    }
    Ok(())
}
