use crate::config::expand_path;
use crate::tasks::TaskArgs;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(version)]
#[command(about = "Build, test and deploy a fleet of egress workers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "directory", global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Config file to use instead of the usual lookup
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print commands instead of running them
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Task to run; `install` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    // ========================================================================
    // Code generation and source rewrites
    // ========================================================================
    /// Generate Go code for the IPC protobuf service
    Proto,

    /// Replace sync mutexes with go-deadlock mutexes
    Deadlock,

    /// Restore sync mutexes after a deadlock run
    Sync,

    /// Render pipeline graphs left by the integration test
    Diagrams,

    /// Run the integration test suite in a container
    Integration {
        /// Service config for the test container; moved under the test
        /// directory if it is not already there
        config_file: Option<PathBuf>,
    },

    // ========================================================================
    // Images
    // ========================================================================
    /// Build the service image
    Build,

    /// Build the chrome installer image
    BuildChrome,

    /// Build and push the multi-platform chrome installer image
    PublishChrome,

    /// Build the template image
    BuildTemplate,

    /// Build the gstreamer images
    BuildGstreamer,

    /// Build and push the multi-platform gstreamer images
    PublishGstreamer,

    // ========================================================================
    // Local
    // ========================================================================
    /// Run the service from source
    RunLocally,

    /// Build the service binary
    BuildLocally,

    // ========================================================================
    // Fleet
    // ========================================================================
    /// List registered service instances
    #[command(visible_alias = "ls")]
    ListInstances,

    /// Start every instance
    StartAll,

    /// Stop every instance
    StopAll,

    /// Restart every instance
    RestartAll,

    /// Enable every instance
    EnableAll,

    /// Disable every instance
    DisableAll,

    /// Disable then stop every instance
    StopAndDisableAll,

    /// Enable and start one instance
    #[command(visible_alias = "enable")]
    EnableInstance {
        /// Instance number
        number: u32,
    },

    /// Disable and stop one instance
    #[command(visible_alias = "disable")]
    DisableInstance {
        /// Instance number
        number: u32,
    },

    // ========================================================================
    // Installation
    // ========================================================================
    /// Install and start the pulseaudio service
    ConfigurePulse,

    /// Install the service unit and start the first instance
    ConfigureService,

    /// Replace the installed binary and config, then restart
    Deploy,

    /// Build, configure and deploy the service
    Install,

    // ========================================================================
    // Meta
    // ========================================================================
    /// Run a task by name
    Run {
        /// Task name (see `dockhand tasks`)
        task: String,
    },

    /// List available tasks
    Tasks,

    /// Print the effective configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// Task name and arguments for commands that run a task.
    pub fn task(&self) -> Option<(String, TaskArgs)> {
        let mut args = TaskArgs::default();
        let name = match self {
            Self::Proto => "proto",
            Self::Deadlock => "deadlock",
            Self::Sync => "sync",
            Self::Diagrams => "diagrams",
            Self::Integration { config_file } => {
                args.config_file = config_file
                    .as_ref()
                    .map(|p| expand_path(&p.to_string_lossy()));
                "integration"
            }
            Self::Build => "build",
            Self::BuildChrome => "build-chrome",
            Self::PublishChrome => "publish-chrome",
            Self::BuildTemplate => "build-template",
            Self::BuildGstreamer => "build-gstreamer",
            Self::PublishGstreamer => "publish-gstreamer",
            Self::RunLocally => "run-locally",
            Self::BuildLocally => "build-locally",
            Self::ListInstances => "list-instances",
            Self::StartAll => "start-all",
            Self::StopAll => "stop-all",
            Self::RestartAll => "restart-all",
            Self::EnableAll => "enable-all",
            Self::DisableAll => "disable-all",
            Self::StopAndDisableAll => "stop-and-disable-all",
            Self::EnableInstance { number } => {
                args.instance = Some(*number);
                "enable-instance"
            }
            Self::DisableInstance { number } => {
                args.instance = Some(*number);
                "disable-instance"
            }
            Self::ConfigurePulse => "configure-pulse",
            Self::ConfigureService => "configure-service",
            Self::Deploy => "deploy",
            Self::Install => "install",
            Self::Run { task } => return Some((task.clone(), args)),
            Self::Tasks | Self::Config | Self::Completions { .. } => return None,
        };
        Some((name.to_string(), args))
    }
}
