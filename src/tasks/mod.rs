//! The task catalogue
//!
//! Every task the CLI can run is registered here. Task bodies capture a
//! shared [`Workspace`] and shell out through its runner, so the same
//! catalogue runs for real, in dry-run mode, or against a scripted runner
//! in tests.

mod images;
mod integration;
mod local;
mod proto;
mod rewrite;
mod services;

use crate::workspace::Workspace;
use std::path::PathBuf;
use std::sync::Arc;
use taskgraph::Registry;

/// Task run when the CLI is given no subcommand.
const DEFAULT_TASK: &str = "install";

/// Parameters supplied on the command line for the tasks that take them.
#[derive(Debug, Clone, Default)]
pub struct TaskArgs {
    /// Service config for the integration test container
    pub config_file: Option<PathBuf>,
    /// Instance number for `enable-instance` / `disable-instance`
    pub instance: Option<u32>,
}

/// Build the full catalogue over `ws`.
pub fn registry(ws: &Arc<Workspace>, args: &TaskArgs) -> taskgraph::Result<Registry> {
    let mut registry = Registry::new();

    proto::register(&mut registry, ws)?;
    rewrite::register(&mut registry, ws)?;
    integration::register(&mut registry, ws, args)?;
    images::register(&mut registry, ws)?;
    local::register(&mut registry, ws)?;
    services::register(&mut registry, ws, args)?;

    registry.set_default(DEFAULT_TASK)?;
    registry.validate()?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::workspace::testing::scripted;
    use std::path::Path;
    use taskgraph::Runner;

    const EXPECTED: &[&str] = &[
        "build",
        "build-chrome",
        "build-gstreamer",
        "build-locally",
        "build-template",
        "configure-pulse",
        "configure-service",
        "deadlock",
        "deploy",
        "diagrams",
        "disable-all",
        "disable-instance",
        "enable-all",
        "enable-instance",
        "install",
        "integration",
        "list-instances",
        "proto",
        "publish-chrome",
        "publish-gstreamer",
        "restart-all",
        "run-locally",
        "start-all",
        "stop-all",
        "stop-and-disable-all",
        "sync",
    ];

    #[test]
    fn test_catalogue_is_complete_and_valid() {
        let (ws, _) = scripted(Path::new("/src"), Config::default());
        let registry = registry(&ws, &TaskArgs::default()).unwrap();

        let names: Vec<_> = registry.tasks().map(|t| t.name().to_string()).collect();
        assert_eq!(names, EXPECTED);
        assert_eq!(registry.default_task(), Some(DEFAULT_TASK));
        assert!(registry.tasks().all(|t| !t.description().is_empty()));
    }

    #[test]
    fn test_install_runs_build_configure_then_deploy() {
        let (ws, runner) = scripted(Path::new("/src"), Config::default());
        let registry = registry(&ws, &TaskArgs::default()).unwrap();

        Runner::new(Arc::new(registry)).run("install").unwrap();

        let calls = runner.calls();
        let position = |needle: &str| {
            calls
                .iter()
                .position(|c| c.starts_with(needle))
                .unwrap_or_else(|| panic!("{needle} not run: {calls:?}"))
        };
        assert!(position("go build") < position("sudo cp egress.service"));
        assert!(
            position("sudo cp egress.service") < position("sudo rm -rf /usr/local/bin/egress")
        );
        assert_eq!(
            calls.first().map(String::as_str),
            Some("go build -a -o dist/egress ./cmd/server")
        );
    }
}
