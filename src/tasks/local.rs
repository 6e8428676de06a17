//! Running and building the service on the host

use crate::ui;
use crate::workspace::Workspace;
use procrun::Invocation;
use std::sync::Arc;
use taskgraph::{Registry, Task};

pub fn register(registry: &mut Registry, ws: &Arc<Workspace>) -> taskgraph::Result<()> {
    let run_ws = Arc::clone(ws);
    registry.register(
        Task::new("run-locally", move |_| {
            let package = run_ws.config().local.package.clone();
            ui::step(&format!("Running {package}"));
            run_ws.run(go(&run_ws, ["run".to_string(), package]))?;
            Ok(())
        })
        .describe("Run the service from source"),
    )?;

    let build_ws = Arc::clone(ws);
    registry.register(
        Task::new("build-locally", move |_| {
            let config = build_ws.config();
            ui::step(&format!("Building {}", config.service.binary));
            build_ws.run(go(
                &build_ws,
                [
                    "build".to_string(),
                    "-a".to_string(),
                    "-o".to_string(),
                    config.service.binary.clone(),
                    config.local.package.clone(),
                ],
            ))?;
            Ok(())
        })
        .describe("Build the service binary"),
    )
}

/// `go` with the configured environment overrides.
fn go(ws: &Workspace, args: impl IntoIterator<Item = String>) -> Invocation {
    ws.config()
        .local
        .env
        .iter()
        .fold(Invocation::new("go").args(args), |inv, (key, value)| {
            inv.env(key, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::workspace::testing::scripted;
    use std::path::Path;
    use taskgraph::Runner;

    #[test]
    fn test_go_carries_environment_overrides() {
        let (ws, _) = scripted(Path::new("/src"), Config::default());
        let inv = go(&ws, ["version".to_string()]);
        let env: Vec<_> = inv
            .environment()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        assert_eq!(env, ["CGO_ENABLED=1", "GO111MODULE=on", "GODEBUG=disablethp=1"]);
    }

    #[test]
    fn test_build_and_run_commands() {
        let (ws, runner) = scripted(Path::new("/src"), Config::default());
        let mut registry = Registry::new();
        register(&mut registry, &ws).unwrap();
        let mut tasks = Runner::new(Arc::new(registry));

        tasks.run("build-locally").unwrap();
        tasks.run("run-locally").unwrap();

        assert_eq!(
            runner.calls(),
            ["go build -a -o dist/egress ./cmd/server", "go run ./cmd/server"]
        );
    }
}
