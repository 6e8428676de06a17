//! Shared context handed to every task body: project root, configuration,
//! and the command runner everything shells out through.

use crate::config::Config;
use fleet::Fleet;
use procrun::{CommandRunner, ExecutionFailed, Invocation};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Workspace {
    root: PathBuf,
    config: Config,
    runner: Arc<dyn CommandRunner>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            config,
            runner,
        }
    }

    /// Project directory; relative paths in the config resolve against it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a project-relative path.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Fleet controller for the configured service.
    pub fn fleet(&self) -> Fleet {
        Fleet::new(&self.config.service.name, Arc::clone(&self.runner))
            .with_sudo(self.config.fleet.sudo)
            .with_manager(&self.config.fleet.manager)
    }

    /// Invocation of `program`, elevated with sudo when configured.
    pub fn privileged(&self, program: &str) -> Invocation {
        if self.config.fleet.sudo {
            Invocation::new("sudo").arg(program)
        } else {
            Invocation::new(program)
        }
    }

    /// Run an invocation from the project root unless it names its own dir.
    pub fn run(&self, invocation: Invocation) -> Result<(), ExecutionFailed> {
        self.runner.run(&invocation.or_current_dir(&self.root))
    }

    /// Run each whitespace-separated command line in order, stopping at the
    /// first failure.
    pub fn run_lines<I, S>(&self, lines: I) -> Result<(), ExecutionFailed>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.run(Invocation::parse(line.as_ref()))?;
        }
        Ok(())
    }

    pub fn output(&self, invocation: Invocation) -> Result<String, ExecutionFailed> {
        self.runner.output(&invocation.or_current_dir(&self.root))
    }

    pub fn pipe(&self, producer: Invocation, consumer: Invocation) -> Result<(), ExecutionFailed> {
        self.runner.pipe(
            &producer.or_current_dir(&self.root),
            &consumer.or_current_dir(&self.root),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privileged_respects_sudo_flag() {
        let (ws, _) = testing::scripted(Path::new("/src"), Config::default());
        assert_eq!(
            ws.privileged("cp").args(["a", "b"]).to_string(),
            "sudo cp a b"
        );

        let mut config = Config::default();
        config.fleet.sudo = false;
        let (ws, _) = testing::scripted(Path::new("/src"), config);
        assert_eq!(ws.privileged("cp").to_string(), "cp");
    }

    #[test]
    fn test_run_lines_stops_at_first_failure() {
        let (ws, runner) = testing::scripted(Path::new("/src"), Config::default());
        runner.fail_on("docker pull ubuntu:22.04");

        let err = ws
            .run_lines(["docker pull ubuntu:22.04", "docker build ."])
            .unwrap_err();
        assert_eq!(err.command, "docker pull ubuntu:22.04");
        assert_eq!(runner.calls(), ["docker pull ubuntu:22.04"]);
    }

    #[test]
    fn test_fleet_uses_service_name_and_sudo() {
        let (ws, runner) = testing::scripted(Path::new("/src"), Config::default());
        ws.fleet().enable_start(2).unwrap();
        assert_eq!(
            runner.calls(),
            ["sudo systemctl enable egress@2", "sudo systemctl start egress@2"]
        );
    }
}
