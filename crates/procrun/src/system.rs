//! Runners backed by the operating system.

use crate::error::{ExecutionFailed, Result};
use crate::invocation::Invocation;
use crate::{CommandRunner, pipeline_display};
use std::io;
use std::process::Stdio;

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        log::debug!("running: {invocation}");
        let status = invocation
            .to_command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ExecutionFailed::launch(invocation.to_string(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ExecutionFailed::exit(
                invocation.to_string(),
                status.code(),
                "",
            ))
        }
    }

    fn output(&self, invocation: &Invocation) -> Result<String> {
        log::debug!("capturing: {invocation}");
        let output = invocation
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExecutionFailed::launch(invocation.to_string(), e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(ExecutionFailed::exit(
                invocation.to_string(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ))
        }
    }

    fn pipe(&self, producer: &Invocation, consumer: &Invocation) -> Result<()> {
        let command = pipeline_display(producer, consumer);
        log::debug!("running: {command}");

        let mut upstream = producer
            .to_command()
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionFailed::launch(command.clone(), e))?;

        let Some(stdout) = upstream.stdout.take() else {
            let _ = upstream.kill();
            let _ = upstream.wait();
            return Err(ExecutionFailed::launch(
                command,
                io::Error::other("producer stdout was not captured"),
            ));
        };

        let downstream = consumer.to_command().stdin(Stdio::from(stdout)).status();
        let upstream_status = upstream.wait();

        let status = downstream.map_err(|e| ExecutionFailed::launch(command.clone(), e))?;
        match upstream_status {
            Ok(s) if !s.success() => {
                log::debug!("producer `{producer}` exited with {s}");
            }
            Ok(_) => {}
            Err(e) => return Err(ExecutionFailed::launch(command, e)),
        }

        if status.success() {
            Ok(())
        } else {
            Err(ExecutionFailed::exit(command, status.code(), ""))
        }
    }
}

/// Prints commands instead of running them.
///
/// Captured output is always empty, so anything parsed from it (such as
/// fleet discovery) sees nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        print_planned(&invocation.to_string(), invocation);
        Ok(())
    }

    fn output(&self, invocation: &Invocation) -> Result<String> {
        print_planned(&invocation.to_string(), invocation);
        Ok(String::new())
    }

    fn pipe(&self, producer: &Invocation, consumer: &Invocation) -> Result<()> {
        print_planned(&pipeline_display(producer, consumer), producer);
        Ok(())
    }
}

fn print_planned(command: &str, invocation: &Invocation) {
    match invocation.dir() {
        Some(dir) => println!("  [dry-run] ({}) {command}", dir.display()),
        None => println!("  [dry-run] {command}"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::Cause;

    #[test]
    fn test_run_success() {
        assert!(SystemRunner.run(&Invocation::new("true")).is_ok());
    }

    #[test]
    fn test_run_non_zero_exit() {
        let err = SystemRunner
            .run(&Invocation::new("sh").args(["-c", "exit 3"]))
            .unwrap_err();
        assert_eq!(err.command, "sh -c 'exit 3'");
        assert_eq!(err.cause.exit_code(), Some(3));
    }

    #[test]
    fn test_run_missing_program_is_launch_failure() {
        let err = SystemRunner
            .run(&Invocation::new("definitely-not-a-real-program-4821"))
            .unwrap_err();
        assert!(matches!(err.cause, Cause::Launch(_)));
    }

    #[test]
    fn test_output_captures_stdout() {
        let out = SystemRunner
            .output(&Invocation::new("sh").args(["-c", "echo one; echo two"]))
            .unwrap();
        assert_eq!(out, "one\ntwo\n");
    }

    #[test]
    fn test_output_failure_carries_stderr() {
        let err = SystemRunner
            .output(&Invocation::new("sh").args(["-c", "echo denied >&2; exit 1"]))
            .unwrap_err();
        match err.cause {
            Cause::Exit { code, stderr } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr.trim(), "denied");
            }
            Cause::Launch(e) => panic!("unexpected launch failure: {e}"),
        }
    }

    #[test]
    fn test_output_respects_current_dir() {
        let out = SystemRunner
            .output(&Invocation::new("pwd").current_dir("/"))
            .unwrap();
        assert_eq!(out.trim(), "/");
    }

    #[test]
    fn test_output_passes_env() {
        let out = SystemRunner
            .output(
                &Invocation::new("sh")
                    .args(["-c", "printf %s \"$GODEBUG\""])
                    .env("GODEBUG", "disablethp=1"),
            )
            .unwrap();
        assert_eq!(out, "disablethp=1");
    }

    #[test]
    fn test_pipe_uses_consumer_status() {
        let producer = Invocation::new("sh").args(["-c", "echo hello"]);
        assert!(SystemRunner.pipe(&producer, &Invocation::new("cat")).is_ok());

        let err = SystemRunner
            .pipe(&producer, &Invocation::new("false"))
            .unwrap_err();
        assert_eq!(err.command, "sh -c 'echo hello' | false");
        assert_eq!(err.cause.exit_code(), Some(1));
    }

    #[test]
    fn test_pipe_tolerates_failing_producer() {
        let producer = Invocation::new("sh").args(["-c", "exit 1"]);
        assert!(SystemRunner.pipe(&producer, &Invocation::new("cat")).is_ok());
    }

    #[test]
    fn test_pipe_missing_producer_is_launch_failure() {
        let err = SystemRunner
            .pipe(
                &Invocation::new("definitely-not-a-real-program-4821"),
                &Invocation::new("cat"),
            )
            .unwrap_err();
        assert!(matches!(err.cause, Cause::Launch(_)));
    }

    #[test]
    fn test_dry_run_never_fails() {
        let runner = DryRunRunner;
        assert!(runner.run(&Invocation::new("false")).is_ok());
        assert_eq!(runner.output(&Invocation::new("false")).unwrap(), "");
    }
}
