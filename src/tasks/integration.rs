//! Container-based integration test and the diagram rendering that follows it

use crate::config::IntegrationConfig;
use crate::tasks::TaskArgs;
use crate::ui;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use procrun::Invocation;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskgraph::{Registry, Task};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not move {} to {}", .from.display(), .to.display())]
pub struct FilesystemSetupFailed {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: io::Error,
}

pub fn register(
    registry: &mut Registry,
    ws: &Arc<Workspace>,
    args: &TaskArgs,
) -> taskgraph::Result<()> {
    let diagrams_ws = Arc::clone(ws);
    registry.register(
        Task::new("diagrams", move |_| render_pending_diagrams(&diagrams_ws))
            .describe("Render pipeline graphs left by the integration test"),
    )?;

    let ws = Arc::clone(ws);
    let config_file = args.config_file.clone();
    registry.register(
        Task::new("integration", move |scope| {
            scope.defer_task("diagrams");
            scope.defer_task("sync");

            let settings = &ws.config().integration;
            let container_config = config_file
                .as_deref()
                .map(|file| stage_config(ws.root(), settings, file))
                .transpose()?;

            let output = ws.path(&settings.output_dir);
            scope.defer("clean integration output", move |_| {
                remove_output_subdirs(&output);
                Ok(())
            });

            ui::step("Building integration test image");
            ws.run(
                Invocation::new("docker").args([
                    "build",
                    "-t",
                    settings.image.as_str(),
                    "-f",
                    settings.dockerfile.as_str(),
                    ".",
                ]),
            )?;

            ui::step("Running integration tests");
            ws.run(run_container(ws.root(), settings, container_config.as_deref()))?;
            Ok(())
        })
        .describe("Run the integration test suite in a container")
        .depends_on(["deadlock"]),
    )
}

/// Make `config_file` visible inside the test container and return its
/// container-side path.
///
/// A file already under the input directory stays where it is. Anything else
/// is moved into the input directory, keeping its file name.
pub fn stage_config(
    root: &Path,
    settings: &IntegrationConfig,
    config_file: &Path,
) -> Result<String, FilesystemSetupFailed> {
    let input = root.join(&settings.input_dir);
    let source = if config_file.is_absolute() {
        config_file.to_path_buf()
    } else {
        root.join(config_file)
    };

    let relative = if let Ok(inside) = source.strip_prefix(&input) {
        inside.to_path_buf()
    } else {
        let Some(name) = source.file_name() else {
            return Err(FilesystemSetupFailed {
                from: source.clone(),
                to: input,
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            });
        };
        let target = input.join(name);
        move_file(&source, &target).map_err(|e| FilesystemSetupFailed {
            from: source.clone(),
            to: target.clone(),
            source: e,
        })?;
        log::info!("Moved {} to {}", source.display(), target.display());
        PathBuf::from(name)
    };

    Ok(format!(
        "{}/{}",
        settings.mount.trim_end_matches('/'),
        relative.to_string_lossy()
    ))
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        other => other,
    }
}

fn run_container(root: &Path, settings: &IntegrationConfig, config: Option<&str>) -> Invocation {
    let mut docker = Invocation::new("docker").args(["run", "--rm"]);
    if let Some(path) = config {
        docker = docker
            .arg("-e")
            .arg(format!("{}={path}", settings.config_env));
    }
    docker
        .arg("-v")
        .arg(format!(
            "{}:{}",
            root.join(&settings.input_dir).display(),
            settings.mount
        ))
        .arg(&settings.image)
}

/// Render every `<name>.dot` in the output directory that has no
/// `<name>.png` yet.
fn render_pending_diagrams(ws: &Workspace) -> Result<()> {
    let output_dir = &ws.config().integration.output_dir;
    let dir = ws.path(output_dir);

    let mut dots = BTreeSet::new();
    let mut pngs = BTreeSet::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("Could not read {}", dir.display()))? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("dot") => {
                dots.insert(stem);
            }
            Some("png") => {
                pngs.insert(stem);
            }
            _ => {}
        }
    }

    for name in dots.difference(&pngs) {
        log::debug!("Rendering {name}.dot");
        ws.run(Invocation::new("dot").args([
            "-Tpng".to_string(),
            format!("{output_dir}/{name}.dot"),
            "-o".to_string(),
            format!("{output_dir}/{name}.png"),
        ]))?;
    }
    Ok(())
}

/// Remove every subdirectory of `dir`. Files are kept. Failures are logged.
fn remove_output_subdirs(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Could not read {}: {e}", dir.display());
            return;
        }
    };

    // Symlinks are left alone, even when they point at a directory
    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let path = entry.path();
        if let Err(e) = fs::remove_dir_all(&path) {
            log::warn!("Could not remove {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tasks::rewrite;
    use crate::workspace::testing::scripted;
    use procrun::testing::ScriptedRunner;
    use taskgraph::{Error as TaskError, Runner};
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("test/output")).unwrap();
        dir
    }

    fn catalogue(root: &Path, args: &TaskArgs) -> (Runner, Arc<ScriptedRunner>) {
        let (ws, runner) = scripted(root, Config::default());
        let mut registry = Registry::new();
        rewrite::register(&mut registry, &ws).unwrap();
        register(&mut registry, &ws, args).unwrap();
        registry.validate().unwrap();
        (Runner::new(Arc::new(registry)), runner)
    }

    #[test]
    fn test_stage_config_inside_input_dir_is_not_moved() {
        let root = project();
        fs::write(root.path().join("test/foo.yaml"), "x").unwrap();

        let path = stage_config(
            root.path(),
            &IntegrationConfig::default(),
            Path::new("test/foo.yaml"),
        )
        .unwrap();

        assert_eq!(path, "/out/foo.yaml");
        assert!(root.path().join("test/foo.yaml").exists());
    }

    #[test]
    fn test_stage_config_nested_inside_input_dir() {
        let root = project();
        let path = stage_config(
            root.path(),
            &IntegrationConfig::default(),
            &root.path().join("test/configs/room.yaml"),
        )
        .unwrap();
        assert_eq!(path, "/out/configs/room.yaml");
    }

    #[test]
    fn test_stage_config_moves_outside_file() {
        let root = project();
        let elsewhere = TempDir::new().unwrap();
        let source = elsewhere.path().join("bar.yaml");
        fs::write(&source, "bar").unwrap();

        let path = stage_config(root.path(), &IntegrationConfig::default(), &source).unwrap();

        assert_eq!(path, "/out/bar.yaml");
        assert!(!source.exists());
        assert_eq!(
            fs::read_to_string(root.path().join("test/bar.yaml")).unwrap(),
            "bar"
        );
    }

    #[test]
    fn test_stage_config_missing_file_fails() {
        let root = project();
        let err = stage_config(
            root.path(),
            &IntegrationConfig::default(),
            Path::new("configs/missing.yaml"),
        )
        .unwrap_err();
        assert_eq!(err.from, root.path().join("configs/missing.yaml"));
        assert_eq!(err.to, root.path().join("test/missing.yaml"));
    }

    #[test]
    fn test_run_container_without_config_omits_env() {
        let inv = run_container(Path::new("/src"), &IntegrationConfig::default(), None);
        assert_eq!(inv.to_string(), "docker run --rm -v /src/test:/out egress-test");

        let inv = run_container(
            Path::new("/src"),
            &IntegrationConfig::default(),
            Some("/out/foo.yaml"),
        );
        assert_eq!(
            inv.to_string(),
            "docker run --rm -e EGRESS_CONFIG_FILE=/out/foo.yaml -v /src/test:/out egress-test"
        );
    }

    #[test]
    fn test_render_only_missing_pngs() {
        let root = project();
        let output = root.path().join("test/output");
        for name in ["a.dot", "a.png", "b.dot", "notes.txt"] {
            fs::write(output.join(name), "").unwrap();
        }

        let (ws, runner) = scripted(root.path(), Config::default());
        render_pending_diagrams(&ws).unwrap();

        assert_eq!(
            runner.calls(),
            ["dot -Tpng test/output/b.dot -o test/output/b.png"]
        );
    }

    #[test]
    fn test_render_without_output_dir_fails() {
        let root = TempDir::new().unwrap();
        let (ws, runner) = scripted(root.path(), Config::default());
        assert!(render_pending_diagrams(&ws).is_err());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_remove_output_subdirs_keeps_files() {
        let root = project();
        let output = root.path().join("test/output");
        fs::create_dir_all(output.join("run-1/segments")).unwrap();
        fs::create_dir(output.join("run-2")).unwrap();
        fs::write(output.join("summary.json"), "{}").unwrap();

        remove_output_subdirs(&output);

        assert!(!output.join("run-1").exists());
        assert!(!output.join("run-2").exists());
        assert!(output.join("summary.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_output_subdirs_keeps_symlinked_dirs() {
        let root = project();
        let output = root.path().join("test/output");
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("keep.txt"), "").unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), output.join("linked")).unwrap();
        fs::create_dir(output.join("run-1")).unwrap();

        remove_output_subdirs(&output);

        assert!(!output.join("run-1").exists());
        assert!(fs::symlink_metadata(output.join("linked")).is_ok());
        assert!(elsewhere.path().join("keep.txt").exists());
    }

    #[test]
    fn test_integration_unwinds_in_reverse_order() {
        let root = project();
        let output = root.path().join("test/output");
        fs::create_dir(output.join("room-1")).unwrap();
        fs::write(output.join("pipeline.dot"), "").unwrap();
        fs::write(root.path().join("test/room.yaml"), "").unwrap();

        let args = TaskArgs {
            config_file: Some(PathBuf::from("test/room.yaml")),
            ..TaskArgs::default()
        };
        let (mut tasks, runner) = catalogue(root.path(), &args);
        tasks.run("integration").unwrap();

        let calls = runner.calls();
        let run_line = format!(
            "docker run --rm -e EGRESS_CONFIG_FILE=/out/room.yaml -v {}:/out egress-test",
            root.path().join("test").display()
        );
        assert_eq!(calls[0], "go get github.com/sasha-s/go-deadlock");
        assert_eq!(calls[5], "docker build -t egress-test -f build/test/Dockerfile .");
        assert_eq!(calls[6], run_line);
        assert_eq!(
            calls[7],
            "grep -rl deadlock.Mutex ./pkg | xargs -r sed -i -e s/deadlock.Mutex/sync.Mutex/g"
        );
        assert_eq!(calls[10], "go mod tidy");
        assert_eq!(
            calls[11],
            "dot -Tpng test/output/pipeline.dot -o test/output/pipeline.png"
        );
        assert_eq!(calls.len(), 12);
        assert!(!output.join("room-1").exists());
    }

    #[test]
    fn test_integration_failure_still_cleans_up() {
        let root = project();
        fs::create_dir(root.path().join("test/output/room-1")).unwrap();

        let (mut tasks, runner) = catalogue(root.path(), &TaskArgs::default());
        runner.fail_on("docker build -t egress-test -f build/test/Dockerfile .");

        let err = tasks.run("integration").unwrap_err();
        assert!(matches!(&err, TaskError::Failed { task, .. } if task == "integration"));

        let calls = runner.calls();
        assert!(!calls.iter().any(|c| c.starts_with("docker run")));
        assert!(calls.iter().any(|c| c.contains("s/deadlock.RWMutex/sync.RWMutex/g")));
        assert!(!root.path().join("test/output/room-1").exists());
    }

    #[test]
    fn test_integration_config_staging_failure_still_unwinds() {
        let root = project();
        fs::write(root.path().join("test/output/pipeline.dot"), "").unwrap();
        let args = TaskArgs {
            config_file: Some(PathBuf::from("configs/missing.yaml")),
            ..TaskArgs::default()
        };
        let (mut tasks, runner) = catalogue(root.path(), &args);

        let err = tasks.run("integration").unwrap_err();
        let failure = err.failure().unwrap();
        let staging = failure.downcast_ref::<FilesystemSetupFailed>().unwrap();
        assert_eq!(staging.from, root.path().join("configs/missing.yaml"));

        let calls = runner.calls();
        assert!(!calls.iter().any(|c| c.starts_with("docker")));
        assert_eq!(calls.len(), 10);
        assert!(calls[5].contains("s/deadlock.Mutex/sync.Mutex/g"));
        assert_eq!(calls[8], "go mod tidy");
        assert_eq!(
            calls[9],
            "dot -Tpng test/output/pipeline.dot -o test/output/pipeline.png"
        );
    }

    #[test]
    fn test_integration_skipped_when_deadlock_fails() {
        let root = project();
        let (mut tasks, runner) = catalogue(root.path(), &TaskArgs::default());
        runner.fail_on("go get github.com/sasha-s/go-deadlock");

        let err = tasks.run("integration").unwrap_err();
        assert!(matches!(&err, TaskError::Failed { task, .. } if task == "deadlock"));
        assert_eq!(runner.calls(), ["go get github.com/sasha-s/go-deadlock"]);
    }
}
