//! Protobuf code generation for the IPC service

use crate::tools;
use crate::ui;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use procrun::Invocation;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use taskgraph::{Registry, Task};

/// The fields of `go list -json -m` we need.
#[derive(Debug, Deserialize)]
struct ModuleInfo {
    #[serde(rename = "Dir")]
    dir: String,
}

pub fn register(registry: &mut Registry, ws: &Arc<Workspace>) -> taskgraph::Result<()> {
    let ws = Arc::clone(ws);
    registry.register(
        Task::new("proto", move |_| generate(&ws))
            .describe("Generate Go code for the IPC protobuf service"),
    )
}

fn generate(ws: &Workspace) -> Result<()> {
    ui::step("Generating protobuf");
    let proto = &ws.config().proto;

    let listing =
        ws.output(Invocation::new("go").args(["list", "-json", "-m", proto.module.as_str()]))?;
    let include = module_dir(&listing)
        .with_context(|| format!("Could not read module info for {}", proto.module))?;

    tools::locate("protoc", ws)?;
    let protoc_gen_go = tools::locate("protoc-gen-go", ws)?;
    let protoc_gen_go_grpc = tools::locate("protoc-gen-go-grpc", ws)?;

    ws.run(
        protoc_invocation(&proto.file, &protoc_gen_go, &protoc_gen_go_grpc, &include)
            .current_dir(ws.path(&proto.dir)),
    )?;
    Ok(())
}

fn module_dir(listing: &str) -> Result<String> {
    let info: ModuleInfo = serde_json::from_str(listing)?;
    Ok(info.dir)
}

fn protoc_invocation(
    file: &str,
    go_plugin: &Path,
    grpc_plugin: &Path,
    include: &str,
) -> Invocation {
    Invocation::new("protoc").args([
        "--go_out".to_string(),
        ".".to_string(),
        "--go-grpc_out".to_string(),
        ".".to_string(),
        "--go_opt=paths=source_relative".to_string(),
        "--go-grpc_opt=paths=source_relative".to_string(),
        format!("--plugin=go={}", go_plugin.display()),
        format!("--plugin=go-grpc={}", grpc_plugin.display()),
        format!("-I{include}"),
        "-I=.".to_string(),
        file.to_string(),
    ])
}
