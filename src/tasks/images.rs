//! Container image builds

use crate::config::ImagesConfig;
use crate::ui;
use crate::workspace::Workspace;
use anyhow::Result;
use procrun::Invocation;
use std::sync::Arc;
use taskgraph::{Registry, Task};

/// How an image is built: into the local daemon, or pushed for every
/// configured platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builder {
    Local,
    Publish,
}

impl Builder {
    fn invocation(self, images: &ImagesConfig) -> Invocation {
        match self {
            Self::Local => Invocation::parse("docker build"),
            Self::Publish => Invocation::parse("docker buildx build --push")
                .arg("--platform")
                .arg(images.platforms.join(",")),
        }
    }
}

pub fn register(registry: &mut Registry, ws: &Arc<Workspace>) -> taskgraph::Result<()> {
    let tasks: [(&str, &str, fn(&Workspace) -> Result<()>); 6] = [
        ("build", "Build the service image", build_service),
        ("build-chrome", "Build the chrome installer image", |ws| {
            chrome(ws, Builder::Local)
        }),
        (
            "publish-chrome",
            "Build and push the multi-platform chrome installer image",
            |ws| chrome(ws, Builder::Publish),
        ),
        ("build-template", "Build the template image", build_template),
        ("build-gstreamer", "Build the gstreamer images", |ws| {
            gstreamer(ws, Builder::Local)
        }),
        (
            "publish-gstreamer",
            "Build and push the multi-platform gstreamer images",
            |ws| gstreamer(ws, Builder::Publish),
        ),
    ];

    for (name, description, body) in tasks {
        let ws = Arc::clone(ws);
        registry.register(Task::new(name, move |_| body(&ws)).describe(description))?;
    }
    Ok(())
}

fn build_service(ws: &Workspace) -> Result<()> {
    let images = &ws.config().images;
    let ns = &images.namespace;
    ui::step("Building service image");

    ws.run_lines([
        format!("docker pull {ns}/chrome-installer:{}", images.chromium_version),
        format!("docker pull {ns}/gstreamer:{}-dev", images.gstreamer_version),
        format!("docker pull {ns}/egress-templates"),
        format!("docker build -t {ns}/egress:latest -f build/egress/Dockerfile ."),
    ])?;
    Ok(())
}

fn chrome(ws: &Workspace, builder: Builder) -> Result<()> {
    let images = &ws.config().images;
    let tag = match builder {
        Builder::Local => format!("{}/chrome-installer", images.namespace),
        Builder::Publish => format!(
            "{}/chrome-installer:{}",
            images.namespace, images.chromium_version
        ),
    };
    ui::step(&format!("Building {tag}"));

    ws.run(Invocation::new("docker").args(["pull", images.base_image.as_str()]))?;
    ws.run(builder.invocation(images).args(["-t", tag.as_str(), "./build/chrome"]))?;
    Ok(())
}

fn build_template(ws: &Workspace) -> Result<()> {
    let images = &ws.config().images;
    ui::step("Building template image");

    ws.run(Invocation::new("docker").args(["pull", images.base_image.as_str()]))?;
    ws.run(Invocation::new("docker").args([
        "build".to_string(),
        "-t".to_string(),
        format!("{}/egress-templates", images.namespace),
        "-f".to_string(),
        "./build/template/Dockerfile".to_string(),
        ".".to_string(),
    ]))?;
    Ok(())
}

fn gstreamer(ws: &Workspace, builder: Builder) -> Result<()> {
    let images = &ws.config().images;
    let arch = go_arch();

    ws.run(Invocation::new("docker").args(["pull", images.gstreamer_base_image.as_str()]))?;
    for variant in &images.gstreamer_variants {
        ui::step(&format!("Building gstreamer {variant}"));
        ws.run(gstreamer_invocation(images, builder, variant, arch))?;
    }
    Ok(())
}

fn gstreamer_invocation(
    images: &ImagesConfig,
    builder: Builder,
    variant: &str,
    arch: &str,
) -> Invocation {
    let ns = &images.namespace;
    let version = &images.gstreamer_version;
    builder.invocation(images).args([
        "--build-arg".to_string(),
        format!("GSTREAMER_VERSION={version}"),
        "--build-arg".to_string(),
        format!("LIBNICE_VERSION={}", images.libnice_version),
        "--build-arg".to_string(),
        format!("ARCH={arch}"),
        "-t".to_string(),
        format!("{ns}/gstreamer:{version}-{variant}"),
        "-t".to_string(),
        format!("{ns}/gstreamer:{version}-{variant}-{arch}"),
        "-f".to_string(),
        format!("build/gstreamer/Dockerfile-{variant}"),
        "./build/gstreamer".to_string(),
    ])
}

/// Host architecture in the naming container registries use.
fn go_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}
