//! Orchestrator configuration
//!
//! Every field has a default, so running without any config file works for
//! the standard egress checkout. A file only needs the keys it overrides:
//!
//! ```toml
//! [fleet]
//! sudo = false
//!
//! [images]
//! namespace = "example"
//! gstreamer_version = "1.24.0"
//! ```
//!
//! # Lookup order
//!
//! 1. `--config <file>`
//! 2. `DOCKHAND_CONFIG` environment variable
//! 3. `<project>/dockhand.toml`
//! 4. `<user config dir>/dockhand/config.toml`
//! 5. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at a config file
pub const ENV_CONFIG: &str = "DOCKHAND_CONFIG";

/// Config file name looked up in the project directory
pub const PROJECT_CONFIG: &str = "dockhand.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub service: ServiceConfig,
    pub fleet: FleetConfig,
    pub images: ImagesConfig,
    pub integration: IntegrationConfig,
    pub proto: ProtoConfig,
    pub local: LocalConfig,
}

// ============================================================================
// Sections
// ============================================================================

/// The worker service and where it is installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Template name; instances are `<name>@N`
    pub name: String,
    /// Unit file in the project, installed as `<unit_dir>/<name>@.service`
    pub unit_file: String,
    /// Directory systemd loads units from
    pub unit_dir: String,
    /// Locally built binary
    pub binary: String,
    /// Installed binary location
    pub install_binary: String,
    /// Service config in the project
    pub config_file: String,
    /// Installed config location
    pub install_config: String,
    /// Unit file for the audio server the workers depend on
    pub pulse_unit_file: String,
    /// Instance enabled and started by `configure-service`
    pub first_instance: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "egress".to_string(),
            unit_file: "egress.service".to_string(),
            unit_dir: "/etc/systemd/system".to_string(),
            binary: "dist/egress".to_string(),
            install_binary: "/usr/local/bin/egress".to_string(),
            config_file: "egress.yaml".to_string(),
            install_config: "/usr/local/etc/egress.yaml".to_string(),
            pulse_unit_file: "pulseaudio.service".to_string(),
            first_instance: 1,
        }
    }
}

/// Host service manager access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Prefix privileged commands with `sudo`
    pub sudo: bool,
    /// Service manager program
    pub manager: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            sudo: true,
            manager: fleet::SYSTEMCTL.to_string(),
        }
    }
}

/// Container images and the native library versions baked into them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Registry namespace images are tagged under
    pub namespace: String,
    pub gstreamer_version: String,
    pub libnice_version: String,
    pub chromium_version: String,
    /// Platforms for multi-platform pushes
    pub platforms: Vec<String>,
    /// Base image for the chrome installer and template images
    pub base_image: String,
    /// Base image for the gstreamer images
    pub gstreamer_base_image: String,
    /// Gstreamer image variants, each built from `Dockerfile-<variant>`
    pub gstreamer_variants: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            namespace: "usamaliaqat".to_string(),
            gstreamer_version: "1.22.8".to_string(),
            libnice_version: "0.1.21".to_string(),
            chromium_version: "117.0.5874.0".to_string(),
            platforms: vec!["linux/amd64".to_string(), "linux/arm64".to_string()],
            base_image: "ubuntu:22.04".to_string(),
            gstreamer_base_image: "ubuntu:23.10".to_string(),
            gstreamer_variants: ["base", "dev", "prod", "prod-rs"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Container-based integration test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Directory bind-mounted into the test container
    pub input_dir: String,
    /// Directory the test container writes results to
    pub output_dir: String,
    /// Mount point of `input_dir` inside the container
    pub mount: String,
    pub image: String,
    pub dockerfile: String,
    /// Environment variable carrying the container-side config path
    pub config_env: String,
    /// Source tree rewritten for deadlock detection
    pub source_dir: String,
    /// Go module providing the deadlock-detecting mutexes
    pub deadlock_module: String,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            input_dir: "test".to_string(),
            output_dir: "test/output".to_string(),
            mount: "/out".to_string(),
            image: "egress-test".to_string(),
            dockerfile: "build/test/Dockerfile".to_string(),
            config_env: "EGRESS_CONFIG_FILE".to_string(),
            source_dir: "./pkg".to_string(),
            deadlock_module: "github.com/sasha-s/go-deadlock".to_string(),
        }
    }
}

/// Protobuf code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtoConfig {
    /// Go module whose directory is added to the include path
    pub module: String,
    /// Directory holding the proto file; generated code lands next to it
    pub dir: String,
    pub file: String,
}

impl Default for ProtoConfig {
    fn default() -> Self {
        Self {
            module: "github.com/livekit/protocol".to_string(),
            dir: "pkg/ipc".to_string(),
            file: "ipc.proto".to_string(),
        }
    }
}

/// Running and building the service outside a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// Main package
    pub package: String,
    /// Environment overrides applied to `go run` / `go build`
    pub env: BTreeMap<String, String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            package: "./cmd/server".to_string(),
            env: [
                ("CGO_ENABLED", "1"),
                ("GO111MODULE", "on"),
                ("GODEBUG", "disablethp=1"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration following the lookup order.
    pub fn load(explicit: Option<&Path>, project: &Path) -> Result<Self> {
        match locate(explicit, project) {
            Some(path) => Self::load_file(&path),
            None => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load a specific file.
    pub fn load_file(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

fn locate(explicit: Option<&Path>, project: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_path(&path.to_string_lossy()));
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        let path = expand_path(&path);
        log::debug!("Using config from {}: {}", ENV_CONFIG, path.display());
        return Some(path);
    }

    let in_project = project.join(PROJECT_CONFIG);
    if in_project.is_file() {
        return Some(in_project);
    }

    dirs::config_dir()
        .map(|dir| dir.join("dockhand").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Expand `~` and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| shellexpand::tilde(path).into_owned());
    PathBuf::from(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_egress_layout() {
        let config = Config::default();
        assert_eq!(config.service.name, "egress");
        assert_eq!(config.integration.input_dir, "test");
        assert_eq!(config.integration.output_dir, "test/output");
        assert_eq!(config.integration.mount, "/out");
        assert!(config.fleet.sudo);
        assert_eq!(config.images.gstreamer_variants.len(), 4);
    }

    #[test]
    fn test_parse_partial_override() {
        let config = Config::parse(
            r#"
[fleet]
sudo = false

[images]
namespace = "example"
"#,
        )
        .unwrap();
        assert!(!config.fleet.sudo);
        assert_eq!(config.fleet.manager, "systemctl");
        assert_eq!(config.images.namespace, "example");
        assert_eq!(config.images.gstreamer_version, "1.22.8");
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(Config::parse("[fleet]\nsudoo = false\n").is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(Config::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[service]\nname = \"recorder\"\n").unwrap();

        let config = Config::load(Some(&path), dir.path()).unwrap();
        assert_eq!(config.service.name, "recorder");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_load_project_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG),
            "[integration]\nimage = \"egress-it\"\n",
        )
        .unwrap();

        let path = locate(None, dir.path());
        // DOCKHAND_CONFIG set in the environment takes precedence
        if std::env::var(ENV_CONFIG).is_err() {
            assert_eq!(path, Some(dir.path().join(PROJECT_CONFIG)));
            let config = Config::load(None, dir.path()).unwrap();
            assert_eq!(config.integration.image, "egress-it");
        }
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/x.toml"), home.join("x.toml"));
        }
        assert_eq!(expand_path("/etc/x.toml"), PathBuf::from("/etc/x.toml"));
    }
}
