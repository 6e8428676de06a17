//! Locating external tools on the host

use crate::workspace::Workspace;
use procrun::Invocation;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{name} not found in PATH or the Go bin directory")]
pub struct ToolNotFound {
    pub name: String,
}

/// Find an executable named `name`, first in `PATH`, then in
/// `$(go env GOPATH)/bin` where `go install` puts protoc plugins.
pub fn locate(name: &str, ws: &Workspace) -> Result<PathBuf, ToolNotFound> {
    if let Ok(found) = which::which(name) {
        log::debug!("Found {name} at {}", found.display());
        return Ok(found);
    }

    go_bin_path(ws)
        .and_then(|paths| which::which_in(name, Some(paths), ws.root()).ok())
        .ok_or_else(|| ToolNotFound {
            name: name.to_string(),
        })
}

/// `bin` under every `GOPATH` entry, joined as a search path.
fn go_bin_path(ws: &Workspace) -> Option<OsString> {
    let gopath = match ws.output(Invocation::parse("go env GOPATH")) {
        Ok(out) => out,
        Err(e) => {
            log::debug!("Could not query GOPATH: {e}");
            return None;
        }
    };

    let dirs: Vec<_> = env::split_paths(gopath.trim())
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.join("bin"))
        .collect();
    if dirs.is_empty() {
        return None;
    }
    env::join_paths(dirs).ok()
}
