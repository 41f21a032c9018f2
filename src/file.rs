//! Locating, reading and writing config files.
//!
//! A [`SaveLocation`] resolves to one base directory. Every config of a
//! family shares `{base}/{family}/`, optionally under a further save path,
//! and stores itself as `{id}.{ext}`:
//!
//! ```text
//! ~/.config/myapp/client.toml
//! ~/.config/myapp/profiles/work/server.json
//! ```
//!
//! A missing file is not an error; only real I/O failures (permissions,
//! etc.) are propagated.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::TrackfigError;
use crate::types::SaveLocation;

/// Resolve `location` to a concrete base directory.
pub fn resolve_location(location: &SaveLocation) -> Result<PathBuf, TrackfigError> {
    match location {
        SaveLocation::Platform => directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(TrackfigError::NoPlatformDir),
        SaveLocation::Home(subdir) => directories::UserDirs::new()
            .map(|user| user.home_dir().join(subdir))
            .ok_or(TrackfigError::NoPlatformDir),
        SaveLocation::Cwd => std::env::current_dir().map_err(|e| TrackfigError::IoError {
            path: PathBuf::from("."),
            source: e,
        }),
        SaveLocation::Path(p) => Ok(p.clone()),
    }
}

pub fn config_path(
    base: &Path,
    family: &str,
    save_path: Option<&Path>,
    id: &str,
    extension: &str,
) -> PathBuf {
    let mut path = base.join(family);
    if let Some(sub) = save_path {
        path.push(sub);
    }
    path.push(format!("{id}.{extension}"));
    path
}

/// Read `path`, or `None` if it does not exist.
pub fn read_document(path: &Path) -> Result<Option<String>, TrackfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TrackfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_document(path: &Path, content: &str) -> Result<(), TrackfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TrackfigError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| TrackfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}
