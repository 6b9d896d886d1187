//! Filesystem-backed surface for rendering outside a browser host.
//!
//! Every resource is written to `<dir>/<uuid>.html`. Navigating copies the
//! resource to `<dir>/index.html`; revoking deletes the resource file. There is
//! no layout engine behind it, so height synchronisation is always skipped.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::application::{LoadSignal, RenderSurface, ResourceHandle, RootMetrics, SurfaceError};

const TARGET: &str = "infra::surface::directory";
pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct DirectorySurface {
    directory: PathBuf,
}

impl DirectorySurface {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, SurfaceError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|err| {
            SurfaceError::unavailable(format!(
                "failed to prepare output directory `{}`: {err}",
                directory.display()
            ))
        })?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn resource_path(&self, handle: &ResourceHandle) -> PathBuf {
        self.directory.join(format!("{}.html", handle.id()))
    }

    pub fn index_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE)
    }
}

impl RenderSurface for DirectorySurface {
    fn create_resource(&self, html: String) -> Result<ResourceHandle, SurfaceError> {
        let handle = ResourceHandle::new();
        let path = self.resource_path(&handle);
        fs::write(&path, html).map_err(|err| {
            SurfaceError::unavailable(format!("failed to write `{}`: {err}", path.display()))
        })?;
        Ok(handle)
    }

    fn revoke(&self, handle: &ResourceHandle) {
        let path = self.resource_path(handle);
        match fs::remove_file(&path) {
            Ok(()) => debug!(target = TARGET, path = %path.display(), "Resource revoked"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                target = TARGET,
                op = "directory::revoke",
                result = "error",
                path = %path.display(),
                error = %err,
                "Failed to remove revoked resource"
            ),
        }
    }

    fn navigate(&self, handle: &ResourceHandle) -> Result<LoadSignal, SurfaceError> {
        let source = self.resource_path(handle);
        if !source.is_file() {
            return Err(SurfaceError::UnknownResource {
                handle: handle.to_string(),
            });
        }

        // write-then-rename keeps index.html whole for concurrent readers
        let staging = self.directory.join(format!(".{}.index", handle.id()));
        fs::copy(&source, &staging)
            .and_then(|_| fs::rename(&staging, self.index_path()))
            .map_err(|err| {
                let _ = fs::remove_file(&staging);
                SurfaceError::unavailable(format!("failed to install index: {err}"))
            })?;

        let (notifier, signal) = LoadSignal::channel();
        notifier.notify();
        Ok(signal)
    }

    fn root_metrics(&self) -> Result<RootMetrics, SurfaceError> {
        Err(SurfaceError::unavailable(
            "directory surfaces have no layout engine",
        ))
    }

    fn set_height(&self, _height: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn navigation_installs_index_and_revocation_removes_file() {
        let dir = TempDir::new().expect("temp dir");
        let surface = DirectorySurface::new(dir.path().join("out")).expect("surface");

        let first = surface
            .create_resource("<p>one</p>".to_string())
            .expect("first written");
        surface.navigate(&first).expect("navigated").wait().await.expect("loaded");
        assert_eq!(
            fs::read_to_string(surface.index_path()).expect("index"),
            "<p>one</p>"
        );

        let second = surface
            .create_resource("<p>two</p>".to_string())
            .expect("second written");
        surface.navigate(&second).expect("navigated");
        surface.revoke(&first);

        assert!(!surface.resource_path(&first).exists());
        assert!(surface.resource_path(&second).exists());
        assert_eq!(
            fs::read_to_string(surface.index_path()).expect("index"),
            "<p>two</p>"
        );
        assert!(surface.root_metrics().is_err());
    }

    #[test]
    fn navigating_to_unknown_resource_fails() {
        let dir = TempDir::new().expect("temp dir");
        let surface = DirectorySurface::new(dir.path()).expect("surface");
        let err = surface
            .navigate(&ResourceHandle::new())
            .expect_err("nothing to navigate to");
        assert!(matches!(err, SurfaceError::UnknownResource { .. }));
    }
}
