//! Port to the isolated rendering surface.
//!
//! A surface holds revocable resources (one serialised document each), can be
//! navigated to one of them, reports when that navigation has loaded, and
//! exposes the root element's layout metrics once it has.

use std::fmt;

use serde::{Serialize, Serializer};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::SurfaceError;

/// Identifier of one revocable document resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(Uuid);

impl ResourceHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:exhibition/{}", self.0)
    }
}

impl Serialize for ResourceHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Sending half of a load signal. Consumed on use, so a navigation can be
/// reported as loaded at most once.
#[derive(Debug)]
pub struct LoadNotifier(oneshot::Sender<()>);

impl LoadNotifier {
    pub fn notify(self) {
        // the publisher may have given up waiting; nothing to report then
        let _ = self.0.send(());
    }
}

/// One-shot future armed by a navigation.
#[derive(Debug)]
pub struct LoadSignal(oneshot::Receiver<()>);

impl LoadSignal {
    pub fn channel() -> (LoadNotifier, LoadSignal) {
        let (tx, rx) = oneshot::channel();
        (LoadNotifier(tx), LoadSignal(rx))
    }

    /// Resolves once the navigation loaded. Fails when the surface dropped
    /// the notifier without loading.
    pub async fn wait(self) -> Result<(), SurfaceError> {
        self.0
            .await
            .map_err(|_| SurfaceError::unavailable("load signal dropped before firing"))
    }
}

/// Computed layout of the rendered document's root element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RootMetrics {
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub offset_height: f64,
}

impl RootMetrics {
    /// Offset height plus vertical margins, rounded up.
    pub fn height(&self) -> u32 {
        let total = (self.offset_height + self.margin_top + self.margin_bottom).ceil();
        if total.is_finite() && total > 0.0 {
            total as u32
        } else {
            0
        }
    }
}

pub trait RenderSurface: Send + Sync {
    /// Store a serialised document and return its handle.
    fn create_resource(&self, html: String) -> Result<ResourceHandle, SurfaceError>;

    /// Release a resource. Revoking an unknown or already revoked handle is a no-op.
    fn revoke(&self, handle: &ResourceHandle);

    /// Point the surface at a resource and arm its load signal.
    fn navigate(&self, handle: &ResourceHandle) -> Result<LoadSignal, SurfaceError>;

    fn root_metrics(&self) -> Result<RootMetrics, SurfaceError>;

    fn set_height(&self, height: u32);
}
