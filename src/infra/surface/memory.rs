//! In-process rendering surface.
//!
//! Resources live in a concurrent map keyed by handle. Navigation either loads
//! immediately or waits for [`MemorySurface::complete_load`], which lets
//! callers model a surface that is slow to load, or never loads at all.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use dashmap::DashMap;
use tracing::debug;

use crate::{
    application::{
        LoadNotifier, LoadSignal, RenderSurface, ResourceHandle, RootMetrics, SurfaceError,
    },
    util::lock,
};

use super::inspect::LoadedDocument;

const TARGET: &str = "infra::surface::memory";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Load as part of `navigate`.
    #[default]
    Immediate,
    /// Load only when `complete_load` is called.
    Manual,
}

#[derive(Default)]
struct SurfaceState {
    target: Option<ResourceHandle>,
    loaded: Option<Arc<LoadedDocument>>,
    pending: Option<(ResourceHandle, LoadNotifier)>,
    height: Option<u32>,
}

#[derive(Default)]
pub struct MemorySurface {
    resources: DashMap<ResourceHandle, Arc<str>>,
    state: Mutex<SurfaceState>,
    behavior: LoadBehavior,
    metrics: Option<RootMetrics>,
    detached: AtomicBool,
    created: AtomicUsize,
}

impl MemorySurface {
    pub fn new(behavior: LoadBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Layout metrics reported for the root element once a document loaded.
    pub fn with_root_metrics(mut self, metrics: RootMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Simulate the surface being removed from its host. Every later access fails.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    /// Fire the pending load, if any. Returns whether a load was delivered.
    pub fn complete_load(&self) -> bool {
        let mut state = lock::lock(&self.state, TARGET);
        let Some((handle, notifier)) = state.pending.take() else {
            return false;
        };
        if state.target != Some(handle) {
            return false;
        }
        match self.load(&handle) {
            Some(document) => {
                state.loaded = Some(document);
                drop(state);
                notifier.notify();
                true
            }
            None => false,
        }
    }

    pub fn height(&self) -> Option<u32> {
        lock::lock(&self.state, TARGET).height
    }

    pub fn current_target(&self) -> Option<ResourceHandle> {
        lock::lock(&self.state, TARGET).target
    }

    pub fn loaded_document(&self) -> Option<Arc<LoadedDocument>> {
        lock::lock(&self.state, TARGET).loaded.clone()
    }

    pub fn resource(&self, handle: &ResourceHandle) -> Option<Arc<str>> {
        self.resources
            .get(handle)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Serialised document currently navigated to.
    pub fn current_html(&self) -> Option<Arc<str>> {
        self.current_target()
            .and_then(|handle| self.resource(&handle))
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.resources.contains_key(handle)
    }

    pub fn live_count(&self) -> usize {
        self.resources.len()
    }

    /// Total resources ever created on this surface.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn ensure_attached(&self) -> Result<(), SurfaceError> {
        if self.detached.load(Ordering::SeqCst) {
            Err(SurfaceError::unavailable("surface detached"))
        } else {
            Ok(())
        }
    }

    fn load(&self, handle: &ResourceHandle) -> Option<Arc<LoadedDocument>> {
        let html = self.resource(handle)?;
        match LoadedDocument::parse(&html) {
            Ok(document) => Some(Arc::new(document)),
            Err(err) => {
                debug!(target = TARGET, handle = %handle, error = %err, "Document failed to load");
                None
            }
        }
    }
}

impl RenderSurface for MemorySurface {
    fn create_resource(&self, html: String) -> Result<ResourceHandle, SurfaceError> {
        self.ensure_attached()?;
        let handle = ResourceHandle::new();
        self.resources.insert(handle, Arc::from(html));
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn revoke(&self, handle: &ResourceHandle) {
        if self.resources.remove(handle).is_some() {
            debug!(target = TARGET, handle = %handle, "Resource revoked");
        }
    }

    fn navigate(&self, handle: &ResourceHandle) -> Result<LoadSignal, SurfaceError> {
        self.ensure_attached()?;
        if !self.is_live(handle) {
            return Err(SurfaceError::UnknownResource {
                handle: handle.to_string(),
            });
        }

        let (notifier, signal) = LoadSignal::channel();
        let mut state = lock::lock(&self.state, TARGET);
        state.target = Some(*handle);
        state.loaded = None;
        // a superseded navigation never reports its load
        state.pending = None;

        match self.behavior {
            LoadBehavior::Immediate => {
                state.loaded = self.load(handle);
                if state.loaded.is_some() {
                    notifier.notify();
                }
            }
            LoadBehavior::Manual => state.pending = Some((*handle, notifier)),
        }
        Ok(signal)
    }

    fn root_metrics(&self) -> Result<RootMetrics, SurfaceError> {
        self.ensure_attached()?;
        if lock::lock(&self.state, TARGET).loaded.is_none() {
            return Err(SurfaceError::unavailable("no document loaded"));
        }
        self.metrics
            .ok_or_else(|| SurfaceError::unavailable("root element has no computed layout"))
    }

    fn set_height(&self, height: u32) {
        lock::lock(&self.state, TARGET).height = Some(height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!DOCTYPE html>\n<html><head></head><body><p id=\"a\">x</p></body></html>";

    #[tokio::test]
    async fn immediate_surface_loads_on_navigation() {
        let surface = MemorySurface::new(LoadBehavior::Immediate);
        let handle = surface.create_resource(DOC.to_string()).expect("created");
        let signal = surface.navigate(&handle).expect("navigated");

        signal.wait().await.expect("loaded");
        let loaded = surface.loaded_document().expect("document loaded");
        assert_eq!(loaded.position_of_id("a"), Some(0));
        assert_eq!(surface.current_target(), Some(handle));
    }

    #[tokio::test]
    async fn manual_surface_loads_once() {
        let surface = MemorySurface::new(LoadBehavior::Manual);
        let handle = surface.create_resource(DOC.to_string()).expect("created");
        let signal = surface.navigate(&handle).expect("navigated");

        assert!(surface.loaded_document().is_none());
        assert!(surface.complete_load());
        assert!(!surface.complete_load());
        signal.wait().await.expect("loaded");
    }

    #[test]
    fn revoking_is_idempotent() {
        let surface = MemorySurface::default();
        let handle = surface.create_resource(DOC.to_string()).expect("created");
        surface.revoke(&handle);
        surface.revoke(&handle);
        assert!(!surface.is_live(&handle));
        assert_eq!(surface.created_count(), 1);
    }

    #[test]
    fn navigating_to_revoked_resource_fails() {
        let surface = MemorySurface::default();
        let handle = surface.create_resource(DOC.to_string()).expect("created");
        surface.revoke(&handle);
        assert!(matches!(
            surface.navigate(&handle),
            Err(SurfaceError::UnknownResource { .. })
        ));
    }

    #[test]
    fn metrics_require_a_loaded_document() {
        let surface = MemorySurface::new(LoadBehavior::Manual).with_root_metrics(RootMetrics {
            margin_top: 0.0,
            margin_bottom: 0.0,
            offset_height: 10.0,
        });
        assert!(surface.root_metrics().is_err());

        surface.detach();
        assert!(surface.create_resource(DOC.to_string()).is_err());
    }
}
