#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use exhibition::{
    application::{
        ContentProductionError, Contributor, Exhibition, ExhibitionOptions, LoadSignal, Publisher,
        PublisherConfig, RenderSurface, ResourceHandle, RootMetrics, SurfaceError,
    },
    domain::value::ContentValue,
    infra::surface::MemorySurface,
};

/// Contributor returning a fixed value, optionally after a delay or with a
/// switchable failure.
pub struct FixedContributor {
    label: String,
    priority: i32,
    value: ContentValue,
    delay: Option<Duration>,
    failing: AtomicBool,
    produced: AtomicUsize,
    in_flight: Option<Arc<InFlight>>,
}

impl FixedContributor {
    pub fn new(label: &str, priority: i32, value: ContentValue) -> Self {
        Self {
            label: label.to_string(),
            priority,
            value,
            delay: None,
            failing: AtomicBool::new(false),
            produced: AtomicUsize::new(0),
            in_flight: None,
        }
    }

    pub fn markup(label: &str, priority: i32, markup: &str) -> Self {
        Self::new(label, priority, ContentValue::markup(markup))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn tracking(mut self, in_flight: Arc<InFlight>) -> Self {
        self.in_flight = Some(in_flight);
        self
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Contributor for FixedContributor {
    async fn produce_value(&self) -> Result<ContentValue, ContentProductionError> {
        if let Some(in_flight) = &self.in_flight {
            in_flight.enter();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(in_flight) = &self.in_flight {
            in_flight.leave();
        }
        self.produced.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(ContentProductionError::empty_transform(&self.label));
        }
        Ok(self.value.clone())
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Highest number of productions observed running at the same time.
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Memory surface whose navigation can be made to fail.
pub struct FlakySurface {
    pub inner: MemorySurface,
    fail_navigation: AtomicBool,
}

impl FlakySurface {
    pub fn new(inner: MemorySurface) -> Self {
        Self {
            inner,
            fail_navigation: AtomicBool::new(false),
        }
    }

    pub fn fail_navigation(&self, failing: bool) {
        self.fail_navigation.store(failing, Ordering::SeqCst);
    }
}

impl RenderSurface for FlakySurface {
    fn create_resource(&self, html: String) -> Result<ResourceHandle, SurfaceError> {
        self.inner.create_resource(html)
    }

    fn revoke(&self, handle: &ResourceHandle) {
        self.inner.revoke(handle)
    }

    fn navigate(&self, handle: &ResourceHandle) -> Result<LoadSignal, SurfaceError> {
        if self.fail_navigation.load(Ordering::SeqCst) {
            return Err(SurfaceError::unavailable("window gone"));
        }
        self.inner.navigate(handle)
    }

    fn root_metrics(&self) -> Result<RootMetrics, SurfaceError> {
        self.inner.root_metrics()
    }

    fn set_height(&self, height: u32) {
        self.inner.set_height(height)
    }
}

pub fn publisher_on(surface: Arc<dyn RenderSurface>, config: PublisherConfig) -> Arc<Publisher> {
    Arc::new(Publisher::new(surface, config))
}

pub fn exhibition_on(
    surface: Arc<dyn RenderSurface>,
    contributors: Vec<Arc<dyn Contributor>>,
) -> Exhibition {
    Exhibition::with_contributors(
        publisher_on(surface, PublisherConfig::default()),
        ExhibitionOptions::default(),
        contributors,
    )
}
