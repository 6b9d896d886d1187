//! Publish cycle state machine.
//!
//! `Idle → Collecting → Building → Swapping → Settling → Idle`. One cycle at a
//! time: [`Publisher::begin_cycle`] holds an async FIFO lock for the whole
//! cycle, so a request arriving mid-cycle waits and then runs its own full
//! cycle. Nothing is dropped and no two cycles interleave.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::{counter, histogram};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use crate::domain::document::PreviewDocument;

use super::{
    aggregate::aggregate,
    contribution::{Contribution, Payload},
    error::PublishError,
    surface::{LoadSignal, RenderSurface, ResourceHandle},
};

const TARGET: &str = "application::publisher";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherState {
    Idle,
    Collecting,
    Building,
    Swapping,
    Settling,
}

#[derive(Debug, Clone, Default)]
pub struct PublisherConfig {
    /// Upper bound on waiting for the load signal. `None` waits indefinitely.
    pub settle_timeout: Option<Duration>,
}

/// The render currently installed on the surface.
#[derive(Debug, Clone)]
pub struct PublishedRender {
    pub handle: ResourceHandle,
    pub document: Arc<PreviewDocument>,
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettleOutcome {
    /// Load confirmed; `height` is `None` when metrics could not be read.
    Loaded { height: Option<u32> },
    /// No load signal within the settle timeout. Height untouched.
    TimedOut,
    /// The surface dropped the load signal. Height untouched.
    Abandoned,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub handle: ResourceHandle,
    pub contributions: usize,
    pub settle: SettleOutcome,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub elapsed_ms: u64,
}

pub struct Publisher {
    surface: Arc<dyn RenderSurface>,
    config: PublisherConfig,
    current: Mutex<Option<PublishedRender>>,
    state: watch::Sender<PublisherState>,
}

impl Publisher {
    pub fn new(surface: Arc<dyn RenderSurface>, config: PublisherConfig) -> Self {
        let (state, _) = watch::channel(PublisherState::Idle);
        Self {
            surface,
            config,
            current: Mutex::new(None),
            state,
        }
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    pub fn state(&self) -> PublisherState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PublisherState> {
        self.state.subscribe()
    }

    /// Wait for any in-flight cycle, then start a new one in `Collecting`.
    pub async fn begin_cycle(&self) -> PublishCycle<'_> {
        let current = self.current.lock().await;
        self.transition(PublisherState::Collecting);
        PublishCycle {
            publisher: self,
            current,
            started_at: Instant::now(),
        }
    }

    /// Run a full cycle for contributions that are already collected.
    pub async fn publish(
        &self,
        contributions: Vec<Contribution>,
    ) -> Result<PublishReport, PublishError> {
        self.begin_cycle().await.publish(contributions).await
    }

    /// Snapshot of the installed render. Waits for an in-flight cycle.
    pub async fn current(&self) -> Option<PublishedRender> {
        self.current.lock().await.clone()
    }

    /// Resize the surface to the rendered root element. Fails soft: when the
    /// surface cannot report metrics the height is left as is.
    pub fn update_height(&self) -> Option<u32> {
        match self.surface.root_metrics() {
            Ok(metrics) => {
                let height = metrics.height();
                self.surface.set_height(height);
                debug!(
                    target = TARGET,
                    op = "publisher::update_height",
                    height,
                    "Surface height synchronised"
                );
                Some(height)
            }
            Err(err) => {
                debug!(
                    target = TARGET,
                    op = "publisher::update_height",
                    result = "skipped",
                    error = %err,
                    "Root metrics unavailable; height left unchanged"
                );
                None
            }
        }
    }

    fn transition(&self, next: PublisherState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(target = TARGET, from = ?previous, to = ?next, "Publisher state changed");
        }
    }
}

/// Exclusive right to run one publish cycle. Dropping it, on success or on
/// any early return, puts the publisher back to `Idle`.
pub struct PublishCycle<'a> {
    publisher: &'a Publisher,
    current: MutexGuard<'a, Option<PublishedRender>>,
    started_at: Instant,
}

impl PublishCycle<'_> {
    pub async fn publish(
        mut self,
        contributions: Vec<Contribution>,
    ) -> Result<PublishReport, PublishError> {
        let ordered = aggregate(contributions);
        let count = ordered.len();

        self.publisher.transition(PublisherState::Building);
        let document = build_document(&ordered).await?;

        self.publisher.transition(PublisherState::Swapping);
        let (handle, signal) = self.swap(document)?;

        self.publisher.transition(PublisherState::Settling);
        let settle = self.settle(signal).await;

        let elapsed = self.started_at.elapsed();
        counter!("exhibition_publish_total").increment(1);
        histogram!("exhibition_publish_ms").record(elapsed.as_secs_f64() * 1000.0);

        let published_at = self
            .current
            .as_ref()
            .map(|render| render.published_at)
            .unwrap_or_else(OffsetDateTime::now_utc);

        info!(
            target = TARGET,
            op = "publisher::publish",
            result = "ok",
            handle = %handle,
            contributions = count,
            settle = ?settle,
            elapsed_ms = elapsed.as_millis() as u64,
            "Render published"
        );

        Ok(PublishReport {
            handle,
            contributions: count,
            settle,
            published_at,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Install the new document, then retire the previous one. A failed
    /// navigation releases the new resource and keeps the old render.
    fn swap(
        &mut self,
        document: PreviewDocument,
    ) -> Result<(ResourceHandle, LoadSignal), PublishError> {
        let surface = &self.publisher.surface;
        let handle = surface.create_resource(document.to_html())?;

        let signal = match surface.navigate(&handle) {
            Ok(signal) => signal,
            Err(err) => {
                surface.revoke(&handle);
                warn!(
                    target = TARGET,
                    op = "publisher::swap",
                    result = "error",
                    handle = %handle,
                    error = %err,
                    "Navigation failed; previous render kept"
                );
                return Err(err.into());
            }
        };

        let next = PublishedRender {
            handle,
            document: Arc::new(document),
            published_at: OffsetDateTime::now_utc(),
        };
        if let Some(previous) = self.current.replace(next) {
            surface.revoke(&previous.handle);
            counter!("exhibition_revoked_total").increment(1);
            debug!(
                target = TARGET,
                op = "publisher::swap",
                revoked = %previous.handle,
                "Previous render revoked"
            );
        }

        Ok((handle, signal))
    }

    async fn settle(&self, signal: LoadSignal) -> SettleOutcome {
        let loaded = match self.publisher.config.settle_timeout {
            Some(limit) => match tokio::time::timeout(limit, signal.wait()).await {
                Ok(result) => result.map_err(Some),
                Err(_) => Err(None),
            },
            None => signal.wait().await.map_err(Some),
        };

        match loaded {
            Ok(()) => SettleOutcome::Loaded {
                height: self.publisher.update_height(),
            },
            Err(Some(err)) => {
                warn!(
                    target = TARGET,
                    op = "publisher::settle",
                    result = "abandoned",
                    error = %err,
                    "Surface dropped the load signal"
                );
                SettleOutcome::Abandoned
            }
            Err(None) => {
                warn!(
                    target = TARGET,
                    op = "publisher::settle",
                    result = "timed_out",
                    "Surface did not report a load in time"
                );
                SettleOutcome::TimedOut
            }
        }
    }
}

impl Drop for PublishCycle<'_> {
    fn drop(&mut self) {
        self.publisher.transition(PublisherState::Idle);
    }
}

async fn build_document(ordered: &[Contribution]) -> Result<PreviewDocument, PublishError> {
    let mut document = PreviewDocument::new();
    for contribution in ordered {
        match contribution.payload() {
            Payload::Value(value) => document.append_value(value),
            Payload::Alterer(alterer) => alterer
                .alter(&mut document)
                .await
                .map_err(|err| PublishError::production(alterer.label(), err))?,
        }
    }
    Ok(document)
}
