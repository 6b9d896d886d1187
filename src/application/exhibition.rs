//! User-facing facade: registrations plus one publisher.

use std::sync::{Arc, RwLock};

use futures::future::try_join_all;
use metrics::counter;
use tracing::{info, warn};

use crate::util::lock;

use super::{
    contribution::{Contribution, Contributor, DocumentAlterer, Payload},
    error::PublishError,
    publisher::{PublishReport, Publisher},
};

const TARGET: &str = "application::exhibition";

#[derive(Debug, Clone, Copy)]
pub struct ExhibitionOptions {
    /// Publish once from [`Exhibition::start`].
    pub refresh_on_init: bool,
    /// Publish whenever a contributor is added.
    pub refresh_on_add: bool,
}

impl Default for ExhibitionOptions {
    fn default() -> Self {
        Self {
            refresh_on_init: true,
            refresh_on_add: false,
        }
    }
}

#[derive(Clone)]
enum Registration {
    Contributor(Arc<dyn Contributor>),
    Alterer {
        alterer: Arc<dyn DocumentAlterer>,
        priority: i32,
    },
}

pub struct Exhibition {
    publisher: Arc<Publisher>,
    options: ExhibitionOptions,
    registrations: RwLock<Vec<Registration>>,
}

impl Exhibition {
    pub fn new(publisher: Arc<Publisher>, options: ExhibitionOptions) -> Self {
        Self {
            publisher,
            options,
            registrations: RwLock::new(Vec::new()),
        }
    }

    pub fn with_contributors(
        publisher: Arc<Publisher>,
        options: ExhibitionOptions,
        contributors: impl IntoIterator<Item = Arc<dyn Contributor>>,
    ) -> Self {
        let exhibition = Self::new(publisher, options);
        {
            let mut registrations = lock::write(&exhibition.registrations, TARGET);
            registrations.extend(contributors.into_iter().map(Registration::Contributor));
        }
        exhibition
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn options(&self) -> ExhibitionOptions {
        self.options
    }

    pub fn registration_count(&self) -> usize {
        lock::read(&self.registrations, TARGET).len()
    }

    /// Initial render, when enabled by `refresh_on_init`.
    pub async fn start(&self) -> Result<Option<PublishReport>, PublishError> {
        if !self.options.refresh_on_init {
            return Ok(None);
        }
        self.request_update().await.map(Some)
    }

    pub async fn add_contributor(
        &self,
        contributor: Arc<dyn Contributor>,
    ) -> Result<Option<PublishReport>, PublishError> {
        lock::write(&self.registrations, TARGET).push(Registration::Contributor(contributor));
        if !self.options.refresh_on_add {
            return Ok(None);
        }
        self.request_update().await.map(Some)
    }

    /// Register a document alterer merged like any contributor output.
    pub fn register_alterer(&self, alterer: Arc<dyn DocumentAlterer>, priority: i32) {
        lock::write(&self.registrations, TARGET).push(Registration::Alterer { alterer, priority });
    }

    /// Collect from every contributor concurrently, aggregate and publish.
    ///
    /// Any production failure aborts the cycle before building; the render
    /// already on the surface stays visible.
    pub async fn request_update(&self) -> Result<PublishReport, PublishError> {
        let cycle = self.publisher.begin_cycle().await;

        let outcome = match self.collect().await {
            Ok(contributions) => cycle.publish(contributions).await,
            Err(err) => {
                drop(cycle);
                Err(err)
            }
        };

        match &outcome {
            Ok(report) => info!(
                target = TARGET,
                op = "exhibition::request_update",
                result = "ok",
                handle = %report.handle,
                "Preview updated"
            ),
            Err(err) => {
                counter!("exhibition_publish_failed_total").increment(1);
                warn!(
                    target = TARGET,
                    op = "exhibition::request_update",
                    result = "error",
                    error = %err,
                    "Preview update aborted; previous render kept"
                );
            }
        }
        outcome
    }

    async fn collect(&self) -> Result<Vec<Contribution>, PublishError> {
        let registrations = lock::read(&self.registrations, TARGET).clone();

        let pending = registrations
            .into_iter()
            .enumerate()
            .map(|(sequence, registration)| async move {
                match registration {
                    Registration::Contributor(contributor) => {
                        let priority = contributor.priority();
                        let value = contributor.produce_value().await.map_err(|err| {
                            PublishError::production(contributor.label(), err)
                        })?;
                        Ok::<_, PublishError>(Contribution::new(
                            sequence,
                            priority,
                            Payload::Value(value),
                        ))
                    }
                    Registration::Alterer { alterer, priority } => Ok(Contribution::new(
                        sequence,
                        priority,
                        Payload::Alterer(alterer),
                    )),
                }
            });

        try_join_all(pending).await
    }
}
