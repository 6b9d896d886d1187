//! Application layer: the contribution, aggregation and publish pipeline.

pub mod aggregate;
pub mod contribution;
pub mod error;
pub mod exhibition;
pub mod publisher;
pub mod surface;

pub use aggregate::aggregate;
pub use contribution::{Contribution, Contributor, DocumentAlterer, Payload};
pub use error::{ContentProductionError, PublishError, SurfaceError};
pub use exhibition::{Exhibition, ExhibitionOptions};
pub use publisher::{
    PublishCycle, PublishReport, PublishedRender, Publisher, PublisherConfig, PublisherState,
    SettleOutcome,
};
pub use surface::{LoadNotifier, LoadSignal, RenderSurface, ResourceHandle, RootMetrics};
