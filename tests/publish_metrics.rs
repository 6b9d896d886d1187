use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use exhibition::{
    application::{
        ContentProductionError, Contributor, Exhibition, ExhibitionOptions, Publisher,
        PublisherConfig, RenderSurface,
    },
    domain::value::ContentValue,
    infra::surface::MemorySurface,
};
use metrics_util::debugging::DebuggingRecorder;

/// Succeeds `budget` times, then fails.
struct Budgeted {
    budget: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Contributor for Budgeted {
    async fn produce_value(&self) -> Result<ContentValue, ContentProductionError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.budget {
            Ok(ContentValue::markup("<p>x</p>"))
        } else {
            Err(ContentProductionError::empty_transform("budgeted"))
        }
    }

    fn priority(&self) -> i32 {
        0
    }
}

#[tokio::test]
async fn publish_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let surface = Arc::new(MemorySurface::default());
    let exhibition = Exhibition::with_contributors(
        Arc::new(Publisher::new(
            Arc::clone(&surface) as Arc<dyn RenderSurface>,
            PublisherConfig::default(),
        )),
        ExhibitionOptions::default(),
        [Arc::new(Budgeted {
            budget: 2,
            calls: AtomicUsize::new(0),
        }) as Arc<dyn Contributor>],
    );

    exhibition.request_update().await.expect("first publish");
    exhibition.request_update().await.expect("second publish revokes the first");
    exhibition
        .request_update()
        .await
        .expect_err("third publish fails");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for expected in [
        "exhibition_publish_total",
        "exhibition_publish_failed_total",
        "exhibition_publish_ms",
        "exhibition_revoked_total",
    ] {
        assert!(names.contains(expected), "missing metric `{expected}`: {names:?}");
    }
}
