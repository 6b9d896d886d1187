//! Preview server: the current render, live resources, and an update trigger.

mod middleware;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{Exhibition, PublisherState, ResourceHandle, error::HttpError},
    infra::{error::InfraError, surface::MemorySurface},
};

use self::middleware::{log_responses, set_request_context};

const TARGET: &str = "infra::http";

#[derive(Clone)]
pub struct PreviewState {
    pub exhibition: Arc<Exhibition>,
    pub surface: Arc<MemorySurface>,
}

pub fn build_router(state: PreviewState) -> Router {
    Router::new()
        .route("/", get(current_render))
        .route("/renders/{id}", get(render_by_id))
        .route("/update", post(update))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Bind `addr` and serve the preview router until the listener fails.
pub async fn serve(addr: SocketAddr, state: PreviewState) -> Result<(), InfraError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| InfraError::bind(addr, err))?;
    info!(
        target = TARGET,
        op = "http::serve",
        addr = %addr,
        "Preview server listening"
    );
    axum::serve(listener, build_router(state).into_make_service()).await?;
    Ok(())
}

async fn current_render(State(state): State<PreviewState>) -> Response {
    match state.surface.current_html() {
        Some(html) => Html(html.to_string()).into_response(),
        None => HttpError::new(
            "infra::http::current_render",
            StatusCode::NOT_FOUND,
            "Nothing published yet",
            "no render has been installed on the surface",
        )
        .into_response(),
    }
}

async fn render_by_id(State(state): State<PreviewState>, Path(id): Path<Uuid>) -> Response {
    let handle = ResourceHandle::from_uuid(id);
    match state.surface.resource(&handle) {
        Some(html) => Html(html.to_string()).into_response(),
        None => HttpError::new(
            "infra::http::render_by_id",
            StatusCode::GONE,
            "Render revoked",
            format!("resource `{handle}` is not live"),
        )
        .into_response(),
    }
}

async fn update(State(state): State<PreviewState>) -> Response {
    match state.exhibition.request_update().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Serialize)]
struct HealthView {
    state: PublisherState,
    current: Option<ResourceHandle>,
    live_resources: usize,
    height: Option<u32>,
}

async fn health(State(state): State<PreviewState>) -> Json<HealthView> {
    Json(HealthView {
        state: state.exhibition.publisher().state(),
        current: state.surface.current_target(),
        live_resources: state.surface.live_count(),
        height: state.surface.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    use crate::{
        application::{
            ContentProductionError, Contributor, ExhibitionOptions, Publisher, PublisherConfig,
            RenderSurface,
        },
        domain::value::ContentValue,
    };

    struct Toggle {
        failing: AtomicBool,
    }

    #[async_trait]
    impl Contributor for Toggle {
        async fn produce_value(&self) -> Result<ContentValue, ContentProductionError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(ContentProductionError::empty_transform("toggle"))
            } else {
                Ok(ContentValue::markup("<p>hello</p>"))
            }
        }

        fn priority(&self) -> i32 {
            0
        }
    }

    fn preview() -> (PreviewState, Arc<Toggle>) {
        let surface = Arc::new(MemorySurface::default());
        let publisher = Arc::new(Publisher::new(
            Arc::clone(&surface) as Arc<dyn RenderSurface>,
            PublisherConfig::default(),
        ));
        let toggle = Arc::new(Toggle {
            failing: AtomicBool::new(false),
        });
        let exhibition = Exhibition::with_contributors(
            publisher,
            ExhibitionOptions::default(),
            [Arc::clone(&toggle) as Arc<dyn Contributor>],
        );
        (
            PreviewState {
                exhibition: Arc::new(exhibition),
                surface,
            },
            toggle,
        )
    }

    async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn index_is_not_found_before_first_publish() {
        let (state, _) = preview();
        let router = build_router(state);
        let (status, _) = send(&router, "GET", "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_publishes_and_revokes_previous_render() {
        let (state, _) = preview();
        let router = build_router(state.clone());

        let (status, body) = send(&router, "POST", "/update").await;
        assert_eq!(status, StatusCode::OK);
        let report: serde_json::Value = serde_json::from_str(&body).expect("json report");
        assert_eq!(report["contributions"], 1);
        assert_eq!(report["settle"]["outcome"], "loaded");
        let first = state.surface.current_target().expect("installed");

        let (status, html) = send(&router, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<body><p>hello</p></body>"));

        send(&router, "POST", "/update").await;
        let (status, _) = send(&router, "GET", &format!("/renders/{}", first.id())).await;
        assert_eq!(status, StatusCode::GONE);

        let second = state.surface.current_target().expect("installed");
        let (status, _) = send(&router, "GET", &format!("/renders/{}", second.id())).await;
        assert_eq!(status, StatusCode::OK);

        let (_, health) = send(&router, "GET", "/health").await;
        let health: serde_json::Value = serde_json::from_str(&health).expect("json health");
        assert_eq!(health["state"], "idle");
        assert_eq!(health["live_resources"], 1);
    }

    #[tokio::test]
    async fn production_failure_is_unprocessable() {
        let (state, toggle) = preview();
        let router = build_router(state.clone());
        send(&router, "POST", "/update").await;
        let installed = state.surface.current_target();

        toggle.failing.store(true, Ordering::SeqCst);
        let (status, _) = send(&router, "POST", "/update").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.surface.current_target(), installed);
    }

    #[tokio::test]
    async fn detached_surface_is_unavailable() {
        let (state, _) = preview();
        let router = build_router(state.clone());
        state.surface.detach();
        let (status, _) = send(&router, "POST", "/update").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn serve_reports_an_address_already_in_use() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = taken.local_addr().expect("local addr");
        let (state, _) = preview();

        match serve(addr, state).await {
            Err(InfraError::Bind { addr: failed, .. }) => assert_eq!(failed, addr),
            other => panic!("expected bind error, got {other:?}"),
        }
    }
}
