use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::Application;

pub const SERVICE_NAME: &str = "TechPro Assist";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Components {
    pub data_store: bool,
    pub graph_db: bool,
    pub rag_pipeline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub components: Components,
    pub graph_backend: &'static str,
    pub llm: &'static str,
    pub indexed_chunks: usize,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo { status: "healthy", service: SERVICE_NAME, version: env!("CARGO_PKG_VERSION") })
}

/// Degraded when there is no catalog or nothing indexed to retrieve from.
/// `graph_db` is informational; comparisons fall back to the catalog.
pub async fn health(State(app): State<Arc<Application>>) -> (StatusCode, Json<HealthResponse>) {
    let counts = app.store.counts().await;
    let indexed_chunks = app.rag.stats().await.vector_store.total_documents;
    let components = Components {
        data_store: counts.products > 0,
        graph_db: app.graph.has_primary(),
        rag_pipeline: indexed_chunks > 0,
    };
    let ready = components.data_store && components.rag_pipeline;

    let payload = HealthResponse {
        status: if ready { "healthy" } else { "degraded" },
        components,
        graph_backend: app.graph.backend_name(),
        llm: app.llm.client_name(),
        indexed_chunks,
        active_sessions: app.orchestrator.memory().session_count().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};

    use super::{health, root, SERVICE_NAME};
    use crate::bootstrap::testing::offline_application;

    #[tokio::test]
    async fn root_reports_service_identity() {
        let Json(info) = root().await;
        assert_eq!(info.status, "healthy");
        assert_eq!(info.service, SERVICE_NAME);
    }

    #[tokio::test]
    async fn health_is_ready_with_demo_data() {
        let (app, _dir) = offline_application().await;

        let (status, Json(payload)) = health(State(Arc::new(app))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy");
        assert!(payload.components.data_store);
        assert!(payload.components.rag_pipeline);
        assert!(!payload.components.graph_db, "offline app has no graph database");
        assert_eq!(payload.graph_backend, "catalog");
        assert_eq!(payload.llm, "offline");
        assert_eq!(payload.active_sessions, 0);
    }
}
