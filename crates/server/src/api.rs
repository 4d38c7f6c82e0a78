use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};
use tracing::{info, warn};
use uuid::Uuid;

use techpro_core::{
    ChatRequest, ChatResponse, Complaint, Delivery, InterfaceError, Order, OrderId, Product,
    ProductId, Refund,
};
use techpro_db::ProductComparison;

use crate::bootstrap::Application;
use crate::health;

pub const MIN_COMPARED_PRODUCTS: usize = 2;

type AppState = Arc<Application>;
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Error body shared by every endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        let status = match &error {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, detail: error.message().to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

fn reject(error: InterfaceError) -> ApiError {
    warn!(
        event_name = "api.request.rejected",
        correlation_id = %error.correlation_id(),
        error = %error,
        "request rejected"
    );
    ApiError::from(error)
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn bad_request(message: impl Into<String>) -> ApiError {
    reject(InterfaceError::BadRequest { message: message.into(), correlation_id: correlation_id() })
}

fn not_found(message: impl Into<String>) -> ApiError {
    reject(InterfaceError::NotFound { message: message.into(), correlation_id: correlation_id() })
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompatibleProducts {
    pub product_id: ProductId,
    pub products: Vec<Product>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompareQuery {
    pub ids: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ComplaintRequest {
    pub order_id: String,
    pub issue: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComplaintResponse {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum RefundLookup {
    Found(Refund),
    Missing { order_id: String, status: &'static str, message: &'static str },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total_products: usize,
    pub total_orders: usize,
    pub total_complaints: usize,
    pub total_refunds: usize,
    pub active_sessions: usize,
}

pub fn router(app: Arc<Application>) -> Router {
    let cors = cors_layer(&app.config.server.allowed_origins);
    let static_dir = app.config.server.static_dir.clone();

    let router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/chat", post(chat))
        .route("/api/products", get(list_products))
        .route("/api/products/compare", get(compare_products))
        .route("/api/products/{product_id}", get(get_product))
        .route("/api/products/{product_id}/compatible", get(compatible_products))
        .route("/api/orders/{order_id}", get(get_order))
        .route("/api/complaints", post(create_complaint))
        .route("/api/refunds/{order_id}", get(get_refund))
        .route("/api/delivery/{order_id}", get(get_delivery))
        .route("/api/metrics", get(metrics))
        .with_state(app);

    let router = match static_dir {
        Some(dir) => {
            info!(event_name = "api.static.enabled", dir = %dir.display(), "serving front-end assets");
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    };
    router.layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(event_name = "api.cors.invalid_origin", origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub async fn chat(
    State(app): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    if request.message.trim().is_empty() {
        return Err(bad_request("Message must not be empty"));
    }
    if request.session_id.trim().is_empty() {
        return Err(bad_request("Session ID must not be empty"));
    }

    info!(event_name = "api.chat.received", session_id = %request.session_id, "chat request");
    let response = app.orchestrator.process_message(&request.message, &request.session_id).await;
    info!(
        event_name = "api.chat.answered",
        session_id = %request.session_id,
        intent = %response.intent,
        "chat response generated"
    );
    Ok(Json(response))
}

/// Every filter is optional; no query string lists the whole catalog.
pub async fn list_products(
    State(app): State<AppState>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
) -> ApiResult<ProductList> {
    let Query(filter) = filter.map_err(|rejection| bad_request(rejection.body_text()))?;
    let products = app
        .store
        .search_products(filter.category.as_deref(), filter.min_price, filter.max_price)
        .await;
    Ok(Json(ProductList { products }))
}

/// Parses `ids=1,2,3`; every entry must be an integer.
pub fn parse_product_ids(raw: &str) -> Option<Vec<ProductId>> {
    raw.split(',').map(|id| id.trim().parse::<u32>().ok().map(ProductId)).collect()
}

pub async fn compare_products(
    State(app): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<ProductComparison> {
    let ids = query
        .ids
        .as_deref()
        .and_then(parse_product_ids)
        .ok_or_else(|| bad_request("Invalid product IDs"))?;
    if ids.len() < MIN_COMPARED_PRODUCTS {
        return Err(bad_request("At least 2 product IDs required for comparison"));
    }

    Ok(Json(app.graph.compare_products(&ids).await))
}

fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.trim().parse::<u32>().map(ProductId).map_err(|_| bad_request("Invalid product ID"))
}

pub async fn get_product(
    State(app): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Product> {
    let id = parse_product_id(&product_id)?;
    app.store.product(id).await.map(Json).ok_or_else(|| not_found("Product not found"))
}

pub async fn compatible_products(
    State(app): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<CompatibleProducts> {
    let id = parse_product_id(&product_id)?;
    if app.store.product(id).await.is_none() {
        return Err(not_found("Product not found"));
    }
    let products = app.graph.find_compatible_products(id).await;
    Ok(Json(CompatibleProducts { product_id: id, products }))
}

pub async fn get_order(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Order> {
    app.store.order(&OrderId(order_id)).await.map(Json).ok_or_else(|| not_found("Order not found"))
}

pub async fn create_complaint(
    State(app): State<AppState>,
    payload: Result<Json<ComplaintRequest>, JsonRejection>,
) -> ApiResult<ComplaintResponse> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    let order_id = OrderId(request.order_id);
    if app.store.order(&order_id).await.is_none() {
        return Err(not_found("Order not found"));
    }

    let complaint =
        app.store.create_complaint(&order_id, &request.issue, &request.description).await;
    info!(
        event_name = "api.complaint.created",
        complaint_id = %complaint.complaint_id.0,
        order_id = %order_id,
        "complaint created"
    );
    let message = format!(
        "Complaint {} has been created. Our support team will contact you within 24 hours.",
        complaint.complaint_id.0
    );
    Ok(Json(ComplaintResponse { complaint, message }))
}

pub async fn get_refund(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> Json<RefundLookup> {
    match app.store.refund(&OrderId(order_id.clone())).await {
        Some(refund) => Json(RefundLookup::Found(refund)),
        None => Json(RefundLookup::Missing {
            order_id,
            status: "not_found",
            message: "No refund request found for this order",
        }),
    }
}

pub async fn get_delivery(
    State(app): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Delivery> {
    app.store
        .delivery(&OrderId(order_id))
        .await
        .map(Json)
        .ok_or_else(|| not_found("Delivery information not found"))
}

pub async fn metrics(State(app): State<AppState>) -> Json<Metrics> {
    let counts = app.store.counts().await;
    Json(Metrics {
        total_products: counts.products,
        total_orders: counts.orders,
        total_complaints: counts.complaints,
        total_refunds: counts.refunds,
        active_sessions: app.orchestrator.memory().session_count().await,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::{parse_product_ids, router};
    use crate::bootstrap::testing::offline_application;
    use techpro_core::ProductId;

    async fn app() -> (Router, TempDir) {
        let (app, dir) = offline_application().await;
        (router(Arc::new(app)), dir)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[test]
    fn product_id_lists_must_be_all_integers() {
        assert_eq!(parse_product_ids("1, 2,3"), Some(vec![ProductId(1), ProductId(2), ProductId(3)]));
        assert_eq!(parse_product_ids("1,abc"), None);
        assert_eq!(parse_product_ids(""), None);
    }

    #[tokio::test]
    async fn known_order_returns_record_and_unknown_is_404() {
        let (router, _dir) = app().await;

        let (status, body) = send(&router, get("/api/orders/ORD-1001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order_id"], json!("ORD-1001"));
        assert_eq!(body["status"], json!("shipped"));
        assert_eq!(body["total"], json!(1349.98));

        let (status, body) = send(&router, get("/api/orders/ORD-9999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Order not found"}));
    }

    #[tokio::test]
    async fn product_endpoints_list_fetch_and_compare() {
        let (router, _dir) = app().await;

        let (status, body) = send(&router, get("/api/products")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().map(Vec::len), Some(12));

        let (status, body) = send(&router, get("/api/products/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], json!("TechPro UltraBook 14"));

        let (status, body) = send(&router, get("/api/products/404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], json!("Product not found"));

        let (status, body) = send(&router, get("/api/products/compare?ids=1,2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().map(Vec::len), Some(2));
        assert!(body["comparison"].as_array().is_some_and(|rows| !rows.is_empty()));
        assert!(body["recommendation"].is_string());
    }

    #[tokio::test]
    async fn product_listing_filters_by_category_and_price() {
        let (router, _dir) = app().await;

        let (status, body) = send(&router, get("/api/products?category=Laptops")).await;
        assert_eq!(status, StatusCode::OK);
        let laptops = body["products"].as_array().cloned().unwrap_or_default();
        assert!(!laptops.is_empty());
        assert!(laptops.iter().all(|product| product["category"] == json!("Laptops")));

        let (_, body) = send(&router, get("/api/products?category=Laptops&max_price=1")).await;
        assert_eq!(body["products"], json!([]));

        let (status, body) = send(&router, get("/api/products?min_price=cheap")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn compatible_accessories_come_from_the_catalog_graph() {
        let (router, _dir) = app().await;

        let (status, body) = send(&router, get("/api/products/1/compatible")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product_id"], json!(1));
        assert!(body["products"].is_array());

        let (status, _) = send(&router, get("/api/products/999/compatible")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn compare_rejects_bad_id_lists() {
        let (router, _dir) = app().await;

        let (status, body) = send(&router, get("/api/products/compare?ids=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], json!("At least 2 product IDs required for comparison"));

        let (status, body) = send(&router, get("/api/products/compare?ids=1,x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], json!("Invalid product IDs"));
    }

    #[tokio::test]
    async fn chat_routes_through_the_orchestrator_and_counts_sessions() {
        let (router, _dir) = app().await;

        let (status, body) = send(
            &router,
            post_json("/api/chat", json!({"message": "Track order ORD-1002", "session_id": "web-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], json!("order_status"));
        assert_eq!(body["response"], json!("Order ORD-1002 is currently delivered. Expected delivery: 2024-01-14"));

        let (_, metrics) = send(&router, get("/api/metrics")).await;
        assert_eq!(metrics["active_sessions"], json!(1));
        assert_eq!(metrics["total_products"], json!(12));
        assert_eq!(metrics["total_orders"], json!(5));
    }

    #[tokio::test]
    async fn chat_rejects_blank_messages_and_malformed_bodies() {
        let (router, _dir) = app().await;

        let (status, body) =
            send(&router, post_json("/api/chat", json!({"message": "  ", "session_id": "s"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], json!("Message must not be empty"));

        let (status, body) = send(&router, post_json("/api/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn complaints_refunds_and_deliveries() {
        let (router, _dir) = app().await;

        let (status, body) = send(
            &router,
            post_json(
                "/api/complaints",
                json!({"order_id": "ORD-1003", "issue": "Late", "description": "Still processing"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["complaint_id"], json!("CMP-101"));
        assert_eq!(body["status"], json!("open"));
        assert!(body["message"].as_str().is_some_and(|message| message.contains("CMP-101")));

        let (status, _) = send(
            &router,
            post_json(
                "/api/complaints",
                json!({"order_id": "ORD-0000", "issue": "x", "description": "y"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, refund) = send(&router, get("/api/refunds/ORD-1004")).await;
        assert_eq!(refund["status"], json!("approved"));
        let (status, missing) = send(&router, get("/api/refunds/ORD-1001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(missing["status"], json!("not_found"));
        assert_eq!(missing["message"], json!("No refund request found for this order"));

        let (status, delivery) = send(&router, get("/api/delivery/ORD-1001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(delivery["carrier"], json!("FedEx"));
        let (status, body) = send(&router, get("/api/delivery/ORD-1003")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], json!("Delivery information not found"));
    }

    #[tokio::test]
    async fn cors_allows_the_configured_front_end() {
        let (router, _dir) = app().await;

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .expect("request");
        let response = router.clone().oneshot(request).await.expect("response");

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("http://localhost:3000")
        );
    }
}
