//! # HTTP Server Module
//!
//! Wires the product handlers, the read-through cache and the admin endpoints into one axum
//! application and serves it.
//!
//! Cached reads go through [`ReadThrough::respond`], which adds the `X-Cache` header. Writes
//! call the handlers directly; invalidation happens inside them.

use crate::caching::{
    CacheAdminRouter, CacheAdminState, CacheManager, CachePolicy, CacheStore,
    InvalidationManager, KeyGenerator, ReadThrough,
};
use crate::core::config::AppConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{HandlerResponse, ResourceRequest};
use crate::observability::metrics::metrics_router;
use crate::products::{ProductHandlers, ProductRepository, ProductRoute, ReadAction};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router as AxumRouter,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

type CachedRoute = Arc<ReadThrough<ProductRoute>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: Arc<CacheManager>,
    pub keys: Arc<KeyGenerator>,
    pub invalidation: Arc<InvalidationManager>,
    pub handlers: Arc<ProductHandlers>,
    list_route: CachedRoute,
    category_route: CachedRoute,
    item_route: CachedRoute,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the cache adapter, key generator, invalidation trigger and cached routes
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn CacheStore>,
        repo: Arc<dyn ProductRepository>,
    ) -> Self {
        let cache = Arc::new(CacheManager::new(store, config.cache.operation_timeout));
        let keys = Arc::new(KeyGenerator::new(
            config.cache.key_namespace.clone(),
            config.cache.key_strategy,
        ));
        let invalidation = Arc::new(InvalidationManager::new(cache.clone(), keys.clone()));
        let handlers = Arc::new(ProductHandlers::new(
            repo,
            invalidation.clone(),
            config.server.environment.exposes_error_details(),
        ));

        let routes = &config.cache.routes;
        let cached = |action: ReadAction, ttl: Duration| {
            let policy = CachePolicy {
                enabled: config.cache.enabled,
                ..CachePolicy::with_ttl(ttl)
            };
            Arc::new(ReadThrough::new(
                ProductRoute::new(handlers.clone(), action),
                cache.clone(),
                keys.clone(),
                policy,
            ))
        };

        Self {
            config: Arc::new(config.clone()),
            list_route: cached(ReadAction::List, routes.list),
            category_route: cached(ReadAction::ByCategory, routes.by_category),
            item_route: cached(ReadAction::ById, routes.by_id),
            cache,
            keys,
            invalidation,
            handlers,
            metrics: None,
        }
    }

    /// Expose the Prometheus exposition endpoint
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    fn expose_errors(&self) -> bool {
        self.config.server.environment.exposes_error_details()
    }
}

/// Build the complete axum application
pub fn build_router(state: AppState) -> AxumRouter {
    let admin = CacheAdminRouter::create_router(CacheAdminState {
        cache_manager: state.cache.clone(),
        invalidation_manager: state.invalidation.clone(),
    });

    let mut app = AxumRouter::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/products", get(list_products).post(create_product))
        .route("/products/category/:category", get(products_by_category))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .fallback(route_not_found)
        .with_state(state.clone())
        .merge(admin);

    if let Some(handle) = state.metrics.clone() {
        app = app.merge(metrics_router(
            handle,
            &state.config.observability.metrics.endpoint_path,
        ));
    }

    app = app.layer(TraceLayer::new_for_http());

    if state.config.server.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

/// HTTP server
pub struct AppServer {
    app: AxumRouter,
    bind_address: String,
    port: u16,
}

impl AppServer {
    pub fn new(state: AppState) -> Self {
        let bind_address = state.config.server.bind_address.clone();
        let port = state.config.server.port;
        Self {
            app: build_router(state),
            bind_address,
            port,
        }
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind((self.bind_address.as_str(), self.port))
            .await
            .map_err(|e| {
                AppError::config(format!(
                    "Failed to bind {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })?;

        let addr: Option<SocketAddr> = listener.local_addr().ok();
        info!(addr = ?addr, "HTTP server listening");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "message": "Smart Caching API System",
        "endpoints": {
            "products": "/products",
        },
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "environment": state.config.server.environment,
        "cache": {
            "backend": state.cache.backend(),
            "available": state.cache.is_available(),
        },
        "timestamp": chrono::Utc::now(),
    }))
}

async fn list_products(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    state
        .list_route
        .respond(ResourceRequest::new(method, uri))
        .await
}

async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    method: Method,
    uri: Uri,
) -> Response {
    state
        .category_route
        .respond(ResourceRequest::new(method, uri).with_param("category", category))
        .await
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
) -> Response {
    state
        .item_route
        .respond(ResourceRequest::new(method, uri).with_param("id", id))
        .await
}

async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResponse {
    match body {
        Ok(Json(body)) => state.handlers.create(&body).await,
        Err(rejection) => invalid_body(&state, rejection),
    }
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> HandlerResponse {
    match body {
        Ok(Json(body)) => state.handlers.update(&id, &body).await,
        Err(rejection) => invalid_body(&state, rejection),
    }
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResponse {
    state.handlers.delete(&id).await
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found" })),
    )
}

fn invalid_body(state: &AppState, rejection: JsonRejection) -> HandlerResponse {
    AppError::validation([rejection.body_text()]).to_handler_response(state.expose_errors())
}
