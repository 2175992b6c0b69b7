//! Product request handlers.
//!
//! Each handler returns a logical [`HandlerResponse`]. Reads are wrapped by the read-through
//! cache through [`ProductRoute`]; writes run the invalidation trigger once the store has
//! acknowledged them and before the response is produced.

use super::model::{Product, ProductFilter, ProductInput, ProductPatch};
use super::repository::{ProductRepository, StoreError};
use crate::caching::{InvalidationManager, ResourceHandler};
use crate::core::error::AppError;
use crate::core::types::{HandlerResponse, ResourceRequest};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Collection path every product key lives under
pub const PRODUCTS_COLLECTION: &str = "/products";

/// Product handlers
pub struct ProductHandlers {
    repo: Arc<dyn ProductRepository>,
    invalidation: Arc<InvalidationManager>,
    expose_errors: bool,
}

impl ProductHandlers {
    pub fn new(
        repo: Arc<dyn ProductRepository>,
        invalidation: Arc<InvalidationManager>,
        expose_errors: bool,
    ) -> Self {
        Self {
            repo,
            invalidation,
            expose_errors,
        }
    }

    /// `GET /products` with optional filters
    pub async fn get_all(&self, request: &ResourceRequest) -> HandlerResponse {
        let filter = match ProductFilter::from_query(&request.query_params()) {
            Ok(filter) => filter,
            Err(errors) => return self.error(AppError::validation(errors)),
        };

        match self.repo.find(&filter).await {
            Ok(products) => list(&products),
            Err(e) => self.fail(e, "Failed to fetch products"),
        }
    }

    /// `GET /products/:id`
    pub async fn get_by_id(&self, id: &str) -> HandlerResponse {
        match self.repo.find_by_id(id).await {
            Ok(product) => single(StatusCode::OK, &product),
            Err(e) => self.fail(e, "Failed to fetch product"),
        }
    }

    /// `GET /products/category/:category`
    pub async fn get_by_category(&self, category: &str) -> HandlerResponse {
        match self.repo.find(&ProductFilter::by_category(category)).await {
            Ok(products) => list(&products),
            Err(e) => self.fail(e, "Failed to fetch products by category"),
        }
    }

    /// `POST /products`
    pub async fn create(&self, body: &Value) -> HandlerResponse {
        let input = match ProductInput::from_json(body) {
            Ok(input) => input,
            Err(errors) => return self.error(AppError::validation(errors)),
        };

        match self.repo.insert(input).await {
            Ok(product) => {
                info!(product_id = %product.id, "Product created");
                self.invalidation.on_created(PRODUCTS_COLLECTION).await;
                single(StatusCode::CREATED, &product)
            }
            Err(e) => self.fail(e, "Failed to create product"),
        }
    }

    /// `PUT /products/:id`
    pub async fn update(&self, id: &str, body: &Value) -> HandlerResponse {
        let patch = match ProductPatch::from_json(body) {
            Ok(patch) => patch,
            Err(errors) => return self.error(AppError::validation(errors)),
        };

        match self.repo.update(id, patch).await {
            Ok(product) => {
                info!(product_id = %product.id, "Product updated");
                self.invalidation.on_updated(PRODUCTS_COLLECTION, id).await;
                single(StatusCode::OK, &product)
            }
            Err(e) => self.fail(e, "Failed to update product"),
        }
    }

    /// `DELETE /products/:id`
    pub async fn delete(&self, id: &str) -> HandlerResponse {
        match self.repo.delete(id).await {
            Ok(product) => {
                info!(product_id = %product.id, "Product deleted");
                self.invalidation.on_deleted(PRODUCTS_COLLECTION, id).await;
                HandlerResponse::ok(json!({
                    "message": "Product deleted successfully",
                    "product": product.document(),
                }))
            }
            Err(e) => self.fail(e, "Failed to delete product"),
        }
    }

    fn fail(&self, err: StoreError, context: &str) -> HandlerResponse {
        let app_error = match err {
            StoreError::NotFound => AppError::not_found("Product"),
            StoreError::InvalidIdentifier(_) => AppError::invalid_id("product"),
            StoreError::ValidationFailed(errors) => AppError::validation(errors),
            StoreError::Backend(detail) => {
                error!(error = %detail, "{}", context);
                AppError::internal(context, detail)
            }
        };
        self.error(app_error)
    }

    fn error(&self, err: AppError) -> HandlerResponse {
        err.to_handler_response(self.expose_errors)
    }
}

fn single(status: StatusCode, product: &Product) -> HandlerResponse {
    HandlerResponse::new(status, json!(product.document()))
}

fn list(products: &[Product]) -> HandlerResponse {
    HandlerResponse::ok(Value::Array(
        products.iter().map(|p| json!(p.document())).collect(),
    ))
}

/// Which cached read a [`ProductRoute`] serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAction {
    List,
    ByCategory,
    ById,
}

/// A product read exposed as a [`ResourceHandler`] so it can be wrapped by the cache
pub struct ProductRoute {
    handlers: Arc<ProductHandlers>,
    action: ReadAction,
}

impl ProductRoute {
    pub fn new(handlers: Arc<ProductHandlers>, action: ReadAction) -> Self {
        Self { handlers, action }
    }
}

#[async_trait]
impl ResourceHandler for ProductRoute {
    async fn handle(&self, request: ResourceRequest) -> HandlerResponse {
        match self.action {
            ReadAction::List => self.handlers.get_all(&request).await,
            ReadAction::ByCategory => {
                self.handlers
                    .get_by_category(request.param("category").unwrap_or_default())
                    .await
            }
            ReadAction::ById => {
                self.handlers
                    .get_by_id(request.param("id").unwrap_or_default())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::stores::InMemoryCache;
    use crate::caching::{CacheManager, CacheStore, KeyGenerator};
    use crate::products::repository::{InMemoryProductRepository, StoreResult};
    use axum::http::{Method, Uri};
    use std::time::Duration;

    struct FailingRepository;

    #[async_trait]
    impl ProductRepository for FailingRepository {
        async fn find(&self, _filter: &ProductFilter) -> StoreResult<Vec<Product>> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn find_by_id(&self, _id: &str) -> StoreResult<Product> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn insert(&self, _input: ProductInput) -> StoreResult<Product> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn update(&self, _id: &str, _patch: ProductPatch) -> StoreResult<Product> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _id: &str) -> StoreResult<Product> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    fn handlers_with(
        repo: Arc<dyn ProductRepository>,
        expose_errors: bool,
    ) -> (Arc<InMemoryCache>, ProductHandlers) {
        let memory = Arc::new(InMemoryCache::new());
        let cache = Arc::new(CacheManager::new(memory.clone(), Duration::from_secs(1)));
        let invalidation = Arc::new(InvalidationManager::new(
            cache,
            Arc::new(KeyGenerator::default()),
        ));
        (memory, ProductHandlers::new(repo, invalidation, expose_errors))
    }

    fn hammer() -> Value {
        json!({ "name": "Hammer", "price": 12.5, "category": "tools" })
    }

    #[tokio::test]
    async fn test_create_returns_document_and_invalidates() {
        let (memory, handlers) = handlers_with(Arc::new(InMemoryProductRepository::new()), true);
        memory
            .set("api:/products", b"[]", Duration::from_secs(60))
            .await
            .unwrap();

        let response = handlers.create(&hammer()).await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body["name"], "Hammer");
        assert_eq!(response.body["formattedPrice"], "$12.50");
        assert_eq!(response.body["inStock"], true);
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let (_, handlers) = handlers_with(Arc::new(InMemoryProductRepository::new()), true);

        let response = handlers.create(&json!({ "price": 3 })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["message"], "Validation Error");
        assert_eq!(
            response.body["errors"],
            json!(["Product name is required", "Product category is required"])
        );
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let (_, handlers) = handlers_with(Arc::new(InMemoryProductRepository::new()), true);

        let response = handlers.get_by_id("nope").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["message"], "Invalid product ID format");

        let response = handlers.get_by_id(&uuid::Uuid::new_v4().to_string()).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body["message"], "Product not found");
    }

    #[tokio::test]
    async fn test_update_and_delete_invalidate_item_and_collection() {
        let (memory, handlers) = handlers_with(Arc::new(InMemoryProductRepository::new()), true);
        let created = handlers.create(&hammer()).await;
        let id = created.body["id"].as_str().unwrap().to_string();

        let ttl = Duration::from_secs(60);
        let item_key = format!("api:/products/{}", id);
        memory.set(&item_key, b"{}", ttl).await.unwrap();
        memory.set("api:/products/category/tools", b"[]", ttl).await.unwrap();

        let response = handlers.update(&id, &json!({ "price": 20 })).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["formattedPrice"], "$20.00");
        assert!(memory.is_empty());

        memory.set(&item_key, b"{}", ttl).await.unwrap();
        let response = handlers.delete(&id).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["message"], "Product deleted successfully");
        assert_eq!(response.body["product"]["id"], id.as_str());
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_detail_respects_environment() {
        let (_, handlers) = handlers_with(Arc::new(FailingRepository), false);
        let response = handlers.get_by_category("tools").await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body["message"], "Failed to fetch products by category");
        assert!(response.body.get("error").is_none());

        let (_, handlers) = handlers_with(Arc::new(FailingRepository), true);
        let response = handlers.delete("x").await;
        assert_eq!(response.body["message"], "Failed to delete product");
        assert_eq!(response.body["error"], "connection refused");
    }

    #[tokio::test]
    async fn test_failed_write_does_not_invalidate() {
        let (memory, handlers) = handlers_with(Arc::new(FailingRepository), true);
        memory
            .set("api:/products", b"[]", Duration::from_secs(60))
            .await
            .unwrap();

        let response = handlers.create(&hammer()).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(memory.contains_key("api:/products"));
    }

    #[tokio::test]
    async fn test_route_dispatch() {
        let (_, handlers) = handlers_with(Arc::new(InMemoryProductRepository::new()), true);
        let handlers = Arc::new(handlers);
        handlers.create(&hammer()).await;

        let route = ProductRoute::new(handlers.clone(), ReadAction::ByCategory);
        let request = ResourceRequest::new(Method::GET, Uri::from_static("/products/category/tools"))
            .with_param("category", "tools");
        let response = route.handle(request).await;
        assert_eq!(response.body.as_array().unwrap().len(), 1);

        let route = ProductRoute::new(handlers, ReadAction::List);
        let request =
            ResourceRequest::new(Method::GET, Uri::from_static("/products?maxPrice=cheap"));
        assert_eq!(route.handle(request).await.status, StatusCode::BAD_REQUEST);
    }
}
