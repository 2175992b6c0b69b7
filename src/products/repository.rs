//! Product persistence.
//!
//! [`ProductRepository`] is the document-store boundary. Failures are typed as
//! [`StoreError`] so handlers can map them to responses without inspecting messages.

use super::model::{Product, ProductFilter, ProductInput, ProductPatch};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("validation failed: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Document store for products
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products matching the filter, oldest first
    async fn find(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Product>;

    async fn insert(&self, input: ProductInput) -> StoreResult<Product>;

    /// Apply a partial update, re-validating the merged document
    async fn update(&self, id: &str, patch: ProductPatch) -> StoreResult<Product>;

    /// Remove a product, returning the removed document
    async fn delete(&self, id: &str) -> StoreResult<Product>;
}

#[derive(Debug, Clone)]
struct Record {
    seq: u64,
    product: Product,
}

/// In-process document store
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    records: DashMap<Uuid, Record>,
    next_seq: AtomicU64,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| StoreError::InvalidIdentifier(id.to_string()))
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut matched: Vec<(u64, Product)> = self
            .records
            .iter()
            .filter(|record| filter.matches(&record.product))
            .map(|record| (record.seq, record.product.clone()))
            .collect();
        matched.sort_by_key(|(seq, _)| *seq);

        Ok(matched.into_iter().map(|(_, product)| product).collect())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Product> {
        let id = parse_id(id)?;
        self.records
            .get(&id)
            .map(|record| record.product.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, input: ProductInput) -> StoreResult<Product> {
        let input = input.validate().map_err(StoreError::ValidationFailed)?;
        let product = Product::create(input);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        self.records.insert(
            product.id,
            Record {
                seq,
                product: product.clone(),
            },
        );
        Ok(product)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> StoreResult<Product> {
        let id = parse_id(id)?;
        let mut record = self.records.get_mut(&id).ok_or(StoreError::NotFound)?;

        let input = patch
            .apply_to(&record.product)
            .map_err(StoreError::ValidationFailed)?;
        record.product.apply(input);
        Ok(record.product.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<Product> {
        let id = parse_id(id)?;
        self.records
            .remove(&id)
            .map(|(_, record)| record.product)
            .ok_or(StoreError::NotFound)
    }
}
