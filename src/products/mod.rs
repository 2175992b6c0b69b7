//! # Products Module
//!
//! The product resource: document model and validation, the document-store boundary, and
//! the HTTP-facing handlers whose reads are served through the response cache.

pub mod handlers;
pub mod model;
pub mod repository;

pub use handlers::{ProductHandlers, ProductRoute, ReadAction, PRODUCTS_COLLECTION};
pub use model::{Product, ProductDocument, ProductFilter, ProductInput, ProductPatch};
pub use repository::{InMemoryProductRepository, ProductRepository, StoreError, StoreResult};
