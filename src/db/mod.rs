use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::*;

#[cfg(test)]
pub mod memory;
mod mongo;

pub use mongo::MongoLifespan;

// ── Products ──────────────────────────────────────────────────────────────────

/// Document-store operations behind the product router.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: &Product) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// Matching products, newest first.
    async fn find_all(&self, filters: &ProductFilters) -> AppResult<Vec<Product>>;

    /// Applies the present fields of `changes`. `None` when no product has `id`.
    async fn update(&self, id: Uuid, changes: &UpdateProduct) -> AppResult<Option<Product>>;

    /// `false` when no product had `id`.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    async fn count(&self) -> AppResult<u64>;
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// Acquires the store before the server accepts requests and releases it
/// once the server has stopped.
#[async_trait]
pub trait Lifespan: Send + Sync {
    async fn startup(&self) -> AppResult<Arc<dyn ProductStore>>;

    /// No-op when `startup` never succeeded.
    async fn shutdown(&self) -> AppResult<()>;
}
