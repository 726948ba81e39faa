use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Lifespan, ProductStore};
use crate::error::{AppError, AppResult};
use crate::models::*;

/// Product store kept in a map, with the same filter and ordering rules as
/// the Mongo collection.
#[derive(Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<Uuid, Product>>,
    /// Makes `count` fail, standing in for a server that drops mid-startup.
    fail_count: bool,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(product: &Product, filters: &ProductFilters) -> bool {
    filters.min_price_cents.is_none_or(|min| product.price_cents >= min)
        && filters.max_price_cents.is_none_or(|max| product.price_cents <= max)
        && filters.status.is_none_or(|status| product.status == status)
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn insert(&self, product: &Product) -> AppResult<()> {
        self.products.write().await.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_all(&self, filters: &ProductFilters) -> AppResult<Vec<Product>> {
        let products = self.products.read().await;
        let mut found: Vec<Product> = products
            .values()
            .filter(|p| matches(p, filters))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(found
            .into_iter()
            .skip(filters.offset() as usize)
            .take(filters.limit() as usize)
            .collect())
    }

    async fn update(&self, id: Uuid, changes: &UpdateProduct) -> AppResult<Option<Product>> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            product.name = name.trim().to_string();
        }
        if let Some(quantity) = changes.quantity {
            product.quantity = quantity;
        }
        if let Some(price_cents) = changes.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(status) = changes.status {
            product.status = status;
        }
        product.updated_at = changes.updated_at();

        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> AppResult<u64> {
        if self.fail_count {
            return Err(AppError::Corrupt("count unavailable".to_string()));
        }
        Ok(self.products.read().await.len() as u64)
    }
}

/// Lifespan that hands out an in-memory store and records each hook call.
#[derive(Clone, Default)]
pub struct RecordingLifespan {
    pub events: Arc<Mutex<Vec<&'static str>>>,
    pub fail_startup: bool,
    pub fail_count: bool,
    pub fail_shutdown: bool,
}

impl RecordingLifespan {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Lifespan for RecordingLifespan {
    async fn startup(&self) -> AppResult<Arc<dyn ProductStore>> {
        self.events.lock().unwrap().push("startup");
        if self.fail_startup {
            return Err(AppError::Corrupt("startup refused".to_string()));
        }
        Ok(Arc::new(InMemoryProductStore {
            fail_count: self.fail_count,
            ..Default::default()
        }))
    }

    async fn shutdown(&self) -> AppResult<()> {
        self.events.lock().unwrap().push("shutdown");
        if self.fail_shutdown {
            return Err(AppError::Corrupt("shutdown refused".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, price_cents: i64, status: bool) -> Product {
        Product::new(CreateProduct {
            name: name.to_string(),
            quantity: 1,
            price_cents,
            status,
        })
    }

    #[tokio::test]
    async fn find_all_filters_by_price_range_and_status() {
        let store = InMemoryProductStore::new();
        for (name, price, status) in [
            ("Cheap", 1_000, true),
            ("Mid", 6_000, true),
            ("Mid inactive", 7_000, false),
            ("Pricey", 9_000, true),
        ] {
            store.insert(&create(name, price, status)).await.unwrap();
        }

        let filters = ProductFilters {
            min_price_cents: Some(5_000),
            max_price_cents: Some(8_000),
            ..Default::default()
        };
        assert_eq!(store.find_all(&filters).await.unwrap().len(), 2);

        let filters = ProductFilters { status: Some(true), ..filters };
        let found = store.find_all(&filters).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Mid");
    }

    #[tokio::test]
    async fn update_returns_the_same_product_with_new_fields() {
        let store = InMemoryProductStore::new();
        let original = create("Galaxy S23", 5_500, true);
        store.insert(&original).await.unwrap();

        let changes = UpdateProduct { quantity: Some(0), status: Some(false), ..Default::default() };
        let updated = store.update(original.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated, original, "an update keeps the product's identity");
        assert_eq!(updated.quantity, 0);
        assert!(!updated.status);
        assert_eq!(updated.created_at, original.created_at);

        let fetched = store.find_by_id(original.id).await.unwrap();
        assert_eq!(fetched, Some(updated));
        assert!(store.delete(original.id).await.unwrap());
        assert_eq!(store.find_by_id(original.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_missing_product_is_none() {
        let store = InMemoryProductStore::new();
        let result = store.update(Uuid::new_v4(), &UpdateProduct::default()).await.unwrap();
        assert!(result.is_none());
    }
}
