use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Default page size for listings when the caller gives none.
pub const DEFAULT_LIMIT: i64 = 1_000;
/// Hard cap on a single listing.
pub const MAX_LIMIT: i64 = 10_000;

/// Core product entity. Eq is by UUID: two snapshots of the same product
/// taken before and after an update are still the same product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    /// Price stored as integer cents (e.g. 999 = $9.99)
    pub price_cents: i64,
    /// Whether the product is active for sale
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

impl Product {
    /// Build a fresh product from a create payload, stamping both timestamps.
    pub fn new(payload: CreateProduct) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            quantity: payload.quantity,
            price_cents: payload.price_cents,
            status: payload.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Current time truncated to milliseconds, the resolution of a BSON datetime.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now)
}

// ── Request payloads ─────────────────────────────────────────────────────────

fn default_status() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub quantity: i32,
    /// Price in cents
    pub price_cents: i64,
    #[serde(default = "default_status")]
    pub status: bool,
}

impl CreateProduct {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)?;
        validate_quantity(self.quantity)?;
        validate_price(self.price_cents)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub price_cents: Option<i64>,
    pub status: Option<bool>,
    /// Explicit modification time; defaults to now.
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateProduct {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(price_cents) = self.price_cents {
            validate_price(price_cents)?;
        }
        Ok(())
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or_else(now_millis)
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 0 {
        return Err(AppError::BadRequest("quantity must be >= 0".to_string()));
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> AppResult<()> {
    if price_cents < 0 {
        return Err(AppError::BadRequest("price_cents must be >= 0".to_string()));
    }
    Ok(())
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProductFilters {
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub status: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductFilters {
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(min), Some(max)) = (self.min_price_cents, self.max_price_cents) {
            if min > max {
                return Err(AppError::BadRequest(format!(
                    "min_price_cents ({}) must be <= max_price_cents ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0).max(0) as u64
    }
}
