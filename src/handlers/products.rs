use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::AppJson;
use crate::{
    error::{AppError, AppResult},
    models::{CreateProduct, Product, ProductFilters, UpdateProduct},
    AppState,
};

/// Product routes, mounted at the application root.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product)
                .patch(update_product)
                .delete(delete_product),
        )
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Product {} not found", id))
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
    Query(filters): Query<ProductFilters>,
) -> AppResult<Json<Vec<Product>>> {
    filters.validate()?;

    let start = Instant::now();
    let products = state.products.find_all(&filters).await?;

    info!(
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed products"
    );

    Ok(Json(products))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProduct>,
) -> AppResult<(StatusCode, Json<Product>)> {
    payload.validate()?;

    let product = Product::new(payload);
    let start = Instant::now();
    state.products.insert(&product).await?;

    info!(
        id = %product.id,
        name = %product.name,
        elapsed_ms = start.elapsed().as_millis(),
        "Created product"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let product = state
        .products
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    info!(id = %id, "Fetched product");
    Ok(Json(product))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateProduct>,
) -> AppResult<Json<Product>> {
    payload.validate()?;

    let start = Instant::now();
    let product = state
        .products
        .update(id, &payload)
        .await?
        .ok_or_else(|| not_found(id))?;

    info!(
        id = %id,
        elapsed_ms = start.elapsed().as_millis(),
        "Updated product"
    );

    Ok(Json(product))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.products.delete(id).await? {
        return Err(not_found(id));
    }

    info!(id = %id, "Deleted product");
    Ok(StatusCode::NO_CONTENT)
}
