pub mod products;

use axum::{extract::FromRequest, http::StatusCode, Json};
use serde_json::json;

use crate::error::AppError;

/// `Json` extractor whose rejections render as [`AppError`] bodies.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub const TITLE: &str = "My Store API";
pub const DESCRIPTION: &str =
    "API de loja desenvolvida com TDD - Projeto personalizado do aluno DIO";

pub async fn root() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Bem-vindo à {}!", TITLE),
            "description": DESCRIPTION,
            "version": env!("CARGO_PKG_VERSION"),
            "docs": "/docs",
        })),
    )
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "message": "API funcionando corretamente" })),
    )
}
