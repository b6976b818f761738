use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use crate::{AppState, error::AppError, models::ProductFilter, utils::Claims};

use super::model::{CreateProductRequest, DeleteProductResponse, UpdateProductRequest};

#[axum::debug_handler]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateProductRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let product = req.validate()?;
    tracing::debug!("User {} is creating product: {}", claims.sub, product.name);

    let created = state.products.create(product).await?;
    tracing::info!("User {} created product {}", claims.sub, created.id);

    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn get_product(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.products.get(id).await?;
    Ok(Json(product))
}

#[axum::debug_handler]
pub async fn list_products(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<ProductFilter>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.products.list(&filter).await?;
    Ok(Json(products))
}

#[axum::debug_handler]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProductRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let changes = req.validate()?;

    let updated = state.products.update(id, changes).await?;
    tracing::info!("User {} updated product {}", claims.sub, id);

    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    state.products.delete(id).await?;
    tracing::info!("User {} deleted product {}", claims.sub, id);

    Ok(Json(DeleteProductResponse {
        message: "Product deleted successfully".to_string(),
    }))
}
