use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateProductRequest, UpdateProductRequest},
    repo_types::Product,
};
use crate::{
    auth::{
        middleware::{authenticate, require_farmer},
        AuthUser,
    },
    error::AppError,
    state::AppState,
    validation::{ValidatedJson, ValidatedPath},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub fn farmer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/products/farmer/:farmer_id", get(list_farmer_products))
        .route_layer(middleware::from_fn(require_farmer))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = Product::create(&state.db, &payload.to_new(user.id)).await?;
    info!(product_id = %product.id, farmer_id = %user.id, verified = user.verified, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(Product::list_all(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<Json<Product>, AppError> {
    Product::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

#[instrument(skip(state))]
pub async fn list_farmer_products(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedPath(farmer_id): ValidatedPath<Uuid>,
) -> Result<Json<Vec<Product>>, AppError> {
    if user.id != farmer_id {
        warn!(user_id = %user.id, %farmer_id, "farmer listing another farmer's products");
        return Err(AppError::Forbidden("You can only list your own products".into()));
    }
    Ok(Json(Product::list_by_farmer(&state.db, farmer_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    load_owned(&state.db, id, &user).await?;

    let product = Product::update(&state.db, id, &payload.as_patch())
        .await?
        .ok_or_else(product_not_found)?;
    info!(product_id = %id, farmer_id = %user.id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> Result<StatusCode, AppError> {
    load_owned(&state.db, id, &user).await?;

    if !Product::delete(&state.db, id).await? {
        return Err(product_not_found());
    }
    info!(product_id = %id, farmer_id = %user.id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// 404 when the product is absent, 403 when `user` does not own it.
async fn load_owned(db: &PgPool, id: Uuid, user: &AuthUser) -> Result<Product, AppError> {
    let product = Product::find_by_id(db, id)
        .await?
        .ok_or_else(product_not_found)?;
    if !product.is_owned_by(user.id) {
        warn!(product_id = %id, owner = %product.farmer_id, user_id = %user.id, "not the owner");
        return Err(AppError::Forbidden("You do not own this product".into()));
    }
    Ok(product)
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".into())
}
