use axum::{
    extract::State,
    middleware,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        middleware::{authenticate, require_admin},
        repo_types::{PublicUser, UnverifiedFarmer, User},
        AuthUser,
    },
    error::AppError,
    state::AppState,
    validation::ValidatedPath,
};

pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/farmers/unverified", get(list_unverified_farmers))
        .route("/admin/approve-farmer/:farmer_id", put(approve_farmer))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

#[instrument(skip(state))]
pub async fn list_unverified_farmers(
    State(state): State<AppState>,
) -> Result<Json<Vec<UnverifiedFarmer>>, AppError> {
    Ok(Json(User::list_unverified_farmers(&state.db).await?))
}

/// Idempotent: approving an already verified farmer returns the same record.
#[instrument(skip(state))]
pub async fn approve_farmer(
    State(state): State<AppState>,
    admin: AuthUser,
    ValidatedPath(farmer_id): ValidatedPath<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    match User::approve_farmer(&state.db, farmer_id).await? {
        Some(farmer) => {
            info!(%farmer_id, admin_id = %admin.id, "farmer approved");
            Ok(Json(farmer))
        }
        None => {
            warn!(%farmer_id, "approve target missing or not a farmer");
            Err(AppError::NotFound("Farmer not found or not a farmer".into()))
        }
    }
}
