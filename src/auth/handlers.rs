use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{normalize_email, LoginRequest, LoginResponse, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_against_dummy, verify_password},
        repo::is_unique_violation,
        repo_types::{NewUser, PublicUser, Role, User},
    },
    error::AppError,
    state::AppState,
    validation::ValidatedJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let email = normalize_email(&payload.email);
    let role: Role = payload.role.parse().map_err(AppError::BadRequest)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::BadRequest("Email already in use".into()));
    }

    let hash = hash_password(&payload.password)?;

    let new_user = NewUser {
        email: &email,
        password_hash: &hash,
        name: &payload.name,
        phone: payload.phone.as_deref(),
        address: payload.address.as_deref(),
        role,
        farm_name: payload.farm_name.as_deref(),
        location: payload.location.as_deref(),
    };

    let user = User::create(&state.db, &new_user)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(%email, "email registered concurrently");
                AppError::BadRequest("Email already in use".into())
            } else {
                AppError::Internal(anyhow::Error::new(e).context("create user"))
            }
        })?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&payload.email);
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        verify_against_dummy(&payload.password);
        warn!(%email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, user.role, user.verified)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        token,
        user: PublicUser::from(user),
    }))
}
