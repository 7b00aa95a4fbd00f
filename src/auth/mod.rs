use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repo;
pub mod repo_types;

pub use extractors::AuthUser;
pub use repo_types::Role;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
