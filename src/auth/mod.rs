use crate::state::AppState;
use axum::Router;

pub mod credentials;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod tokens;

pub use extractors::{AdminUser, AuthUser, MaybeAuthUser};
pub use repo_types::{Role, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
