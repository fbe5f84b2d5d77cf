use crate::state::AppState;
use axum::Router;

pub mod api;
pub mod dto;
pub mod form;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::form_routes())
        .merge(api::api_routes())
}
