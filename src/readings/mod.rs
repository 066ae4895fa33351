use crate::state::AppState;
use axum::Router;

mod dto;
pub mod filter;
pub mod handlers;
pub mod ordering;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::collection_routes())
        .merge(handlers::detail_routes())
}
