use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::healthcheck))
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/tables", get(handlers::list_tables))
        .route("/table", post(handlers::create_table))
        .route(
            "/table/{id}",
            get(handlers::get_table).delete(handlers::delete_table),
        )
        .route("/table/{id}/fields", put(handlers::update_fields))
        .route("/table/{id}/record", post(handlers::add_record))
        .route(
            "/table/{id}/record/{index}",
            put(handlers::update_record).delete(handlers::delete_record),
        )
        .route(
            "/table/{id}/rows/{row_id}",
            put(handlers::update_row_by_id).delete(handlers::delete_row_by_id),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
