use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_batch, create_url_json, create_url_text, delete_user_urls, list_user_urls, ping,
    redirect,
};
use crate::identity::identify;
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", post(create_url_text).get(redirect))
            .route("/{code}", get(redirect))
            .route("/ping", get(ping))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(create_url_json))
                    .route("/shorten/batch", post(create_batch))
                    .route("/user/urls", get(list_user_urls).delete(delete_user_urls)),
            )
            .layer(middleware::from_fn_with_state(state.clone(), identify))
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
