//! bookvote-web — HTTP surface of the book ballot.
//!
//! Server-rendered pages for voters and the admin, built on axum with
//! Askama templates.
//!
//! # Routes
//!
//! | Method | Path | Gate | Handler |
//! |---|---|---|---|
//! | GET | `/` | vote cookie | Ballot form or "already voted" |
//! | POST | `/vote` | vote cookie | Record a vote |
//! | GET | `/admin` | none | Admin form |
//! | POST | `/admin` | `password` form field | Spreadsheet import |
//! | GET | `/admin/results` | admin header or Basic | Tally table |
//! | GET | `/admin/reset` | admin header, Basic only same-origin | Clear votes, bump epoch |
//! | GET | `/covers/*` | none | Cover images |
//!
//! Anything else falls through to the public directory.

pub mod admin;
pub mod auth;
pub mod error;
pub mod views;
pub mod voting;

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use bookvote_core::{AdminSecret, BookvoteConfig};
use bookvote_state::StateStore;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub config: Arc<BookvoteConfig>,
    pub admin: AdminSecret,
}

impl AppState {
    pub fn new(store: StateStore, config: BookvoteConfig) -> Self {
        let admin = AdminSecret::new(&config.admin.password);
        Self {
            store,
            config: Arc::new(config),
            admin,
        }
    }
}

/// Build the complete router (pages, admin, static assets).
pub fn build_router(state: AppState) -> Router {
    let storage = &state.config.storage;
    let covers = ServeDir::new(&storage.covers_dir);
    let public = ServeDir::new(&storage.public_dir);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(voting::ballot))
        .route("/vote", post(voting::submit_vote))
        .route("/admin", get(admin::admin_page).post(admin::import_books))
        .route("/admin/results", get(admin::results))
        .route("/admin/reset", get(admin::reset))
        .nest_service("/covers", covers)
        .fallback_service(public)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Turn a handler panic into a 500 page; the server keeps running.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(%detail, "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<h2>Something went wrong. Please try again.</h2>"),
    )
        .into_response()
}
