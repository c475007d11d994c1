use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use bookvote_state::StateError;

use crate::views::{NoticeTemplate, render};

#[derive(Error, Debug)]
pub enum WebError {
    #[error("state store failure: {0}")]
    Store(#[from] StateError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let page = render(NoticeTemplate {
            message: "Something went wrong on our side. Please try again later.".to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, page).into_response()
    }
}
