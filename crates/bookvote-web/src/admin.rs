//! Admin pages: spreadsheet import, results and reset.
//!
//! Import is gated by the `password` field of the upload form. Results
//! require [`AdminAccess`], reset the stricter [`ResetAccess`].

use std::io::Write;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use bookvote_core::import::{self, ImportError};
use bookvote_core::tally;

use crate::AppState;
use crate::auth::{AdminAccess, ResetAccess};
use crate::error::WebError;
use crate::views::{AdminNotice, ResultsTemplate, admin_page as render_admin, render};

/// Multipart field carrying the spreadsheet.
pub const UPLOAD_FIELD: &str = "excel";
/// Multipart field carrying the admin password.
pub const PASSWORD_FIELD: &str = "password";

/// An uploaded spreadsheet parked in the uploads dir.
///
/// The file is deleted when this value drops, on every exit path.
struct Upload {
    file: NamedTempFile,
    name: String,
}

/// GET /admin
pub async fn admin_page() -> Html<String> {
    render_admin(None)
}

/// POST /admin
pub async fn import_books(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut password: Option<String> = None;
    let mut upload: Option<Upload> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed upload");
                return respond(StatusCode::BAD_REQUEST, AdminNotice::NoFile);
            }
        };

        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(PASSWORD_FIELD) => match field.text().await {
                Ok(text) => password = Some(text),
                Err(e) => {
                    warn!(error = %e, "unreadable password field");
                    return respond(StatusCode::BAD_REQUEST, AdminNotice::WrongPassword);
                }
            },
            Some(UPLOAD_FIELD) => match receive_upload(&state, field).await {
                Ok(received) => upload = received,
                Err(e) => {
                    warn!(error = %e, "failed to receive upload");
                    return respond(StatusCode::BAD_REQUEST, AdminNotice::NoFile);
                }
            },
            _ => {}
        }
    }

    let authorized = password.as_deref().is_some_and(|p| state.admin.verify(p));
    if !authorized {
        warn!(uploaded = upload.is_some(), "import rejected: wrong password");
        return respond(StatusCode::UNAUTHORIZED, AdminNotice::WrongPassword);
    }

    let Some(upload) = upload else {
        return respond(StatusCode::BAD_REQUEST, AdminNotice::NoFile);
    };

    let name = upload.name.clone();
    let parsed = tokio::task::spawn_blocking(move || {
        let rows = import::read_rows(upload.file.path());
        drop(upload);
        rows
    })
    .await;

    let rows = match parsed {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => return import_failed(&name, &e),
        Err(e) => {
            warn!(file = %name, error = %e, "spreadsheet reader crashed");
            return respond(StatusCode::UNPROCESSABLE_ENTITY, AdminNotice::UnreadableSpreadsheet);
        }
    };

    let books = import::books_from_rows(&rows);
    if let Err(e) = state.store.save_books(&books) {
        return WebError::from(e).into_response();
    }
    info!(file = %name, count = books.len(), "ballot imported");
    respond(StatusCode::OK, AdminNotice::Imported(books.len()))
}

/// Stream the file part into a temp file. `Ok(None)` when no file was chosen.
async fn receive_upload(state: &AppState, mut field: Field<'_>) -> Result<Option<Upload>, UploadError> {
    let name = field.file_name().unwrap_or_default().to_string();

    let suffix = import::extension_of(&name).map(|ext| format!(".{ext}"));
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-");
    if let Some(suffix) = &suffix {
        builder.suffix(suffix);
    }
    let mut file = builder.tempfile_in(&state.config.storage.uploads_dir)?;

    let mut size = 0usize;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len();
        file.write_all(&chunk)?;
    }
    file.flush()?;

    if name.is_empty() && size == 0 {
        return Ok(None);
    }
    Ok(Some(Upload { file, name }))
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("multipart: {0}")]
    Multipart(#[from] MultipartError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

fn import_failed(name: &str, error: &ImportError) -> Response {
    warn!(file = %name, error = %error, "spreadsheet import failed");
    respond(StatusCode::UNPROCESSABLE_ENTITY, AdminNotice::UnreadableSpreadsheet)
}

fn respond(status: StatusCode, notice: AdminNotice) -> Response {
    (status, render_admin(Some(notice))).into_response()
}

/// GET /admin/results
pub async fn results(_: AdminAccess, State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let books = state.store.load_books()?;
    let votes = state.store.load_votes()?;
    let epoch = state.store.vote_epoch()?;

    let tally = tally(&books, votes.values());
    Ok(render(ResultsTemplate::from_tally(&tally, epoch)))
}

/// GET /admin/reset
pub async fn reset(_: ResetAccess, State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let epoch = state.store.reset_votes()?;
    info!(epoch, "votes reset by admin");
    Ok(render_admin(Some(AdminNotice::VotesReset(epoch))))
}
