//! Voter-facing pages.
//!
//! A visitor is NotVoted until a submission succeeds, then Voted until the
//! next reset moves the epoch. The only check is the epoch suffix of the
//! `voted` cookie.

use axum::extract::{FromRequest, Request, State};
use axum::http::HeaderMap;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::Value;
use tracing::{debug, info, warn};

use bookvote_core::cookie::{blocks_voting, find_cookie};
use bookvote_core::{Allocation, VoteCookie, VoteEpoch, VoterId};

use crate::AppState;
use crate::error::WebError;
use crate::views::{ALREADY_VOTED, BookView, THANK_YOU, VoteTemplate, notice, render};

/// GET /
pub async fn ballot(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    let epoch = state.store.vote_epoch()?;
    if has_voted(&state, &headers, epoch) {
        return Ok(notice(ALREADY_VOTED).into_response());
    }

    let books = state.store.load_books()?;
    Ok(render(VoteTemplate {
        books: books.iter().map(BookView::from).collect(),
    })
    .into_response())
}

/// POST /vote
pub async fn submit_vote(State(state): State<AppState>, request: Request) -> Result<Response, WebError> {
    let epoch = state.store.vote_epoch()?;
    if has_voted(&state, request.headers(), epoch) {
        debug!(epoch, "repeat submission rejected");
        return Ok(notice(ALREADY_VOTED).into_response());
    }

    let allocation = read_allocation(&state, request).await;
    let voter = VoterId::generate().map_err(|e| WebError::Internal(e.to_string()))?;
    let recorded_in = state.store.record_vote(&voter, &allocation)?;
    info!(%voter, epoch = recorded_in, entries = allocation.len(), "vote accepted");

    let voting = &state.config.voting;
    let cookie = VoteCookie::new(voter, recorded_in)
        .set_cookie_header(&voting.cookie_name, voting.cookie_max_age_days);

    Ok(([(SET_COOKIE, cookie)], notice(THANK_YOU)).into_response())
}

fn has_voted(state: &AppState, headers: &HeaderMap, epoch: VoteEpoch) -> bool {
    let values = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok());
    find_cookie(values, &state.config.voting.cookie_name)
        .is_some_and(|value| blocks_voting(value, epoch))
}

/// Decode the submitted body as JSON or as a url-encoded form.
///
/// Anything undecodable is recorded as an empty allocation.
async fn read_allocation(state: &AppState, request: Request) -> Allocation {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        match Json::<Allocation>::from_request(request, state).await {
            Ok(Json(allocation)) => allocation,
            Err(rejection) => {
                warn!(error = %rejection, "unreadable JSON vote, recording it empty");
                Allocation::new()
            }
        }
    } else {
        match Form::<Vec<(String, String)>>::from_request(request, state).await {
            Ok(Form(pairs)) => pairs
                .into_iter()
                .map(|(title, points)| (title, Value::String(points)))
                .collect(),
            Err(rejection) => {
                warn!(error = %rejection, "unreadable form vote, recording it empty");
                Allocation::new()
            }
        }
    }
}
