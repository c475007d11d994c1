//! Voting workflow over HTTP: ballot page, submission, cookie gate and
//! epoch invalidation.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use bookvote_core::Book;
use common::*;

fn seed_books(h: &Harness) {
    h.store
        .save_books(&[
            Book::new("Dune", "Frank Herbert", "/covers/dune.jpg"),
            Book::new("Emma", "Jane Austen", ""),
        ])
        .unwrap();
}

#[tokio::test]
async fn fresh_visitor_sees_the_ballot() {
    let h = Harness::new();
    seed_books(&h);

    let resp = h.send(get("/")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_text(resp).await;
    assert!(html.contains("Dune"));
    assert!(html.contains("Jane Austen"));
    assert!(html.contains("/covers/dune.jpg"));
    assert!(html.contains("action=\"/vote\""));
}

#[tokio::test]
async fn empty_ballot_renders_placeholder() {
    let h = Harness::new();

    let html = body_text(h.send(get("/")).await).await;
    assert!(html.contains("no books on the ballot"));
}

#[tokio::test]
async fn vote_is_recorded_verbatim_and_cookie_issued() {
    let h = Harness::new();
    seed_books(&h);

    let resp = h.send(vote_form("Dune=3&Emma=x", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = issued_cookie(&resp).expect("vote cookie");
    assert!(cookie.ends_with("-1"));
    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.contains("Max-Age=31536000"));
    assert!(body_text(resp).await.contains("Thank you for voting!"));

    let votes = h.store.load_votes().unwrap();
    assert_eq!(votes.len(), 1);
    let (voter, allocation) = votes.iter().next().unwrap();
    assert_eq!(cookie, format!("{voter}-1"));
    assert_eq!(allocation["Dune"], json!("3"));
    assert_eq!(allocation["Emma"], json!("x"));
}

#[tokio::test]
async fn resubmission_with_issued_cookie_is_rejected() {
    let h = Harness::new();
    seed_books(&h);

    let first = h.send(vote_form("Dune=1", None)).await;
    let cookie = issued_cookie(&first).unwrap();

    let again = h.send(vote_form("Dune=9", Some(&cookie))).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert!(issued_cookie(&again).is_none());
    assert!(body_text(again).await.contains("already voted"));

    let page = h.send(get_with_cookie("/", &cookie)).await;
    assert!(body_text(page).await.contains("already voted"));

    assert_eq!(h.store.load_votes().unwrap().len(), 1);
}

#[tokio::test]
async fn any_voter_id_with_current_epoch_is_blocked() {
    let h = Harness::new();
    seed_books(&h);

    for cookie in ["made-up-1", "-1", "x-1"] {
        let page = h.send(get_with_cookie("/", cookie)).await;
        assert!(body_text(page).await.contains("already voted"), "{cookie}");

        let post = h.send(vote_form("Dune=5", Some(cookie))).await;
        assert!(body_text(post).await.contains("already voted"), "{cookie}");
    }
    assert!(h.store.load_votes().unwrap().is_empty());
}

#[tokio::test]
async fn reset_releases_old_cookies() {
    let h = Harness::new();
    seed_books(&h);

    let first = h.send(vote_form("Dune=2", None)).await;
    let old_cookie = issued_cookie(&first).unwrap();

    assert_eq!(h.store.reset_votes().unwrap(), 2);

    let page = h.send(get_with_cookie("/", &old_cookie)).await;
    let html = body_text(page).await;
    assert!(!html.contains("already voted"));
    assert!(html.contains("Dune"));

    let second = h.send(vote_form("Emma=4", Some(&old_cookie))).await;
    let new_cookie = issued_cookie(&second).unwrap();
    assert!(new_cookie.ends_with("-2"));
    assert_eq!(h.store.load_votes().unwrap().len(), 1);

    let blocked = h.send(vote_form("Emma=4", Some(&new_cookie))).await;
    assert!(body_text(blocked).await.contains("already voted"));
}

#[tokio::test]
async fn json_votes_are_accepted() {
    let h = Harness::new();
    seed_books(&h);

    let req = Request::builder()
        .method("POST")
        .uri("/vote")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"Dune": 4, "Emma": "2"}"#))
        .unwrap();
    let resp = h.send(req).await;
    assert!(issued_cookie(&resp).is_some());

    let votes = h.store.load_votes().unwrap();
    let allocation = votes.values().next().unwrap();
    assert_eq!(allocation["Dune"], json!(4));
    assert_eq!(allocation["Emma"], json!("2"));
}

#[tokio::test]
async fn malformed_vote_is_tolerated_as_empty() {
    let h = Harness::new();
    seed_books(&h);

    let req = Request::builder()
        .method("POST")
        .uri("/vote")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = h.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(issued_cookie(&resp).is_some());

    let votes = h.store.load_votes().unwrap();
    assert_eq!(votes.len(), 1);
    assert!(votes.values().next().unwrap().is_empty());
}

#[tokio::test]
async fn unrelated_cookies_do_not_block() {
    let h = Harness::new();
    seed_books(&h);

    let req = Request::builder()
        .uri("/")
        .header(header::COOKIE, "theme=dark-1; lang=en")
        .body(Body::empty())
        .unwrap();
    let html = body_text(h.send(req).await).await;
    assert!(!html.contains("already voted"));
}
