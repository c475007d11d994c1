//! Askama templates and the view types they render.
//!
//! View types carry pre-formatted strings so templates stay simple.

use askama::Template;
use axum::response::Html;

use bookvote_core::tally::Tally;
use bookvote_core::{Book, VoteEpoch};

pub fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        format!("<pre>Template error: {e}</pre>")
    }))
}

// ── Notices ─────────────────────────────────────────────────────

pub const ALREADY_VOTED: &str = "You have already voted. Thank you!";
pub const THANK_YOU: &str = "Thank you for voting!";

#[derive(Template)]
#[template(path = "notice.html")]
pub struct NoticeTemplate {
    pub message: String,
}

pub fn notice(message: &str) -> Html<String> {
    render(NoticeTemplate {
        message: message.to_string(),
    })
}

// ── Ballot ──────────────────────────────────────────────────────

pub struct BookView {
    pub title: String,
    pub author: String,
    pub cover: Option<String>,
}

impl From<&Book> for BookView {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            cover: (!book.cover.is_empty()).then(|| book.cover.clone()),
        }
    }
}

#[derive(Template)]
#[template(path = "vote.html")]
pub struct VoteTemplate {
    pub books: Vec<BookView>,
}

// ── Admin ───────────────────────────────────────────────────────

/// Outcome shown at the top of the admin page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminNotice {
    WrongPassword,
    NoFile,
    UnreadableSpreadsheet,
    Imported(usize),
    VotesReset(VoteEpoch),
}

impl AdminNotice {
    pub fn text(self) -> String {
        match self {
            AdminNotice::WrongPassword => "Wrong password!".to_string(),
            AdminNotice::NoFile => "No file uploaded.".to_string(),
            AdminNotice::UnreadableSpreadsheet => "Error reading the spreadsheet.".to_string(),
            AdminNotice::Imported(n) => format!("Books imported successfully ({n} books)."),
            AdminNotice::VotesReset(epoch) => {
                format!("All votes reset! Everyone may vote again (round {epoch}).")
            }
        }
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            AdminNotice::WrongPassword | AdminNotice::NoFile | AdminNotice::UnreadableSpreadsheet
        )
    }
}

pub struct NoticeView {
    pub text: String,
    pub class: &'static str,
}

impl From<AdminNotice> for NoticeView {
    fn from(notice: AdminNotice) -> Self {
        Self {
            text: notice.text(),
            class: if notice.is_error() { "notice error" } else { "notice ok" },
        }
    }
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub notice: Option<NoticeView>,
}

pub fn admin_page(notice: Option<AdminNotice>) -> Html<String> {
    render(AdminTemplate {
        notice: notice.map(NoticeView::from),
    })
}

// ── Results ─────────────────────────────────────────────────────

pub struct ResultRow {
    pub rank: usize,
    pub title: String,
    pub points: i64,
}

#[derive(Template)]
#[template(path = "results.html")]
pub struct ResultsTemplate {
    pub rows: Vec<ResultRow>,
    pub unlisted: Vec<(String, i64)>,
    pub ballots: usize,
    pub epoch: VoteEpoch,
}

impl ResultsTemplate {
    pub fn from_tally(tally: &Tally, epoch: VoteEpoch) -> Self {
        let rows = tally
            .ranked()
            .into_iter()
            .enumerate()
            .map(|(i, row)| ResultRow {
                rank: i + 1,
                title: row.title,
                points: row.points,
            })
            .collect();

        Self {
            rows,
            unlisted: tally
                .unlisted()
                .iter()
                .map(|(title, points)| (title.clone(), *points))
                .collect(),
            ballots: tally.ballots(),
            epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookvote_core::{Allocation, tally};
    use serde_json::json;

    #[test]
    fn book_view_hides_empty_cover() {
        let view = BookView::from(&Book::new("A", "B", ""));
        assert!(view.cover.is_none());
        let view = BookView::from(&Book::new("A", "B", "/covers/a.png"));
        assert_eq!(view.cover.as_deref(), Some("/covers/a.png"));
    }

    #[test]
    fn results_are_ranked_from_one() {
        let books = vec![Book::new("Low", "", ""), Book::new("High", "", "")];
        let mut vote = Allocation::new();
        vote.insert("High".to_string(), json!("9"));
        vote.insert("Low".to_string(), json!("1"));
        vote.insert("Elsewhere".to_string(), json!("2"));

        let view = ResultsTemplate::from_tally(&tally(&books, [&vote]), 4);

        assert_eq!(view.rows[0].rank, 1);
        assert_eq!(view.rows[0].title, "High");
        assert_eq!(view.rows[1].title, "Low");
        assert_eq!(view.unlisted, vec![("Elsewhere".to_string(), 2)]);
        assert_eq!(view.ballots, 1);
    }

    #[test]
    fn titles_are_escaped_in_html() {
        let html = render(VoteTemplate {
            books: vec![BookView::from(&Book::new("<script>", "x", ""))],
        })
        .0;
        assert!(!html.contains("<script>"));
        assert!(html.contains("&#60;script&#62;"));
    }
}
