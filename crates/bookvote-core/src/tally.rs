//! Tally engine: folds every stored allocation into per-book point totals.
//!
//! Each distinct title in the Book Store gets an accumulator starting at 0,
//! in Book Store order. Points for titles that are not on the ballot land in
//! a separate `unlisted` map instead of the per-book totals.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::types::{Allocation, Book};

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRow {
    pub title: String,
    pub points: i64,
}

/// Aggregated results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    rows: Vec<TallyRow>,
    index: HashMap<String, usize>,
    unlisted: BTreeMap<String, i64>,
    ballots: usize,
}

impl Tally {
    fn with_books(books: &[Book]) -> Self {
        let mut tally = Self::default();
        for book in books {
            if tally.index.contains_key(&book.title) {
                continue;
            }
            tally.index.insert(book.title.clone(), tally.rows.len());
            tally.rows.push(TallyRow {
                title: book.title.clone(),
                points: 0,
            });
        }
        tally
    }

    fn add(&mut self, title: &str, points: i64) {
        match self.index.get(title) {
            Some(&i) => {
                let row = &mut self.rows[i];
                row.points = row.points.saturating_add(points);
            }
            None => {
                let slot = self.unlisted.entry(title.to_string()).or_insert(0);
                *slot = slot.saturating_add(points);
            }
        }
    }

    /// Totals in Book Store order.
    pub fn rows(&self) -> &[TallyRow] {
        &self.rows
    }

    /// Title to total for every book on the ballot.
    pub fn totals(&self) -> BTreeMap<String, i64> {
        self.rows
            .iter()
            .map(|r| (r.title.clone(), r.points))
            .collect()
    }

    /// Rows sorted by points, highest first. Ties keep Book Store order.
    pub fn ranked(&self) -> Vec<TallyRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.points.cmp(&a.points));
        rows
    }

    /// Points cast for titles that are not in the Book Store.
    pub fn unlisted(&self) -> &BTreeMap<String, i64> {
        &self.unlisted
    }

    /// Number of allocations folded in.
    pub fn ballots(&self) -> usize {
        self.ballots
    }

    pub fn get(&self, title: &str) -> Option<i64> {
        self.index.get(title).map(|&i| self.rows[i].points)
    }
}

/// Aggregate `votes` against `books`.
pub fn tally<'a, I>(books: &[Book], votes: I) -> Tally
where
    I: IntoIterator<Item = &'a Allocation>,
{
    let mut result = Tally::with_books(books);
    for allocation in votes {
        result.ballots += 1;
        for (title, raw) in allocation {
            result.add(title, parse_points(raw));
        }
    }
    result
}

/// Interpret a submitted point value. Anything unusable counts as 0.
pub fn parse_points(value: &Value) -> i64 {
    match value {
        Value::String(s) => leading_int(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Leading decimal integer of `s`: optional whitespace, optional sign, digits.
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut total: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(b - b'0');
        total = total.saturating_mul(10).saturating_add(d);
    }
    if negative { total.saturating_neg() } else { total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alloc(pairs: &[(&str, Value)]) -> Allocation {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn non_numeric_points_count_as_zero() {
        let books = vec![Book::new("A", "x", ""), Book::new("B", "y", "")];
        let votes = vec![
            alloc(&[("A", json!("3")), ("B", json!("x"))]),
            alloc(&[("A", json!("2"))]),
        ];

        let result = tally(&books, &votes);

        let expected: BTreeMap<String, i64> =
            [("A".to_string(), 5), ("B".to_string(), 0)].into_iter().collect();
        assert_eq!(result.totals(), expected);
        assert_eq!(result.ballots(), 2);
        assert!(result.unlisted().is_empty());
    }

    #[test]
    fn books_without_votes_show_zero() {
        let books = vec![Book::new("Dune", "Herbert", "")];
        let result = tally(&books, &Vec::<Allocation>::new());
        assert_eq!(result.get("Dune"), Some(0));
        assert_eq!(result.ballots(), 0);
    }

    #[test]
    fn unknown_titles_are_kept_apart() {
        let books = vec![Book::new("A", "x", "")];
        let votes = vec![
            alloc(&[("A", json!("1")), ("Ghost", json!("4"))]),
            alloc(&[("Ghost", json!("2"))]),
        ];

        let result = tally(&books, &votes);

        assert_eq!(result.totals().len(), 1);
        assert_eq!(result.get("A"), Some(1));
        assert_eq!(result.get("Ghost"), None);
        assert_eq!(result.unlisted().get("Ghost"), Some(&6));
    }

    #[test]
    fn duplicate_titles_share_one_accumulator() {
        let books = vec![Book::new("A", "first", ""), Book::new("A", "second", "")];
        let votes = vec![alloc(&[("A", json!("2"))])];

        let result = tally(&books, &votes);

        assert_eq!(result.rows().len(), 1);
        assert_eq!(result.get("A"), Some(2));
    }

    #[test]
    fn ranked_orders_by_points_then_ballot_order() {
        let books = vec![
            Book::new("A", "", ""),
            Book::new("B", "", ""),
            Book::new("C", "", ""),
        ];
        let votes = vec![alloc(&[("B", json!("5")), ("C", json!("1")), ("A", json!("1"))])];

        let ranked: Vec<String> = tally(&books, &votes)
            .ranked()
            .into_iter()
            .map(|r| r.title)
            .collect();

        assert_eq!(ranked, vec!["B", "A", "C"]);
    }

    #[test]
    fn parse_points_follows_leading_integer_rules() {
        assert_eq!(parse_points(&json!("42")), 42);
        assert_eq!(parse_points(&json!("  7 points")), 7);
        assert_eq!(parse_points(&json!("3.9")), 3);
        assert_eq!(parse_points(&json!("-2")), -2);
        assert_eq!(parse_points(&json!("+8")), 8);
        assert_eq!(parse_points(&json!("")), 0);
        assert_eq!(parse_points(&json!("abc")), 0);
        assert_eq!(parse_points(&json!(6)), 6);
        assert_eq!(parse_points(&json!(2.7)), 2);
        assert_eq!(parse_points(&json!(true)), 0);
        assert_eq!(parse_points(&json!(null)), 0);
        assert_eq!(parse_points(&json!({"nested": 1})), 0);
    }

    #[test]
    fn huge_values_saturate() {
        assert_eq!(parse_points(&json!("99999999999999999999999")), i64::MAX);

        let books = vec![Book::new("A", "", "")];
        let votes = vec![
            alloc(&[("A", json!(i64::MAX))]),
            alloc(&[("A", json!("1"))]),
        ];
        assert_eq!(tally(&books, &votes).get("A"), Some(i64::MAX));
    }
}
