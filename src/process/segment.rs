use crate::{
    process::utils::word_count,
    table::{filter_rows, string_column, take_rows, typed_column, with_column},
};
use anyhow::{ensure, Context, Result};
use arrow::{
    array::{BooleanArray, Int64Array},
    compute::filter_record_batch,
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, seq::index, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

static COMPANY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)llc|ltd").expect("company suffix pattern should compile"));

/// Minimum `company_word_count` for the long company names view.
pub const LONG_COMPANY_MIN_WORDS: i64 = 4;

/// Shape of the positional views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Rows kept by the leading slice.
    pub head_rows: usize,
    /// Column positions of the leading slice, `column_start..column_end`.
    pub column_start: usize,
    pub column_end: usize,
    /// Keep every `stride`-th row starting at row 0.
    pub stride: usize,
    pub sample_size: usize,
    /// `None` draws the sample from OS entropy.
    pub sample_seed: Option<u64>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            head_rows: 10,
            column_start: 2,
            column_end: 6,
            stride: 10,
            sample_size: 5,
            sample_seed: None,
        }
    }
}

/// Views over the derived table. None of them share state with the input.
#[derive(Debug, Clone)]
pub struct Segments {
    /// Input plus `company_word_count`; the base of every view below.
    pub table: RecordBatch,
    pub gmail_users: RecordBatch,
    pub llc_ltd_companies: RecordBatch,
    pub london_users: RecordBatch,
    pub long_company_names: RecordBatch,
    pub first_rows: RecordBatch,
    pub every_nth: RecordBatch,
    pub sample: RecordBatch,
}

impl Segments {
    /// Row count of each filter view, in report order.
    pub fn filter_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("gmail users", self.gmail_users.num_rows()),
            ("LLC/Ltd companies", self.llc_ltd_companies.num_rows()),
            ("London users", self.london_users.num_rows()),
            ("long company names", self.long_company_names.num_rows()),
        ]
    }
}

/// Append `company_word_count`, the number of whitespace-separated tokens in
/// `company_name` (null when the name is null).
pub fn with_company_word_count(batch: &RecordBatch) -> Result<RecordBatch> {
    let company = string_column(batch, "company_name")?;
    let counts: Int64Array = company.iter().map(|c| c.map(word_count)).collect();
    with_column(batch, "company_word_count", Arc::new(counts))
}

pub fn gmail_users(batch: &RecordBatch) -> Result<RecordBatch> {
    let mask = typed_column::<BooleanArray>(batch, "is_gmail")?;
    filter_record_batch(batch, mask).context("filtering gmail users")
}

/// `company_name` contains `LLC` or `Ltd`, ignoring case.
pub fn llc_ltd_companies(batch: &RecordBatch) -> Result<RecordBatch> {
    let company = string_column(batch, "company_name")?;
    let keep: Vec<bool> = company
        .iter()
        .map(|c| c.is_some_and(|c| COMPANY_SUFFIX.is_match(c)))
        .collect();
    filter_rows(batch, &keep)
}

pub fn london_users(batch: &RecordBatch) -> Result<RecordBatch> {
    let city = string_column(batch, "city")?;
    let keep: Vec<bool> = city.iter().map(|c| c == Some("London")).collect();
    filter_rows(batch, &keep)
}

/// Rows whose `company_word_count` is at least [`LONG_COMPANY_MIN_WORDS`].
pub fn long_company_names(batch: &RecordBatch) -> Result<RecordBatch> {
    let counts = typed_column::<Int64Array>(batch, "company_word_count")?;
    let keep: Vec<bool> = counts
        .iter()
        .map(|n| n.is_some_and(|n| n >= LONG_COMPANY_MIN_WORDS))
        .collect();
    filter_rows(batch, &keep)
}

/// The first `rows` rows restricted to column positions `start..end`. Both
/// ranges are clamped to the table's shape.
pub fn first_rows(batch: &RecordBatch, rows: usize, start: usize, end: usize) -> Result<RecordBatch> {
    let end = end.min(batch.num_columns());
    let start = start.min(end);
    let projection: Vec<usize> = (start..end).collect();
    batch
        .slice(0, rows.min(batch.num_rows()))
        .project(&projection)
        .context("projecting leading rows")
}

pub fn every_nth(batch: &RecordBatch, stride: usize) -> Result<RecordBatch> {
    ensure!(stride > 0, "stride must be positive");
    let rows: Vec<usize> = (0..batch.num_rows()).step_by(stride).collect();
    take_rows(batch, &rows)
}

/// Uniform sample of `size` rows without replacement, in draw order.
pub fn sample_rows(batch: &RecordBatch, size: usize, seed: Option<u64>) -> Result<RecordBatch> {
    ensure!(
        size <= batch.num_rows(),
        "cannot sample {} rows from a table of {} without replacement",
        size,
        batch.num_rows()
    );
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let rows = index::sample(&mut rng, batch.num_rows(), size).into_vec();
    take_rows(batch, &rows)
}

/// Build every view from the derived table.
#[tracing::instrument(level = "info", skip(batch, opts), fields(rows = batch.num_rows()))]
pub fn segment_table(batch: &RecordBatch, opts: &SegmentOptions) -> Result<Segments> {
    let table = with_company_word_count(batch)?;

    let segments = Segments {
        gmail_users: gmail_users(&table)?,
        llc_ltd_companies: llc_ltd_companies(&table)?,
        london_users: london_users(&table)?,
        long_company_names: long_company_names(&table)?,
        first_rows: first_rows(&table, opts.head_rows, opts.column_start, opts.column_end)?,
        every_nth: every_nth(&table, opts.stride)?,
        sample: sample_rows(&table, opts.sample_size, opts.sample_seed)?,
        table,
    };

    for (name, rows) in segments.filter_counts() {
        info!(view = name, rows, "segmented");
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{process::derive::derive_features, table::from_columns};
    use arrow::array::Array;

    fn companies() -> Result<RecordBatch> {
        let batch = from_columns(&[
            ("first_name", vec![Some("A"), Some("B"), Some("C"), Some("D"), Some("E"), Some("F")]),
            ("last_name", vec![Some("a"), Some("b"), Some("c"), Some("d"), Some("e"), Some("f")]),
            (
                "company_name",
                vec![
                    Some("Smith & Co Ltd"),
                    Some("Acme llc"),
                    None,
                    Some("Foo Bar Baz Qux Quux"),
                    Some("Ltdx"),
                    Some("Plain"),
                ],
            ),
            (
                "city",
                vec![Some("London"), Some("london"), Some("London"), None, Some("Leeds"), Some("York")],
            ),
            (
                "email",
                vec![
                    Some("a@gmail.com"),
                    Some("b@GMAIL.com"),
                    Some("c@gmail.com"),
                    None,
                    Some("e@yahoo.co.uk"),
                    Some("f"),
                ],
            ),
        ])?;
        derive_features(&batch)
    }

    #[test]
    fn test_word_count_column() -> Result<()> {
        let out = with_company_word_count(&companies()?)?;
        let counts = typed_column::<Int64Array>(&out, "company_word_count")?;
        assert_eq!(counts.value(0), 4);
        assert_eq!(counts.value(1), 2);
        assert!(counts.is_null(2));
        assert_eq!(counts.value(3), 5);
        Ok(())
    }

    #[test]
    fn test_filters() -> Result<()> {
        let segs = segment_table(&companies()?, &SegmentOptions { sample_seed: Some(7), ..Default::default() })?;

        let gmail = string_column(&segs.gmail_users, "first_name")?;
        assert_eq!(gmail.len(), 2);
        assert_eq!(gmail.value(0), "A");
        assert_eq!(gmail.value(1), "C");

        // "Ltdx" contains "Ltd" as a substring and matches too
        let llc = string_column(&segs.llc_ltd_companies, "first_name")?;
        assert_eq!(llc.iter().flatten().collect::<Vec<_>>(), vec!["A", "B", "E"]);

        let london = string_column(&segs.london_users, "first_name")?;
        assert_eq!(london.iter().flatten().collect::<Vec<_>>(), vec!["A", "C"]);

        let long = string_column(&segs.long_company_names, "first_name")?;
        assert_eq!(long.iter().flatten().collect::<Vec<_>>(), vec!["A", "D"]);

        assert_eq!(segs.table.num_rows(), 6);
        assert_eq!(segs.filter_counts()[0], ("gmail users", 2));
        Ok(())
    }

    #[test]
    fn test_first_rows_clamps() -> Result<()> {
        let table = companies()?;
        let view = first_rows(&table, 10, 2, 6)?;
        assert_eq!(view.num_rows(), 6);
        assert_eq!(view.num_columns(), 4);
        assert_eq!(view.schema().field(0).name(), "company_name");
        assert_eq!(view.schema().field(3).name(), "full_name");

        let narrow = first_rows(&table, 2, 8, 20)?;
        assert_eq!(narrow.num_rows(), 2);
        assert_eq!(narrow.num_columns(), table.num_columns() - 8);
        Ok(())
    }

    #[test]
    fn test_every_nth() -> Result<()> {
        let table = companies()?;
        let view = every_nth(&table, 4)?;
        let names = string_column(&view, "first_name")?;
        assert_eq!(names.iter().flatten().collect::<Vec<_>>(), vec!["A", "E"]);
        assert!(every_nth(&table, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_sample_is_seedable() -> Result<()> {
        let table = companies()?;
        let a = sample_rows(&table, 5, Some(42))?;
        let b = sample_rows(&table, 5, Some(42))?;
        assert_eq!(a, b);
        assert_eq!(a.num_rows(), 5);

        let mut names: Vec<&str> = string_column(&a, "first_name")?.iter().flatten().collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);

        assert!(sample_rows(&table, 7, Some(42)).is_err());
        Ok(())
    }
}
