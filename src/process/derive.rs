use crate::table::{string_column, with_column};
use anyhow::Result;
use arrow::{
    array::{ArrayRef, BooleanArray, Int64Array, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::info;

pub const GMAIL_DOMAIN: &str = "gmail.com";

/// Everything after the last `@`, or the whole string when there is none.
pub fn domain_of(email: &str) -> &str {
    email.rsplit_once('@').map_or(email, |(_, domain)| domain)
}

/// `first + " " + last`. A null on either side gives a null.
pub fn full_name(first: &StringArray, last: &StringArray) -> StringArray {
    first
        .iter()
        .zip(last.iter())
        .map(|pair| match pair {
            (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
            _ => None,
        })
        .collect()
}

pub fn email_domain(email: &StringArray) -> StringArray {
    email.iter().map(|e| e.map(domain_of)).collect()
}

/// Character count, not byte length.
pub fn city_length(city: &StringArray) -> Int64Array {
    city.iter()
        .map(|c| c.map(|c| c.chars().count() as i64))
        .collect()
}

/// Exact, case-sensitive match on the domain. Null domains are not gmail.
pub fn is_gmail(domain: &StringArray) -> BooleanArray {
    let flags: Vec<bool> = domain.iter().map(|d| d == Some(GMAIL_DOMAIN)).collect();
    BooleanArray::from(flags)
}

/// Append `full_name`, `email_domain`, `city_length` and `is_gmail`.
#[tracing::instrument(level = "info", skip(batch), fields(rows = batch.num_rows()))]
pub fn derive_features(batch: &RecordBatch) -> Result<RecordBatch> {
    let first = string_column(batch, "first_name")?;
    let last = string_column(batch, "last_name")?;
    let email = string_column(batch, "email")?;
    let city = string_column(batch, "city")?;

    let domain = email_domain(email);
    let gmail = is_gmail(&domain);
    let gmail_count = gmail.true_count();

    let out = with_column(batch, "full_name", Arc::new(full_name(first, last)) as ArrayRef)?;
    let out = with_column(&out, "email_domain", Arc::new(domain))?;
    let out = with_column(&out, "city_length", Arc::new(city_length(city)))?;
    let out = with_column(&out, "is_gmail", Arc::new(gmail))?;

    info!(gmail = gmail_count, columns = out.num_columns(), "derived features");
    Ok(out)
}
