// src/fetch/mod.rs

use anyhow::{ensure, Context, Result};
use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use reqwest::blocking::Client;
use std::{io::Cursor, sync::Arc};
use tracing::{debug, info};
use url::Url;

/// The UK-500 contact/company sample dataset.
pub const UK500_CSV_URL: &str =
    "https://s3-eu-west-1.amazonaws.com/shanebucket/downloads/uk-500.csv";

const BATCH_SIZE: usize = 1024;

/// GET `url` and return the body as text. Transport errors and non-2xx
/// statuses are returned as errors; nothing is retried.
pub fn fetch_csv(client: &Client, url: &str) -> Result<String> {
    let url = Url::parse(url).with_context(|| format!("parsing source URL {}", url))?;

    let text = client
        .get(url.clone())
        .send()
        .with_context(|| format!("GET {}", url))?
        .error_for_status()
        .with_context(|| format!("GET {}", url))?
        .text()
        .with_context(|| format!("reading body from {}", url))?;

    debug!(bytes = text.len(), "fetched csv body");
    Ok(text)
}

/// Parse CSV text into a table. The first row is the header; every column is
/// read as nullable `Utf8` and empty cells become nulls.
pub fn read_csv(text: &str) -> Result<RecordBatch> {
    // Only the header is needed from the sniffer, column types are fixed below.
    let (sniffed, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(text.as_bytes()), Some(0))
        .context("reading CSV header")?;
    ensure!(!sniffed.fields().is_empty(), "CSV has no header row");

    let fields: Vec<Field> = sniffed
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_quote(b'"')
        .with_delimiter(b',')
        .build(Cursor::new(text.as_bytes()))
        .context("creating CSV reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("parsing CSV rows")?;

    concat_batches(&schema, &batches).context("concatenating CSV batches")
}

/// Fetch the CSV at `url` and parse it into a table.
#[tracing::instrument(level = "info", skip(client))]
pub fn extract(client: &Client, url: &str) -> Result<RecordBatch> {
    let text = fetch_csv(client, url)?;
    let batch = read_csv(&text).with_context(|| format!("parsing CSV from {}", url))?;
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "extracted"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::string_column;
    use arrow::array::Array;

    #[test]
    fn test_read_csv_header_and_nulls() -> Result<()> {
        let content = "first_name,last_name,company_name,city\n\
                       Aleshia,Tomkiewicz,Alan D Rosenburg Cpa Pc,St. Stephens Ward\n\
                       Evan,, Cap Gemini America ,Abbey Ward\n";

        let batch = read_csv(content)?;
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        assert_eq!(batch.schema().field(2).name(), "company_name");
        assert!(batch
            .schema()
            .fields()
            .iter()
            .all(|f| f.data_type() == &DataType::Utf8));

        let last = string_column(&batch, "last_name")?;
        assert!(last.is_null(1));
        // whitespace is left for the cleaner
        assert_eq!(
            string_column(&batch, "company_name")?.value(1),
            " Cap Gemini America "
        );
        Ok(())
    }

    #[test]
    fn test_read_csv_quoted_fields() -> Result<()> {
        let content = "company_name,city\n\"Smith, Jones & Co Ltd\",London\n";
        let batch = read_csv(content)?;
        assert_eq!(
            string_column(&batch, "company_name")?.value(0),
            "Smith, Jones & Co Ltd"
        );
        Ok(())
    }

    #[test]
    fn test_read_csv_header_only() -> Result<()> {
        let batch = read_csv("first_name,last_name\n")?;
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 2);
        Ok(())
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let content = "a,b,c\n1,2,3\n4,5\n";
        assert!(read_csv(content).is_err());
    }

    #[test]
    fn test_read_csv_rejects_empty_input() {
        assert!(read_csv("").is_err());
    }

    #[test]
    fn test_fetch_csv_rejects_invalid_url() {
        let client = Client::new();
        let err = fetch_csv(&client, "not a url").unwrap_err();
        assert!(err.to_string().contains("parsing source URL"));
    }
}
