use crate::{
    process::{
        trimming::{apply_trimming, text_columns},
        utils::is_blank,
    },
    table::{filter_rows, first_occurrence_mask, row_keys},
};
use anyhow::{Context, Result};
use arrow::{
    array::{Array, StringArray},
    record_batch::RecordBatch,
};
use serde::Serialize;
use tracing::{debug, info};

/// Row counts through the cleaning steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    pub input_rows: usize,
    pub empty_rows_dropped: usize,
    pub duplicate_rows_dropped: usize,
    pub output_rows: usize,
}

/// Drop rows in which every cell is null or a blank string.
pub fn drop_empty_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut keep = vec![false; batch.num_rows()];

    for col in batch.columns() {
        let strings = col.as_any().downcast_ref::<StringArray>();
        for (row, k) in keep.iter_mut().enumerate() {
            if *k || col.is_null(row) {
                continue;
            }
            *k = match strings {
                Some(sarr) => !is_blank(sarr.value(row)),
                None => true,
            };
        }
    }

    filter_rows(batch, &keep)
}

/// Drop rows equal to an earlier row, keeping the first occurrence. String
/// cells compare by their trimmed form, so rows that only become equal after
/// trimming are still caught here.
pub fn drop_duplicate_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    let keys = row_keys(batch, true)?;
    let keep = first_occurrence_mask(&keys);
    filter_rows(batch, &keep)
}

/// Drop empty rows, drop duplicates, then trim every text column.
#[tracing::instrument(level = "info", skip(batch), fields(rows = batch.num_rows()))]
pub fn clean_table(batch: &RecordBatch) -> Result<(RecordBatch, CleanStats)> {
    let input_rows = batch.num_rows();

    let non_empty = drop_empty_rows(batch).context("dropping empty rows")?;
    debug!(rows = non_empty.num_rows(), "dropped empty rows");

    let deduped = drop_duplicate_rows(&non_empty).context("dropping duplicate rows")?;
    debug!(rows = deduped.num_rows(), "dropped duplicate rows");

    let cleaned = apply_trimming(&deduped, &text_columns(&deduped)).context("trimming text")?;

    let stats = CleanStats {
        input_rows,
        empty_rows_dropped: input_rows - non_empty.num_rows(),
        duplicate_rows_dropped: non_empty.num_rows() - deduped.num_rows(),
        output_rows: cleaned.num_rows(),
    };
    info!(?stats, "cleaned");

    Ok((cleaned, stats))
}
