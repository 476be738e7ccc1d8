use crate::process::utils::clean_str;
use anyhow::Result;
use arrow::{
    array::{Array, ArrayRef, StringArray},
    datatypes::DataType,
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Names of every `Utf8` column.
pub fn text_columns(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .filter(|f| f.data_type() == &DataType::Utf8)
        .map(|f| f.name().clone())
        .collect()
}

/// Apply trimming to flagged columns. Nulls pass through; columns with nothing
/// to trim are shared with the input rather than rebuilt.
pub fn apply_trimming(batch: &RecordBatch, trim_columns: &[String]) -> Result<RecordBatch> {
    if trim_columns.is_empty() {
        return Ok(batch.clone());
    }

    let mut cols = Vec::with_capacity(batch.num_columns());
    for (i, field) in batch.schema().fields().iter().enumerate() {
        let arr = batch.column(i);
        if trim_columns.contains(field.name()) {
            if let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() {
                let dirty = sarr.iter().flatten().any(|s| clean_str(s) != s);
                if dirty {
                    let trimmed: StringArray = sarr.iter().map(|opt| opt.map(clean_str)).collect();
                    cols.push(Arc::new(trimmed) as ArrayRef);
                    continue;
                }
            }
        }
        cols.push(arr.clone());
    }

    RecordBatch::try_new(batch.schema(), cols).map_err(Into::into)
}
