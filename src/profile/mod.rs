//! Read-only diagnostics over a table: preview, per-column types, summary
//! statistics, null counts and duplicate rows.

use crate::{
    process::utils::infer_arrow_dtype,
    table::{first_occurrence_mask, row_keys},
};
use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    compute::cast,
    datatypes::DataType,
    record_batch::RecordBatch,
};
use std::collections::HashMap;
use tracing::debug;

/// One line of the per-column overview.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Storage type for native columns, inferred type for string columns.
    pub dtype: DataType,
    pub non_null: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN below two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    /// Most frequent value; ties go to the value seen first.
    pub top: Option<String>,
    pub freq: usize,
}

/// Numeric columns are described when there are any, text columns otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Describe {
    Numeric(Vec<NumericSummary>),
    Text(Vec<TextSummary>),
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub rows: usize,
    pub columns: usize,
    pub head: RecordBatch,
    pub info: Vec<ColumnInfo>,
    pub describe: Describe,
    pub null_counts: Vec<(String, usize)>,
    pub duplicate_rows: usize,
}

pub fn head(batch: &RecordBatch, n: usize) -> RecordBatch {
    batch.slice(0, n.min(batch.num_rows()))
}

/// Logical type of a column. Numbers stored as text are reported as numbers.
pub fn column_dtype(col: &ArrayRef) -> DataType {
    match col.as_any().downcast_ref::<StringArray>() {
        Some(sarr) => infer_arrow_dtype(sarr.iter().flatten()),
        None => col.data_type().clone(),
    }
}

pub fn column_info(batch: &RecordBatch) -> Vec<ColumnInfo> {
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| ColumnInfo {
            name: field.name().clone(),
            dtype: column_dtype(col),
            non_null: col.len() - col.null_count(),
        })
        .collect()
}

pub fn null_counts(batch: &RecordBatch) -> Vec<(String, usize)> {
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| (field.name().clone(), col.null_count()))
        .collect()
}

/// Rows exactly equal to an earlier row. Values are compared as stored.
pub fn duplicate_count(batch: &RecordBatch) -> Result<usize> {
    let keys = row_keys(batch, false)?;
    Ok(first_occurrence_mask(&keys).iter().filter(|k| !**k).count())
}

/// Linear interpolation between the closest ranks of sorted `values`.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn summarize_numeric(column: &str, values: &[f64]) -> NumericSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = if count == 0 {
        f64::NAN
    } else {
        sorted.iter().sum::<f64>() / count as f64
    };
    let std = if count < 2 {
        f64::NAN
    } else {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    };

    NumericSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied().unwrap_or(f64::NAN),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied().unwrap_or(f64::NAN),
    }
}

pub fn summarize_text(column: &str, sarr: &StringArray) -> TextSummary {
    // value -> (frequency, first position)
    let mut freq: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, v) in sarr.iter().flatten().enumerate() {
        freq.entry(v).or_insert((0, pos)).0 += 1;
    }

    let top = freq
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(v, (n, _))| (v.to_string(), *n));

    TextSummary {
        column: column.to_string(),
        count: sarr.len() - sarr.null_count(),
        unique: freq.len(),
        freq: top.as_ref().map_or(0, |(_, n)| *n),
        top: top.map(|(v, _)| v),
    }
}

pub fn describe(batch: &RecordBatch) -> Result<Describe> {
    let schema = batch.schema();
    let mut numeric = Vec::new();
    let mut text = Vec::new();

    for (field, col) in schema.fields().iter().zip(batch.columns()) {
        let dtype = column_dtype(col);
        if dtype.is_numeric() {
            let floats = cast(col.as_ref(), &DataType::Float64)
                .with_context(|| format!("casting `{}` to Float64", field.name()))?;
            let values: Vec<f64> = floats
                .as_any()
                .downcast_ref::<Float64Array>()
                .map(|f| f.iter().flatten().collect())
                .unwrap_or_default();
            numeric.push(summarize_numeric(field.name(), &values));
        } else if let Some(sarr) = col.as_any().downcast_ref::<StringArray>() {
            text.push(summarize_text(field.name(), sarr));
        }
    }

    Ok(if numeric.is_empty() {
        Describe::Text(text)
    } else {
        Describe::Numeric(numeric)
    })
}

/// Gather every diagnostic for `batch`.
#[tracing::instrument(level = "info", skip(batch), fields(rows = batch.num_rows()))]
pub fn profile_table(batch: &RecordBatch, preview_rows: usize) -> Result<Profile> {
    let profile = Profile {
        rows: batch.num_rows(),
        columns: batch.num_columns(),
        head: head(batch, preview_rows),
        info: column_info(batch),
        describe: describe(batch)?,
        null_counts: null_counts(batch),
        duplicate_rows: duplicate_count(batch)?,
    };
    debug!(duplicates = profile.duplicate_rows, "profiled");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{from_columns, with_column};
    use arrow::array::{BooleanArray, Int64Array};
    use std::sync::Arc;

    fn raw() -> Result<RecordBatch> {
        from_columns(&[
            ("first_name", vec![Some("Aleshia"), Some("Evan"), Some("Aleshia"), None]),
            ("postal", vec![Some("CT2 7PP"), Some("BS3 3DT"), Some("CT2 7PP"), None]),
            ("score", vec![Some("1"), Some("2"), Some("1"), Some("4.5")]),
        ])
    }

    #[test]
    fn test_column_info() -> Result<()> {
        let info = column_info(&raw()?);
        assert_eq!(info[0].dtype, DataType::Utf8);
        assert_eq!(info[0].non_null, 3);
        assert_eq!(info[2].dtype, DataType::Float64);
        assert_eq!(info[2].non_null, 4);
        Ok(())
    }

    #[test]
    fn test_null_and_duplicate_counts() -> Result<()> {
        let profile = profile_table(&raw()?, 2)?;
        assert_eq!(profile.rows, 4);
        assert_eq!(profile.head.num_rows(), 2);
        assert_eq!(
            profile.null_counts,
            vec![
                ("first_name".to_string(), 1),
                ("postal".to_string(), 1),
                ("score".to_string(), 0)
            ]
        );
        assert_eq!(profile.duplicate_rows, 1);
        Ok(())
    }

    #[test]
    fn test_describe_numeric() -> Result<()> {
        let Describe::Numeric(stats) = describe(&raw()?)? else {
            panic!("expected numeric describe");
        };
        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!(s.column, "score");
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.125).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.q25, 1.0);
        assert_eq!(s.median, 1.5);
        assert!((s.q75 - 2.625).abs() < 1e-12);
        assert_eq!(s.max, 4.5);
        assert!((s.std - 1.652019).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_describe_text_when_nothing_numeric() -> Result<()> {
        let batch = raw()?.project(&[0, 1])?;
        let Describe::Text(stats) = describe(&batch)? else {
            panic!("expected text describe");
        };
        assert_eq!(
            stats[0],
            TextSummary {
                column: "first_name".into(),
                count: 3,
                unique: 2,
                top: Some("Aleshia".into()),
                freq: 2,
            }
        );
        Ok(())
    }

    #[test]
    fn test_native_columns_keep_their_type() -> Result<()> {
        let batch = with_column(&raw()?, "n", Arc::new(Int64Array::from(vec![Some(3), None, Some(5), Some(7)])))?;
        let batch = with_column(&batch, "flag", Arc::new(BooleanArray::from(vec![true, false, true, true])))?;
        let info = column_info(&batch);
        assert_eq!(info[3].dtype, DataType::Int64);
        assert_eq!(info[3].non_null, 3);
        assert_eq!(info[4].dtype, DataType::Boolean);

        let Describe::Numeric(stats) = describe(&batch)? else {
            panic!("expected numeric describe");
        };
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].column, "n");
        assert_eq!(stats[1].median, 5.0);
        Ok(())
    }

    #[test]
    fn test_text_top_ties_go_to_first_seen() {
        let sarr = StringArray::from(vec![Some("b"), Some("a"), Some("a"), Some("b")]);
        let s = summarize_text("x", &sarr);
        assert_eq!(s.top.as_deref(), Some("b"));
        assert_eq!(s.freq, 2);
    }
}
