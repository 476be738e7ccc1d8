use crate::{
    pipeline::PipelineRun,
    profile::{head, ColumnInfo, Describe, Profile},
};
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray, UInt64Array},
    record_batch::RecordBatch,
    util::pretty::pretty_format_batches,
};
use std::{io::Write, sync::Arc};

const FEATURE_PREVIEW_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "full_name",
    "email",
    "email_domain",
    "city",
    "city_length",
    "is_gmail",
    "company_name",
    "company_word_count",
];

fn render<W: Write>(out: &mut W, batch: &RecordBatch) -> Result<()> {
    let table = pretty_format_batches(std::slice::from_ref(batch)).context("formatting table")?;
    writeln!(out, "{}", table)?;
    Ok(())
}

fn counts(values: impl IntoIterator<Item = usize>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(
        values.into_iter().map(|v| v as u64),
    ))
}

pub fn info_batch(info: &[ColumnInfo]) -> Result<RecordBatch> {
    let names: StringArray = info.iter().map(|c| Some(c.name.as_str())).collect();
    let dtypes: StringArray = info.iter().map(|c| Some(c.dtype.to_string())).collect();
    RecordBatch::try_from_iter(vec![
        ("column", Arc::new(names) as ArrayRef),
        ("non_null", counts(info.iter().map(|c| c.non_null))),
        ("dtype", Arc::new(dtypes) as ArrayRef),
    ])
    .context("building info table")
}

/// One row per statistic and one column per described column.
pub fn describe_batch(describe: &Describe) -> Result<RecordBatch> {
    let mut columns: Vec<(String, ArrayRef)> = Vec::new();
    match describe {
        Describe::Numeric(stats) => {
            let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
            columns.push(("stat".into(), Arc::new(StringArray::from(labels.to_vec())) as ArrayRef));
            for s in stats {
                let values = vec![
                    s.count as f64,
                    s.mean,
                    s.std,
                    s.min,
                    s.q25,
                    s.median,
                    s.q75,
                    s.max,
                ];
                columns.push((s.column.clone(), Arc::new(Float64Array::from(values)) as ArrayRef));
            }
        }
        Describe::Text(stats) => {
            let labels = ["count", "unique", "top", "freq"];
            columns.push(("stat".into(), Arc::new(StringArray::from(labels.to_vec())) as ArrayRef));
            for s in stats {
                let values = vec![
                    Some(s.count.to_string()),
                    Some(s.unique.to_string()),
                    s.top.clone(),
                    Some(s.freq.to_string()),
                ];
                columns.push((s.column.clone(), Arc::new(StringArray::from(values)) as ArrayRef));
            }
        }
    }
    RecordBatch::try_from_iter(columns).context("building describe table")
}

pub fn null_batch(null_counts: &[(String, usize)]) -> Result<RecordBatch> {
    let names: StringArray = null_counts.iter().map(|(n, _)| Some(n.as_str())).collect();
    RecordBatch::try_from_iter(vec![
        ("column", Arc::new(names) as ArrayRef),
        ("nulls", counts(null_counts.iter().map(|(_, n)| *n))),
    ])
    .context("building null count table")
}

fn write_profile<W: Write>(out: &mut W, profile: &Profile) -> Result<()> {
    writeln!(out, "=== HEAD ===")?;
    render(out, &profile.head)?;

    writeln!(out, "\n=== INFO ===")?;
    writeln!(out, "{} rows x {} columns", profile.rows, profile.columns)?;
    render(out, &info_batch(&profile.info)?)?;

    writeln!(out, "\n=== DESCRIBE ===")?;
    render(out, &describe_batch(&profile.describe)?)?;

    writeln!(out, "\n=== NULLS ===")?;
    render(out, &null_batch(&profile.null_counts)?)?;

    writeln!(out, "\n=== DUPLICATES ===")?;
    writeln!(out, "duplicate rows: {}", profile.duplicate_rows)?;
    Ok(())
}

/// Write the human-readable report of a finished run.
pub fn write_report<W: Write>(out: &mut W, run: &PipelineRun, preview_rows: usize) -> Result<()> {
    write_profile(out, &run.raw_profile)?;

    let stats = &run.clean_stats;
    writeln!(out, "\n=== CLEANING ===")?;
    writeln!(out, "rows before cleaning:   {}", stats.input_rows)?;
    writeln!(out, "empty rows dropped:     {}", stats.empty_rows_dropped)?;
    writeln!(out, "duplicate rows dropped: {}", stats.duplicate_rows_dropped)?;
    writeln!(out, "rows after cleaning:    {}", stats.output_rows)?;
    writeln!(out, "\nnulls after cleaning:")?;
    render(out, &null_batch(&run.clean_profile.null_counts)?)?;

    let table = &run.segments.table;
    let schema = table.schema();
    let preview: Vec<usize> = FEATURE_PREVIEW_COLUMNS
        .iter()
        .filter_map(|name| schema.index_of(name).ok())
        .collect();
    writeln!(out, "\n=== FEATURES ===")?;
    render(out, &head(table, preview_rows).project(&preview)?)?;

    writeln!(out, "\n=== FILTERS ===")?;
    let filters = run.segments.filter_counts();
    let names: StringArray = filters.iter().map(|(n, _)| Some(*n)).collect();
    let filter_batch = RecordBatch::try_from_iter(vec![
        ("view", Arc::new(names) as ArrayRef),
        ("rows", counts(filters.iter().map(|(_, n)| *n))),
    ])?;
    render(out, &filter_batch)?;

    let segs = &run.segments;
    writeln!(out, "\n=== VIEWS ===")?;
    writeln!(out, "first rows ({} rows):", segs.first_rows.num_rows())?;
    render(out, &segs.first_rows)?;
    writeln!(out, "every nth row ({} rows), first {}:", segs.every_nth.num_rows(), preview_rows)?;
    render(out, &head(&segs.every_nth, preview_rows))?;
    writeln!(out, "random sample ({} rows):", segs.sample.num_rows())?;
    render(out, &segs.sample)?;

    Ok(())
}
