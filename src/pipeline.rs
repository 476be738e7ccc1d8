use crate::{
    fetch::{self, UK500_CSV_URL},
    process::{
        clean::{clean_table, CleanStats},
        derive::derive_features,
        segment::{segment_table, SegmentOptions, Segments},
    },
    profile::{profile_table, Profile},
};
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_url: String,
    /// Rows shown by the profiler preview.
    pub preview_rows: usize,
    pub segments: SegmentOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: UK500_CSV_URL.to_string(),
            preview_rows: 5,
            segments: SegmentOptions::default(),
        }
    }
}

/// Everything one run produced. The raw table is kept untouched; `derived`
/// is the cleaned table with the feature columns added.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub raw: RecordBatch,
    pub raw_profile: Profile,
    pub clean_stats: CleanStats,
    pub clean_profile: Profile,
    pub derived: RecordBatch,
    pub segments: Segments,
}

/// Counts for the end-of-run log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub raw_rows: usize,
    pub raw_duplicates: usize,
    pub clean: CleanStats,
    pub derived_columns: usize,
    pub gmail_users: usize,
    pub llc_ltd_companies: usize,
    pub london_users: usize,
    pub long_company_names: usize,
    pub first_rows: usize,
    pub every_nth: usize,
    pub sample: usize,
}

impl PipelineRun {
    pub fn summary(&self) -> RunSummary {
        let s = &self.segments;
        RunSummary {
            raw_rows: self.raw.num_rows(),
            raw_duplicates: self.raw_profile.duplicate_rows,
            clean: self.clean_stats,
            derived_columns: self.derived.num_columns(),
            gmail_users: s.gmail_users.num_rows(),
            llc_ltd_companies: s.llc_ltd_companies.num_rows(),
            london_users: s.london_users.num_rows(),
            long_company_names: s.long_company_names.num_rows(),
            first_rows: s.first_rows.num_rows(),
            every_nth: s.every_nth.num_rows(),
            sample: s.sample.num_rows(),
        }
    }
}

/// Fetch the configured source and run every stage over it.
pub fn run(client: &Client, config: &PipelineConfig) -> Result<PipelineRun> {
    let raw = fetch::extract(client, &config.source_url)?;
    run_on_table(raw, config)
}

/// Profile → clean → profile → derive → segment over an extracted table.
#[tracing::instrument(level = "info", skip_all, fields(rows = raw.num_rows()))]
pub fn run_on_table(raw: RecordBatch, config: &PipelineConfig) -> Result<PipelineRun> {
    let raw_profile = profile_table(&raw, config.preview_rows).context("profiling raw table")?;
    let (cleaned, clean_stats) = clean_table(&raw).context("cleaning")?;
    let clean_profile =
        profile_table(&cleaned, config.preview_rows).context("profiling cleaned table")?;
    let derived = derive_features(&cleaned).context("deriving features")?;
    let segments = segment_table(&derived, &config.segments).context("segmenting")?;

    info!(
        rows = derived.num_rows(),
        columns = derived.num_columns(),
        "pipeline finished"
    );

    Ok(PipelineRun {
        raw,
        raw_profile,
        clean_stats,
        clean_profile,
        derived,
        segments,
    })
}
