use tracing::info;

use crate::clean::{clean_listings, load_raw_listings, CleanStats};
use crate::config::PipelineConfig;
use crate::engineer::{engineer, model_table, AnalysisTable, ModelTable, ReferenceData};
use crate::error::Result;
use crate::listing::RawListing;
use crate::output::{stage_analysis, stage_model};

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub clean: CleanStats,
    pub analysis_rows: usize,
    pub model_rows: usize,
}

/// Clean, enrich and split without touching the filesystem.
pub fn build_tables(
    raw: Vec<RawListing>,
    refs: &ReferenceData,
    config: &PipelineConfig,
) -> (AnalysisTable, ModelTable, CleanStats) {
    let (listings, stats) = clean_listings(raw, config);
    let analysis = engineer(listings, refs, config);
    let model = model_table(&analysis, config);
    (analysis, model, stats)
}

/// Runs the whole batch. Every input is read and both tables are fully written
/// to temporary files before either output path is touched.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    config.validate()?;

    let raw = load_raw_listings(&config.inputs.listings)?;
    let refs = ReferenceData::load(config)?;
    let (analysis, model, clean) = build_tables(raw, &refs, config);

    let staged_analysis = stage_analysis(&config.outputs.analysis, &analysis)?;
    let staged_model = stage_model(&config.outputs.model, &model)?;
    let analysis_rows = staged_analysis.persist()?;
    let model_rows = staged_model.persist()?;

    info!("done: {} analysis rows, {} model rows", analysis_rows, model_rows);

    Ok(RunSummary {
        clean,
        analysis_rows,
        model_rows,
    })
}
