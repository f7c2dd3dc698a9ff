//! Dataset JSON export.
//!
//! The JSON file is the portable form of a pipeline run: merged short-horizon
//! series, one panel per historical family and the calendar overlays. It is
//! what a plotting front-end consumes.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::HeatmapDataset;
use crate::error::{PipelineError, Result};

#[derive(Serialize)]
struct DatasetFile<'a> {
    tool: &'static str,
    version: &'static str,
    #[serde(flatten)]
    dataset: &'a HeatmapDataset,
}

/// Write the full dataset as pretty-printed JSON.
pub fn write_dataset_json(path: &Path, dataset: &HeatmapDataset) -> Result<()> {
    let file = File::create(path).map_err(|e| PipelineError::io(path.display(), e))?;
    let doc = DatasetFile {
        tool: "heatmap",
        version: env!("CARGO_PKG_VERSION"),
        dataset,
    };
    serde_json::to_writer_pretty(file, &doc).map_err(|e| PipelineError::io(path.display(), e))?;
    tracing::info!(path = %path.display(), panels = dataset.panels.len(), "wrote dataset JSON");
    Ok(())
}
