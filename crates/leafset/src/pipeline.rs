// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end dataset curation.
//!
//! Stages run strictly one after another, each fully materializing its table
//! before the next starts:
//!
//! ```text
//! extract_labels ─► retain_multi_class_plants ─► load_leaf_registry ─►
//! normalize ─► materialize ─► FanoutWriter::write_all
//! ```

use std::path::{Path, PathBuf};

use crate::{
    ConfigArtifacts, Error, FanoutWriter, ImageCodec, JpegCodec, NormalizedRecord, Progress,
    TargetColumn,
    fanout::{ALL_PLANTS_TARGETS, DEFAULT_OUTPUT_DIR, PLANT_TARGETS},
    labels::extract_labels,
    materialize::materialize,
    normalize::{metadata_dataframe, normalize, retain_multi_class_plants},
    registry::load_leaf_registry,
    table::{TableFormat, write_table},
};

/// Inputs and settings of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Root of the folder-per-class image corpus.
    pub dataset: PathBuf,
    /// Directory of leaf registry tables.
    pub leaf_maps: PathBuf,
    /// Root directory of the generated configurations.
    pub output: PathBuf,
    /// Quality of the JPEG re-encoding.
    pub jpeg_quality: u8,
    /// Optional destination of the canonical table, without images.
    pub metadata: Option<PathBuf>,
    /// Targets of the all-plants subset.
    pub all_plants_targets: Vec<String>,
    /// Targets of every per-plant subset.
    pub plant_targets: Vec<String>,
}

impl PipelineOptions {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(dataset: P, leaf_maps: Q) -> Self {
        Self {
            dataset: dataset.into(),
            leaf_maps: leaf_maps.into(),
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            jpeg_quality: JpegCodec::DEFAULT_QUALITY,
            metadata: None,
            all_plants_targets: target_names(ALL_PLANTS_TARGETS),
            plant_targets: target_names(PLANT_TARGETS),
        }
    }

    pub fn with_output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_metadata<P: Into<PathBuf>>(mut self, metadata: Option<P>) -> Self {
        self.metadata = metadata.map(Into::into);
        self
    }

    pub fn with_all_plants_targets(mut self, targets: Vec<String>) -> Self {
        self.all_plants_targets = targets;
        self
    }

    pub fn with_plant_targets(mut self, targets: Vec<String>) -> Self {
        self.plant_targets = targets;
        self
    }
}

fn target_names(targets: &[TargetColumn]) -> Vec<String> {
    targets.iter().map(|t| t.name().to_owned()).collect()
}

/// Row counts after each stage and the configurations written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub extracted: usize,
    pub retained: usize,
    pub normalized: usize,
    pub materialized: usize,
    pub configs: Vec<ConfigArtifacts>,
}

/// Run the pipeline with the default JPEG codec.
pub fn run<F>(options: &PipelineOptions, progress: F) -> Result<PipelineSummary, Error>
where
    F: FnMut(Progress),
{
    let codec = JpegCodec::new(options.jpeg_quality);
    run_with_codec(options, &codec, progress)
}

/// Run the pipeline, re-encoding images with `codec`.
///
/// Target names are validated before any image is touched.
pub fn run_with_codec<C, F>(
    options: &PipelineOptions,
    codec: &C,
    progress: F,
) -> Result<PipelineSummary, Error>
where
    C: ImageCodec + ?Sized,
    F: FnMut(Progress),
{
    let all_plants_targets = TargetColumn::parse_list(&options.all_plants_targets)?;
    let plant_targets = TargetColumn::parse_list(&options.plant_targets)?;

    let images = extract_labels(&options.dataset)?;
    let extracted = images.len();
    log::info!("Found {} images in {:?}", extracted, options.dataset);

    let images = retain_multi_class_plants(images);
    let retained = images.len();

    let registry = load_leaf_registry(&options.leaf_maps)?;
    let normalized = normalize(&images, &registry)?;
    log::info!("{} images associated with a leaf", normalized.len());

    if let Some(path) = &options.metadata {
        write_metadata(&normalized, path)?;
    }

    let normalized_count = normalized.len();
    let materialized = materialize(normalized, &options.dataset, codec, progress)?;

    let configs = FanoutWriter::new(&options.output).write_all(
        &materialized,
        &all_plants_targets,
        &plant_targets,
    )?;

    Ok(PipelineSummary {
        extracted,
        retained,
        normalized: normalized_count,
        materialized: materialized.len(),
        configs,
    })
}

fn write_metadata(records: &[NormalizedRecord], path: &Path) -> Result<(), Error> {
    let format = TableFormat::from_path(path)?;
    let mut df = metadata_dataframe(records)?;
    write_table(&mut df, path, format)?;
    log::info!("Created {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = PipelineOptions::new("dataset", "leaf-maps");
        assert_eq!(options.output, PathBuf::from("all_parquet_configs"));
        assert_eq!(options.jpeg_quality, 75);
        assert_eq!(options.all_plants_targets, ["plant_disease", "disease_binary"]);
        assert_eq!(options.plant_targets, ["disease", "disease_binary"]);
        assert!(options.metadata.is_none());
    }

    #[test]
    fn test_unknown_target_fails_before_extraction() {
        let options = PipelineOptions::new("/nonexistent/dataset", "/nonexistent/maps")
            .with_plant_targets(vec!["severity".to_owned()]);
        let result = run(&options, |_| {});
        assert!(matches!(result, Err(Error::MissingColumn(_))));
    }
}
