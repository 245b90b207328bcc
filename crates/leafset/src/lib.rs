// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Leafset
//!
//! Leaf-aware curation of plant disease image corpora. The library turns a
//! folder-per-class image collection (`<plant>___<disease>/<image>`) and a
//! directory of leaf registry tables into a family of ready-to-train dataset
//! configurations.
//!
//! ## Pipeline
//!
//! - **Label extraction**: every class directory is parsed into plant and
//!   disease; see [`labels`].
//! - **Normalization**: single-class plants are dropped, images are joined
//!   with the leaf registry and every distinct leaf receives a deterministic
//!   `leaf_ID`; see [`normalize`].
//! - **Materialization**: each image is decoded and re-encoded as JPEG; see
//!   [`materialize`].
//! - **Fan-out**: one configuration per `(subset, target)` with a Parquet
//!   table, a mapping document and a leaf table; see [`fanout`].
//! - **Reattachment**: externally computed embeddings are joined back onto a
//!   saved metadata table; see [`reattach`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leafset::{Error, PipelineOptions, run};
//!
//! fn main() -> Result<(), Error> {
//!     let options = PipelineOptions::new("plantvillage/color", "leaf_maps")
//!         .with_output("all_parquet_configs");
//!     let summary = run(&options, |progress| {
//!         println!("{}/{}", progress.current, progress.total);
//!     })?;
//!     println!("Wrote {} configurations", summary.configs.len());
//!     Ok(())
//! }
//! ```

mod error;

pub mod fanout;
pub mod labels;
pub mod materialize;
pub mod normalize;
pub mod pipeline;
pub mod reattach;
pub mod registry;
pub mod table;

pub use crate::{
    error::Error,
    fanout::{ClassLabel, ClassMapping, ConfigArtifacts, FanoutWriter, TargetColumn},
    labels::{ImageRecord, extract_labels},
    materialize::{ImageCodec, JpegCodec, MaterializedRecord, Progress, materialize},
    normalize::{NormalizedRecord, normalize},
    pipeline::{PipelineOptions, PipelineSummary, run, run_with_codec},
    reattach::{ReattachSummary, reattach, reattach_files},
    registry::{LeafRegistry, LeafRegistryEntry, load_leaf_registry},
    table::{TableFormat, read_table, write_table},
};
