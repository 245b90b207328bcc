// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Embedding reattachment.
//!
//! Joins a saved metadata table (for example a configuration's
//! `leaf_ID,<target>` CSV) with an embedding table produced by an external
//! model from the matching Parquet images. The two tables are aligned by row
//! position only. This is a best-effort join: when the embedding step dropped
//! or reordered rows the result is silently wrong, and the only safeguard is
//! a warning when the row counts differ.
//!
//! Row alignment follows the metadata table: surplus embedding rows are
//! dropped and missing ones are filled with nulls.

use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::{
    Error,
    table::{TableFormat, read_table, write_table},
};

/// Suffix appended to the embedding table's stem to name the combined table.
pub const COMPLETE_SUFFIX: &str = "-complete";

/// Result of [`reattach_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReattachSummary {
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Where the combined table for `metadata` and `embedded` is written.
///
/// The file is named `<embedded-stem>-complete.<ext>`. It is placed next to
/// the inputs when both live in the same directory, otherwise in the working
/// directory.
pub fn output_path(metadata: &Path, embedded: &Path, format: TableFormat) -> Result<PathBuf, Error> {
    let stem = embedded
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidParameters(format!("{:?} has no file name", embedded)))?;
    let name = format!("{}{}.{}", stem, COMPLETE_SUFFIX, format.extension());

    match (metadata.parent(), embedded.parent()) {
        (Some(meta_dir), Some(embedded_dir)) if meta_dir == embedded_dir => {
            Ok(meta_dir.join(name))
        }
        _ => Ok(PathBuf::from(name)),
    }
}

/// Truncate or null-pad `df` to exactly `height` rows.
pub fn align_rows(df: DataFrame, height: usize) -> Result<DataFrame, Error> {
    if df.height() >= height {
        return Ok(df.slice(0, height));
    }

    let missing = height - df.height();
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            let mut series = column.as_materialized_series().clone();
            series.append(&Series::full_null(
                column.name().clone(),
                missing,
                column.dtype(),
            ))?;
            Ok(series.into())
        })
        .collect::<Result<Vec<Column>, Error>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Place the columns of `embedded` next to those of `metadata`, row by row.
pub fn reattach(metadata: &DataFrame, embedded: DataFrame) -> Result<DataFrame, Error> {
    if let Some(name) = embedded
        .get_column_names()
        .into_iter()
        .find(|name| metadata.column(name.as_str()).is_ok())
    {
        return Err(Error::InvalidParameters(format!(
            "column {:?} exists in both tables",
            name.as_str()
        )));
    }

    if metadata.height() != embedded.height() {
        log::warn!(
            "Row count mismatch: metadata has {} rows, embeddings have {}; rows are aligned by position only",
            metadata.height(),
            embedded.height()
        );
    }

    let embedded = align_rows(embedded, metadata.height())?;
    Ok(metadata.hstack(embedded.get_columns())?)
}

/// Read both tables, reattach them and write the combined table.
pub fn reattach_files(
    metadata_path: &Path,
    embedded_path: &Path,
    format: TableFormat,
) -> Result<ReattachSummary, Error> {
    let metadata = read_table(metadata_path)?;
    let embedded = read_table(embedded_path)?;

    let mut combined = reattach(&metadata, embedded)?;
    let output = output_path(metadata_path, embedded_path, format)?;
    write_table(&mut combined, &output, format)?;

    Ok(ReattachSummary {
        output,
        rows: combined.height(),
        columns: combined.width(),
    })
}
