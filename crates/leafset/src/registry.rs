// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Leaf registry loading.
//!
//! The leaf registry is a directory of per-plant CSV tables that record which
//! photographed file belongs to which physical leaf. Every table carries at
//! least the [`FILE_NAME_COLUMN`] and [`LEAF_NUM_COLUMN`] columns. Other
//! columns survive the merge but only the two key columns feed
//! [`LeafRegistry::entries`].
//!
//! Tables are merged by column-set union: rows from tables that lack a
//! column hold a null there. Leaf numbers are only unique within a plant, so
//! the registry on its own never identifies a leaf globally.

use std::path::Path;

use polars::prelude::*;
use walkdir::WalkDir;

use crate::Error;

/// Registry column holding the image file name.
pub const FILE_NAME_COLUMN: &str = "File Name";

/// Registry column holding the per-plant leaf number.
pub const LEAF_NUM_COLUMN: &str = "Leaf #";

/// Extension of the registry tables.
pub const REGISTRY_EXTENSION: &str = "csv";

/// One file-to-leaf association taken from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeafRegistryEntry {
    /// Join key matched against [`ImageRecord::img_name`](crate::ImageRecord).
    pub file_name: String,
    /// Leaf number, unique only within one plant.
    pub leaf_num: String,
}

/// Unified view over every registry table in a directory.
#[derive(Debug, Clone, Default)]
pub struct LeafRegistry {
    df: DataFrame,
}

impl LeafRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `tables` by diagonal concatenation.
    pub fn from_tables(tables: Vec<DataFrame>) -> Result<Self, Error> {
        if tables.is_empty() {
            return Ok(Self::new());
        }
        let df = polars::functions::concat_df_diagonal(&tables)?;
        Ok(LeafRegistry { df })
    }

    /// The merged table. Columns keep the order they were first seen in.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// File-to-leaf associations of every row that names both a file and a
    /// leaf.
    ///
    /// An empty registry yields no entries. A non-empty registry without the
    /// key columns is malformed.
    pub fn entries(&self) -> Result<Vec<LeafRegistryEntry>, Error> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let file_names = self.key_column(FILE_NAME_COLUMN)?;
        let leaf_nums = self.key_column(LEAF_NUM_COLUMN)?;

        let entries: Vec<_> = file_names
            .str()?
            .into_iter()
            .zip(leaf_nums.str()?.into_iter())
            .filter_map(|(file_name, leaf_num)| {
                Some(LeafRegistryEntry {
                    file_name: file_name?.to_owned(),
                    leaf_num: leaf_num?.to_owned(),
                })
            })
            .collect();

        if entries.len() < self.len() {
            log::debug!(
                "Ignoring {} registry rows without a file name or leaf number",
                self.len() - entries.len()
            );
        }

        Ok(entries)
    }

    fn key_column(&self, name: &str) -> Result<Column, Error> {
        let column = self
            .df
            .column(name)
            .map_err(|_| Error::MissingColumn(format!("leaf registry has no {:?}", name)))?;
        Ok(column.cast(&DataType::String)?)
    }
}

/// Read one registry table with every column typed as a string.
pub fn read_registry_table(path: &Path) -> Result<DataFrame, Error> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Load and merge every registry table found directly inside `dir`.
///
/// Tables are read in file name order, but callers should only rely on the
/// content of the merged rows, not their order. Zero-byte files and files
/// without the `.csv` extension contribute nothing.
pub fn load_leaf_registry(dir: &Path) -> Result<LeafRegistry, Error> {
    let mut tables = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type().is_file() || !is_registry_table(path) {
            log::debug!("Skipping {:?}", path);
            continue;
        }

        if entry.metadata()?.len() == 0 {
            log::debug!("Skipping empty registry table {:?}", path);
            continue;
        }

        let df = read_registry_table(path)?;
        log::info!("Loaded {} leaf records from {:?}", df.height(), path);
        tables.push(df);
    }

    LeafRegistry::from_tables(tables)
}

fn is_registry_table(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(REGISTRY_EXTENSION))
        .unwrap_or(false)
}
