// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Reading and writing tabular artifacts by file extension.

use std::{
    fs::File,
    io::BufWriter,
    path::Path,
    str::FromStr,
};

use polars::prelude::*;

use crate::Error;

/// On-disk table formats understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Apache Parquet, the columnar artifact format.
    Parquet,
    /// Comma separated values with a header row.
    Csv,
    /// Arrow IPC file.
    Ipc,
}

impl TableFormat {
    /// Infer the format from the extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(format!("{:?} has no extension", path)))?
            .parse()
    }

    /// Canonical file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Csv => "csv",
            TableFormat::Ipc => "arrow",
        }
    }
}

impl FromStr for TableFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parquet" | "pq" => Ok(TableFormat::Parquet),
            "csv" => Ok(TableFormat::Csv),
            "arrow" | "ipc" | "feather" => Ok(TableFormat::Ipc),
            other => Err(Error::UnsupportedFormat(other.to_owned())),
        }
    }
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Read a table, choosing the reader from the file extension.
pub fn read_table(path: &Path) -> Result<DataFrame, Error> {
    let df = match TableFormat::from_path(path)? {
        TableFormat::Parquet => ParquetReader::new(File::open(path)?).finish()?,
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        TableFormat::Ipc => IpcReader::new(File::open(path)?).finish()?,
    };
    Ok(df)
}

/// Write `df` to `path`, replacing any existing file.
pub fn write_table(df: &mut DataFrame, path: &Path, format: TableFormat) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let writer = BufWriter::new(File::create(path)?);
    match format {
        TableFormat::Parquet => {
            ParquetWriter::new(writer).finish(df)?;
        }
        TableFormat::Csv => {
            CsvWriter::new(writer).include_header(true).finish(df)?;
        }
        TableFormat::Ipc => {
            IpcWriter::new(writer).finish(df)?;
        }
    }

    Ok(())
}
