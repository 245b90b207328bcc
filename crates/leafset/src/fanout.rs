// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-target dataset configurations.
//!
//! Every `(subset, target)` pair becomes one self-contained configuration
//! directory holding three artifacts:
//!
//! ```text
//! all_parquet_configs/
//! ├── all_plants/
//! │   └── all_plants_plant_disease/
//! │       ├── all_plants_plant_disease.parquet         image, target (integer code)
//! │       ├── all_plants_plant_disease_mapping.json    {"0": "<label>", ...}
//! │       └── all_plants_plant_disease.csv             leaf_ID, plant_disease
//! └── by_plant/
//!     └── Tomato/
//!         └── Tomato_disease/
//!             └── ...
//! ```
//!
//! The CSV side table keeps the original target values next to each row's
//! `leaf_ID` so embeddings computed later from the Parquet images can be
//! associated with a target again without decoding any image.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use polars::prelude::*;
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    Error, MaterializedRecord, NormalizedRecord,
    normalize::{
        DISEASE_BINARY_COLUMN, DISEASE_COLUMN, FILE_NAME_COLUMN, FULL_NAME_COLUMN,
        LEAF_ID_COLUMN, PLANT_COLUMN, PLANT_DISEASE_COLUMN,
    },
    table::{TableFormat, write_table},
};

/// Default root directory of the generated configurations.
pub const DEFAULT_OUTPUT_DIR: &str = "all_parquet_configs";

/// Name of the subset covering every plant.
pub const ALL_PLANTS: &str = "all_plants";

/// Directory holding the per-plant subsets.
pub const BY_PLANT: &str = "by_plant";

/// Column holding the image payload in generated tables.
pub const IMAGE_COLUMN: &str = "image";

/// Column holding the integer class code in generated tables.
pub const TARGET_COLUMN: &str = "target";

/// Targets generated for the all-plants subset.
pub const ALL_PLANTS_TARGETS: &[TargetColumn] =
    &[TargetColumn::PlantDisease, TargetColumn::DiseaseBinary];

/// Targets generated for every per-plant subset.
pub const PLANT_TARGETS: &[TargetColumn] = &[TargetColumn::Disease, TargetColumn::DiseaseBinary];

/// A class label value taken from a target column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Text(String),
    Integer(i64),
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassLabel::Text(s) => write!(f, "{}", s),
            ClassLabel::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl Serialize for ClassLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ClassLabel::Text(s) => serializer.serialize_str(s),
            ClassLabel::Integer(i) => serializer.collect_str(i),
        }
    }
}

impl ClassLabel {
    /// Reinterpret a label read back from a mapping document as a value of
    /// `target`. Integer targets are persisted as decimal strings.
    pub fn for_target(self, target: TargetColumn) -> Result<ClassLabel, Error> {
        match self {
            ClassLabel::Text(s) if target.is_integer() => Ok(ClassLabel::Integer(s.parse()?)),
            ClassLabel::Integer(i) if !target.is_integer() => Ok(ClassLabel::Text(i.to_string())),
            label => Ok(label),
        }
    }
}

impl TryFrom<serde_json::Value> for ClassLabel {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(s) => Ok(ClassLabel::Text(s)),
            serde_json::Value::Number(n) => n.as_i64().map(ClassLabel::Integer).ok_or_else(|| {
                Error::InvalidParameters(format!("class label {} is not an integer", n))
            }),
            other => Err(Error::InvalidParameters(format!(
                "unsupported class label {}",
                other
            ))),
        }
    }
}

/// Columns of the canonical table that can serve as a classification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetColumn {
    LeafId,
    Plant,
    Disease,
    PlantDisease,
    DiseaseBinary,
    FullName,
    FileName,
}

impl TargetColumn {
    /// Column name as written in generated artifacts.
    pub fn name(&self) -> &'static str {
        match self {
            TargetColumn::LeafId => LEAF_ID_COLUMN,
            TargetColumn::Plant => PLANT_COLUMN,
            TargetColumn::Disease => DISEASE_COLUMN,
            TargetColumn::PlantDisease => PLANT_DISEASE_COLUMN,
            TargetColumn::DiseaseBinary => DISEASE_BINARY_COLUMN,
            TargetColumn::FullName => FULL_NAME_COLUMN,
            TargetColumn::FileName => FILE_NAME_COLUMN,
        }
    }

    /// Value of this column in `record`.
    pub fn value(&self, record: &NormalizedRecord) -> ClassLabel {
        match self {
            TargetColumn::LeafId => ClassLabel::Integer(record.leaf_id as i64),
            TargetColumn::Plant => ClassLabel::Text(record.plant.clone()),
            TargetColumn::Disease => ClassLabel::Text(record.disease.clone()),
            TargetColumn::PlantDisease => ClassLabel::Text(record.plant_disease.clone()),
            TargetColumn::DiseaseBinary => ClassLabel::Integer(i64::from(record.disease_binary)),
            TargetColumn::FullName => ClassLabel::Text(record.full_name.clone()),
            TargetColumn::FileName => ClassLabel::Text(record.file_name.clone()),
        }
    }

    /// Whether the values of this column are integers.
    pub fn is_integer(&self) -> bool {
        matches!(self, TargetColumn::LeafId | TargetColumn::DiseaseBinary)
    }

    /// Parse a list of column names, failing on the first unknown one.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<TargetColumn>, Error> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl FromStr for TargetColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TargetColumn::LeafId,
            TargetColumn::Plant,
            TargetColumn::Disease,
            TargetColumn::PlantDisease,
            TargetColumn::DiseaseBinary,
            TargetColumn::FullName,
            TargetColumn::FileName,
        ]
        .into_iter()
        .find(|column| column.name() == s)
        .ok_or_else(|| Error::MissingColumn(format!("no target column named {:?}", s)))
    }
}

impl std::fmt::Display for TargetColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bijection between the class labels of one target and `0..len()`.
///
/// Codes are handed out in first-seen order. The mapping serializes as the
/// code-to-label document `{"0": <label>, "1": <label>, ...}` with keys in
/// ascending numeric order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMapping {
    labels: Vec<ClassLabel>,
    codes: HashMap<ClassLabel, u32>,
}

impl ClassMapping {
    /// Build a mapping over the distinct `values`, in first-seen order.
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a ClassLabel>,
    {
        let labels: Vec<ClassLabel> = values.into_iter().unique().cloned().collect();
        let codes = labels.iter().cloned().zip(0u32..).collect();
        ClassMapping { labels, codes }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels ordered by their code.
    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn code(&self, label: &ClassLabel) -> Option<u32> {
        self.codes.get(label).copied()
    }

    pub fn label(&self, code: u32) -> Option<&ClassLabel> {
        self.labels.get(code as usize)
    }

    /// Replace every value by its code.
    pub fn encode(&self, values: &[ClassLabel]) -> Result<Vec<u32>, Error> {
        values
            .iter()
            .map(|value| {
                self.code(value).ok_or_else(|| {
                    Error::InvalidParameters(format!("label {} has no class code", value))
                })
            })
            .collect()
    }

    /// Replace every code by its label.
    pub fn decode(&self, codes: &[u32]) -> Result<Vec<ClassLabel>, Error> {
        codes
            .iter()
            .map(|&code| {
                self.label(code).cloned().ok_or_else(|| {
                    Error::InvalidParameters(format!("class code {} is out of range", code))
                })
            })
            .collect()
    }

    /// Rebuild a mapping from its persisted code-to-label document.
    ///
    /// The keys must be exactly the decimal integers `0..n`.
    pub fn from_document(document: serde_json::Map<String, serde_json::Value>) -> Result<Self, Error> {
        let mut by_code: Vec<(u32, ClassLabel)> = document
            .into_iter()
            .map(|(key, value)| -> Result<(u32, ClassLabel), Error> {
                let code = key.parse::<u32>()?;
                Ok((code, ClassLabel::try_from(value)?))
            })
            .collect::<Result<_, _>>()?;
        by_code.sort_by_key(|(code, _)| *code);

        if by_code.iter().zip(0u32..).any(|((code, _), expected)| *code != expected) {
            return Err(Error::InvalidParameters(
                "class codes are not the dense range 0..n".to_owned(),
            ));
        }

        let labels: Vec<ClassLabel> = by_code.into_iter().map(|(_, label)| label).collect();
        if labels.iter().unique().count() != labels.len() {
            return Err(Error::InvalidParameters(
                "class mapping assigns one label to several codes".to_owned(),
            ));
        }

        Ok(ClassMapping::from_values(&labels))
    }

    /// Read a mapping document written by [`ClassMapping::write_json`].
    pub fn read_json(path: &Path) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let document: serde_json::Map<String, serde_json::Value> =
            serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    /// Read a mapping document and type its labels as values of `target`.
    pub fn read_target_json(path: &Path, target: TargetColumn) -> Result<Self, Error> {
        let labels = Self::read_json(path)?
            .labels
            .into_iter()
            .map(|label| label.for_target(target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ClassMapping::from_values(&labels))
    }

    /// Write the code-to-label document to `path`.
    ///
    /// Keys and values are strings: integer labels are written in decimal.
    pub fn write_json(&self, path: &Path) -> Result<(), Error> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

impl Serialize for ClassMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.labels.len()))?;
        for (code, label) in self.labels.iter().enumerate() {
            map.serialize_entry(&code.to_string(), label)?;
        }
        map.end()
    }
}

/// Files written for one `(subset, target)` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifacts {
    /// `<subset>_<target>`.
    pub name: String,
    pub target: TargetColumn,
    pub dir: PathBuf,
    /// Image and integer target table.
    pub table: PathBuf,
    /// Code-to-label mapping document.
    pub mapping: PathBuf,
    /// `leaf_ID` and original target value table.
    pub leaf_table: PathBuf,
    pub rows: usize,
    pub classes: usize,
}

/// Single-target projection of a subset: `(image, target)` pairs.
pub fn project_target<'a>(
    records: &[&'a MaterializedRecord],
    target: TargetColumn,
) -> (Vec<&'a [u8]>, Vec<ClassLabel>) {
    records
        .iter()
        .map(|r| (r.image.as_slice(), target.value(&r.record)))
        .unzip()
}

/// Writes dataset configurations below a root directory.
#[derive(Debug, Clone)]
pub struct FanoutWriter {
    root: PathBuf,
}

impl FanoutWriter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the all-plants subset and one subset per plant.
    ///
    /// Plants are visited in the order they first appear in `records`.
    pub fn write_all(
        &self,
        records: &[MaterializedRecord],
        all_plants_targets: &[TargetColumn],
        plant_targets: &[TargetColumn],
    ) -> Result<Vec<ConfigArtifacts>, Error> {
        std::fs::create_dir_all(&self.root)?;

        let everything: Vec<&MaterializedRecord> = records.iter().collect();
        let mut artifacts = self.write_subset(
            &everything,
            ALL_PLANTS,
            &self.root.join(ALL_PLANTS),
            all_plants_targets,
        )?;

        let by_plant = self.root.join(BY_PLANT);
        std::fs::create_dir_all(&by_plant)?;

        for plant in records.iter().map(|r| r.record.plant.as_str()).unique() {
            let subset: Vec<&MaterializedRecord> =
                records.iter().filter(|r| r.record.plant == plant).collect();
            artifacts.extend(self.write_subset(
                &subset,
                plant,
                &by_plant.join(plant),
                plant_targets,
            )?);
        }

        Ok(artifacts)
    }

    /// Write one configuration per target for a single subset.
    ///
    /// Each configuration lands in `<subset_dir>/<subset_name>_<target>/`. An
    /// empty subset still produces every artifact, with an empty mapping.
    pub fn write_subset(
        &self,
        records: &[&MaterializedRecord],
        subset_name: &str,
        subset_dir: &Path,
        targets: &[TargetColumn],
    ) -> Result<Vec<ConfigArtifacts>, Error> {
        log::info!("Creating configurations for subset {}...", subset_name);

        targets
            .iter()
            .map(|&target| {
                let name = format!("{}_{}", subset_name, target);
                log::info!("\tDataset configuration: {}", name);
                write_config(records, target, &name, &subset_dir.join(&name))
            })
            .collect()
    }
}

fn write_config(
    records: &[&MaterializedRecord],
    target: TargetColumn,
    name: &str,
    dir: &Path,
) -> Result<ConfigArtifacts, Error> {
    std::fs::create_dir_all(dir)?;

    let (images, values) = project_target(records, target);
    let mapping = ClassMapping::from_values(&values);
    let codes: Vec<i64> = mapping
        .encode(&values)?
        .into_iter()
        .map(i64::from)
        .collect();

    let table = dir.join(format!("{}.parquet", name));
    let mut df = DataFrame::new(vec![
        BinaryChunked::from_slice(IMAGE_COLUMN.into(), &images)
            .into_series()
            .into(),
        Series::new(TARGET_COLUMN.into(), codes).into(),
    ])?;
    write_table(&mut df, &table, TableFormat::Parquet)?;
    log::info!("\t\tCreated {:?}", table);

    let mapping_path = dir.join(format!("{}_mapping.json", name));
    mapping.write_json(&mapping_path)?;
    log::info!("\t\tCreated {:?}", mapping_path);

    let leaf_table = dir.join(format!("{}.csv", name));
    let mut df = leaf_target_dataframe(records, target)?;
    write_table(&mut df, &leaf_table, TableFormat::Csv)?;
    log::info!("\t\tCreated {:?}", leaf_table);

    Ok(ConfigArtifacts {
        name: name.to_owned(),
        target,
        dir: dir.to_path_buf(),
        table,
        mapping: mapping_path,
        leaf_table,
        rows: records.len(),
        classes: mapping.len(),
    })
}

/// `leaf_ID` next to the original value of `target` for every row.
pub fn leaf_target_dataframe(
    records: &[&MaterializedRecord],
    target: TargetColumn,
) -> Result<DataFrame, Error> {
    let leaf_ids: Vec<i64> = records.iter().map(|r| r.record.leaf_id as i64).collect();
    let leaf_ids = Series::new(LEAF_ID_COLUMN.into(), leaf_ids);

    let values = records.iter().map(|r| target.value(&r.record));
    let values = if target.is_integer() {
        let ints: Vec<Option<i64>> = values
            .map(|v| match v {
                ClassLabel::Integer(i) => Some(i),
                ClassLabel::Text(_) => None,
            })
            .collect();
        Series::new(target.name().into(), ints)
    } else {
        let texts: Vec<String> = values.map(|v| v.to_string()).collect();
        Series::new(target.name().into(), texts)
    };

    Ok(DataFrame::new(vec![leaf_ids.into(), values.into()])?)
}
