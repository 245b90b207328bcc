// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Dataset normalization.
//!
//! Turns the raw [`ImageRecord`] table into the canonical labeled table:
//!
//! 1. [`retain_multi_class_plants`] drops every plant with fewer than two
//!    distinct diseases, since a single-class target cannot be trained on.
//! 2. [`join_leaf_registry`] keeps only images the leaf registry knows about
//!    and attaches their leaf number.
//! 3. [`assign_leaf_ids`] gives every distinct `(plant, leaf_num, disease)`
//!    triple its own `leaf_ID`. The registry reuses leaf numbers across
//!    plants and across disease subsets, so the triple is the smallest key
//!    that identifies one photographed leaf state.
//! 4. [`disease_binary`] flags healthy rows with `1`.
//!
//! Rows removed by steps 1 and 2 are expected attrition and never an error.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use polars::prelude::*;

use crate::{Error, ImageRecord, LeafRegistry, LeafRegistryEntry};

/// Disease name of healthy specimens.
pub const HEALTHY: &str = "healthy";

pub const LEAF_ID_COLUMN: &str = "leaf_ID";
pub const FULL_NAME_COLUMN: &str = "full_name";
pub const FILE_NAME_COLUMN: &str = "file_name";
pub const PLANT_COLUMN: &str = "plant";
pub const PLANT_DISEASE_COLUMN: &str = "plant_disease";
pub const DISEASE_COLUMN: &str = "disease";
pub const DISEASE_BINARY_COLUMN: &str = "disease_binary";

/// An image matched to its registry entry, before leaf identifiers exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRecord {
    pub image: ImageRecord,
    pub file_name: String,
    pub leaf_num: String,
}

/// One row of the canonical labeled table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// Identifier shared by every image of one `(plant, leaf_num, disease)`.
    pub leaf_id: u64,
    pub plant: String,
    pub disease: String,
    pub plant_disease: String,
    pub full_name: String,
    /// Registry file name the image was matched on.
    pub file_name: String,
    /// `1` for healthy rows, `0` otherwise.
    pub disease_binary: u8,
}

impl NormalizedRecord {
    /// Location of the source image below the corpus `root`.
    pub fn source_path(&self, root: &Path) -> PathBuf {
        root.join(&self.plant_disease).join(&self.full_name)
    }
}

/// Binary health label of `disease`.
pub fn disease_binary(disease: &str) -> u8 {
    u8::from(disease == HEALTHY)
}

/// Plants whose images span at least two distinct diseases.
pub fn multi_class_plants(records: &[ImageRecord]) -> BTreeSet<&str> {
    let mut diseases: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for record in records {
        diseases
            .entry(record.plant.as_str())
            .or_default()
            .insert(record.disease.as_str());
    }

    diseases
        .into_iter()
        .filter(|(_, diseases)| diseases.len() >= 2)
        .map(|(plant, _)| plant)
        .collect()
}

/// Drop every row of a plant that has fewer than two distinct diseases.
pub fn retain_multi_class_plants(records: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let keep: BTreeSet<String> = multi_class_plants(&records)
        .into_iter()
        .map(str::to_owned)
        .collect();

    let total = records.len();
    let retained: Vec<_> = records
        .into_iter()
        .filter(|record| keep.contains(&record.plant))
        .collect();

    if retained.len() < total {
        log::info!(
            "Dropped {} images of single-class plants",
            total - retained.len()
        );
    }

    retained
}

/// Match registry entries to images on `file_name == img_name`.
///
/// The registry drives the join: output rows follow registry order, an entry
/// matching several images yields one row per image, and entries or images
/// without a counterpart are dropped.
pub fn join_leaf_registry(
    entries: &[LeafRegistryEntry],
    records: &[ImageRecord],
) -> Vec<JoinedRecord> {
    let mut by_name: HashMap<&str, Vec<&ImageRecord>> = HashMap::new();
    for record in records {
        by_name
            .entry(record.img_name.as_str())
            .or_default()
            .push(record);
    }

    let joined: Vec<_> = entries
        .iter()
        .flat_map(|entry| {
            by_name
                .get(entry.file_name.as_str())
                .into_iter()
                .flatten()
                .map(move |image| JoinedRecord {
                    image: (*image).clone(),
                    file_name: entry.file_name.clone(),
                    leaf_num: entry.leaf_num.clone(),
                })
        })
        .collect();

    log::info!(
        "Matched {} of {} images against {} registry entries",
        joined.len(),
        records.len(),
        entries.len()
    );

    joined
}

/// Assign a `leaf_ID` to every distinct `(plant, leaf_num, disease)` triple.
///
/// Triples are numbered from zero in lexicographic order, so the same input
/// always yields the same identifiers.
pub fn assign_leaf_ids(joined: Vec<JoinedRecord>) -> Vec<NormalizedRecord> {
    let triples: BTreeSet<(&str, &str, &str)> = joined
        .iter()
        .map(|row| {
            (
                row.image.plant.as_str(),
                row.leaf_num.as_str(),
                row.image.disease.as_str(),
            )
        })
        .collect();

    let ids: BTreeMap<(String, String, String), u64> = triples
        .into_iter()
        .zip(0u64..)
        .map(|((plant, leaf_num, disease), id)| {
            ((plant.to_owned(), leaf_num.to_owned(), disease.to_owned()), id)
        })
        .collect();

    joined
        .into_iter()
        .map(|row| {
            let key = (row.image.plant, row.leaf_num, row.image.disease);
            let leaf_id = ids[&key];
            let (plant, _, disease) = key;
            NormalizedRecord {
                leaf_id,
                disease_binary: disease_binary(&disease),
                plant,
                disease,
                plant_disease: row.image.plant_disease,
                full_name: row.image.full_name,
                file_name: row.file_name,
            }
        })
        .collect()
}

/// Join the multi-class `records` with `registry` and assign leaf IDs.
///
/// Expects the output of [`retain_multi_class_plants`].
pub fn normalize(
    records: &[ImageRecord],
    registry: &LeafRegistry,
) -> Result<Vec<NormalizedRecord>, Error> {
    let entries = registry.entries()?;
    let joined = join_leaf_registry(&entries, records);
    Ok(assign_leaf_ids(joined))
}

/// Render the canonical table as a DataFrame.
///
/// Integer columns are stored as `Int64`.
pub fn metadata_dataframe(records: &[NormalizedRecord]) -> Result<DataFrame, Error> {
    let leaf_ids: Vec<i64> = records.iter().map(|r| r.leaf_id as i64).collect();
    let full_names: Vec<&str> = records.iter().map(|r| r.full_name.as_str()).collect();
    let file_names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
    let plants: Vec<&str> = records.iter().map(|r| r.plant.as_str()).collect();
    let plant_diseases: Vec<&str> = records.iter().map(|r| r.plant_disease.as_str()).collect();
    let diseases: Vec<&str> = records.iter().map(|r| r.disease.as_str()).collect();
    let binaries: Vec<i64> = records.iter().map(|r| i64::from(r.disease_binary)).collect();

    let df = DataFrame::new(vec![
        Series::new(LEAF_ID_COLUMN.into(), leaf_ids).into(),
        Series::new(FULL_NAME_COLUMN.into(), full_names).into(),
        Series::new(FILE_NAME_COLUMN.into(), file_names).into(),
        Series::new(PLANT_COLUMN.into(), plants).into(),
        Series::new(PLANT_DISEASE_COLUMN.into(), plant_diseases).into(),
        Series::new(DISEASE_COLUMN.into(), diseases).into(),
        Series::new(DISEASE_BINARY_COLUMN.into(), binaries).into(),
    ])?;

    Ok(df)
}
