// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Label extraction from a folder-per-class image corpus.
//!
//! The corpus root holds one directory per class, each named
//! `<plant>___<disease>`, and every file inside a class directory is one
//! image of that class:
//!
//! ```text
//! dataset/
//! ├── Tomato___healthy/
//! │   ├── 0a1b.JPG
//! │   └── 0a1c.JPG
//! └── Tomato___Late_blight/
//!     └── 3f9e___RS_Late.B 5103.JPG
//! ```
//!
//! Some corpora already embed a secondary key into the file name using the
//! same separator. For those files the part after the first separator is the
//! name the leaf registry knows the image by.
//!
//! # Example
//!
//! ```rust,no_run
//! use leafset::labels::extract_labels;
//! use std::path::Path;
//!
//! let records = extract_labels(Path::new("dataset"))?;
//! for record in &records {
//!     println!("{} -> {}", record.full_name, record.plant_disease);
//! }
//! # Ok::<(), leafset::Error>(())
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::Error;

/// Separator between the plant and disease halves of a class directory name.
pub const LABEL_SEPARATOR: &str = "___";

/// One source image of the corpus with the labels derived from its class
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Plant species, e.g. `Tomato`.
    pub plant: String,
    /// Disease name, or `healthy`.
    pub disease: String,
    /// Compound class label, identical to the class directory name.
    pub plant_disease: String,
    /// File name of the image inside its class directory.
    pub full_name: String,
    /// Name used to look the image up in the leaf registry.
    pub img_name: String,
}

impl ImageRecord {
    /// Build a record for `file_name` found in the class directory `label`.
    pub fn new(label: &str, file_name: &str) -> Result<Self, Error> {
        let (plant, disease) = parse_class_label(label)?;
        Ok(ImageRecord {
            plant,
            disease,
            plant_disease: label.to_owned(),
            full_name: file_name.to_owned(),
            img_name: registry_name(file_name).to_owned(),
        })
    }

    /// Location of the source image below the corpus `root`.
    pub fn source_path(&self, root: &Path) -> PathBuf {
        root.join(&self.plant_disease).join(&self.full_name)
    }
}

/// Split a class directory name into `(plant, disease)`.
///
/// The name must contain the separator exactly once with non-empty text on
/// both sides.
pub fn parse_class_label(label: &str) -> Result<(String, String), Error> {
    let (plant, disease) = label
        .split_once(LABEL_SEPARATOR)
        .ok_or_else(|| Error::MalformedLabel(format!("{:?} has no {:?}", label, LABEL_SEPARATOR)))?;

    if plant.is_empty() || disease.is_empty() || disease.contains(LABEL_SEPARATOR) {
        return Err(Error::MalformedLabel(format!(
            "{:?} is not of the form <plant>{}<disease>",
            label, LABEL_SEPARATOR
        )));
    }

    Ok((plant.to_owned(), disease.to_owned()))
}

/// Name under which the leaf registry refers to `file_name`.
pub fn registry_name(file_name: &str) -> &str {
    match file_name.split_once(LABEL_SEPARATOR) {
        Some((_, suffix)) => suffix,
        None => file_name,
    }
}

/// Walk the corpus at `root` and produce one [`ImageRecord`] per image.
///
/// Class directories and the files within them are visited in file name
/// order. Plain files at the corpus root are ignored, as are nested
/// directories inside a class directory. Symbolic links are followed. An
/// empty corpus yields an empty table.
pub fn extract_labels(root: &Path) -> Result<Vec<ImageRecord>, Error> {
    let mut records = Vec::new();

    for class_dir in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let class_dir = class_dir?;
        if !class_dir.file_type().is_dir() {
            log::debug!("Skipping non-directory {:?}", class_dir.path());
            continue;
        }

        let label = utf8_name(class_dir.path())?;
        let before = records.len();

        for entry in WalkDir::new(class_dir.path())
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            records.push(ImageRecord::new(label, utf8_name(entry.path())?)?);
        }

        // A class directory with no images still has to be well formed.
        if records.len() == before {
            parse_class_label(label)?;
        }

        log::debug!("{}: {} images", label, records.len() - before);
    }

    Ok(records)
}

fn utf8_name(path: &Path) -> Result<&str, Error> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::MalformedLabel(format!("{:?} is not valid UTF-8", path)))
}
