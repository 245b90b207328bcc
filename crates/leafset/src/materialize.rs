// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Image materialization.
//!
//! Decodes the source image of every normalized row and re-encodes it into
//! one fixed lossy format so that all generated datasets carry uniform image
//! payloads. This runs after every filter so each surviving row is decoded
//! exactly once and no work is spent on rows that end up excluded.
//!
//! Materialization fails fast: the first missing or undecodable image aborts
//! the whole batch with an error naming the offending file.

use std::path::Path;

use image::{DynamicImage, ImageReader, codecs::jpeg::JpegEncoder};

use crate::{Error, NormalizedRecord};

/// Progress of a long-running pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    /// Number of items processed so far.
    pub current: usize,
    /// Total number of items.
    pub total: usize,
    /// Optional description of the item being processed.
    pub status: Option<String>,
}

/// Decodes a source image and re-encodes it into the dataset's payload
/// format.
pub trait ImageCodec {
    fn transcode(&self, path: &Path) -> Result<Vec<u8>, Error>;
}

/// Re-encodes any readable image as baseline RGB JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    /// Quality used when none is configured.
    pub const DEFAULT_QUALITY: u8 = 75;

    /// Create a codec encoding at `quality`, clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUALITY)
    }
}

impl ImageCodec for JpegCodec {
    fn transcode(&self, path: &Path) -> Result<Vec<u8>, Error> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, self.quality);
        DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;

        Ok(bytes)
    }
}

/// A normalized row together with its re-encoded image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedRecord {
    pub record: NormalizedRecord,
    pub image: Vec<u8>,
}

/// Attach the transcoded image of every row, resolving sources below `root`.
///
/// `progress` is called once before the first image and after every image.
pub fn materialize<C, F>(
    records: Vec<NormalizedRecord>,
    root: &Path,
    codec: &C,
    mut progress: F,
) -> Result<Vec<MaterializedRecord>, Error>
where
    C: ImageCodec + ?Sized,
    F: FnMut(Progress),
{
    let total = records.len();
    progress(Progress {
        current: 0,
        total,
        status: None,
    });

    let mut materialized = Vec::with_capacity(total);

    for (idx, record) in records.into_iter().enumerate() {
        let path = record.source_path(root);
        if !path.is_file() {
            return Err(Error::MissingImage(format!("{:?}", path)));
        }

        let image = codec.transcode(&path).inspect_err(|err| {
            log::error!("Failed to transcode {:?}: {}", path, err);
        })?;

        progress(Progress {
            current: idx + 1,
            total,
            status: Some(record.full_name.clone()),
        });

        materialized.push(MaterializedRecord { record, image });
    }

    Ok(materialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, fs, path::PathBuf};
    use tempfile::TempDir;

    fn create_test_image(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let img = image::RgbaImage::from_fn(8, 8, |x, y| {
            image::Rgba([(x * 32) as u8, (y * 32) as u8, 128, 255])
        });
        img.save(path).unwrap();
    }

    fn record(plant_disease: &str, full_name: &str) -> NormalizedRecord {
        let (plant, disease) = plant_disease.split_once("___").unwrap();
        NormalizedRecord {
            leaf_id: 0,
            plant: plant.to_owned(),
            disease: disease.to_owned(),
            plant_disease: plant_disease.to_owned(),
            full_name: full_name.to_owned(),
            file_name: full_name.to_owned(),
            disease_binary: 0,
        }
    }

    /// Codec that records which files it was asked to transcode.
    struct RecordingCodec {
        seen: RefCell<Vec<PathBuf>>,
    }

    impl ImageCodec for RecordingCodec {
        fn transcode(&self, path: &Path) -> Result<Vec<u8>, Error> {
            self.seen.borrow_mut().push(path.to_path_buf());
            Ok(path.to_string_lossy().as_bytes().to_vec())
        }
    }

    #[test]
    fn test_jpeg_codec_reencodes_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leaf.png");
        create_test_image(&path);

        let bytes = JpegCodec::default().transcode(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 8);
    }

    #[test]
    fn test_jpeg_codec_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"not an image").unwrap();

        assert!(JpegCodec::default().transcode(&path).is_err());
    }

    #[test]
    fn test_jpeg_codec_quality_clamped() {
        assert_eq!(JpegCodec::new(0).quality(), 1);
        assert_eq!(JpegCodec::new(250).quality(), 100);
        assert_eq!(JpegCodec::default().quality(), 75);
    }

    #[test]
    fn test_materialize_resolves_source_paths() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Tomato___healthy")).unwrap();
        fs::write(root.join("Tomato___healthy/a.jpg"), b"a").unwrap();
        fs::write(root.join("Tomato___healthy/b.jpg"), b"b").unwrap();

        let codec = RecordingCodec {
            seen: RefCell::new(Vec::new()),
        };
        let mut updates = Vec::new();
        let rows = vec![
            record("Tomato___healthy", "a.jpg"),
            record("Tomato___healthy", "b.jpg"),
        ];

        let materialized = materialize(rows, root, &codec, |p| updates.push(p)).unwrap();

        assert_eq!(materialized.len(), 2);
        assert_eq!(
            codec.seen.borrow().as_slice(),
            [
                root.join("Tomato___healthy/a.jpg"),
                root.join("Tomato___healthy/b.jpg")
            ]
        );
        assert_eq!(updates.len(), 3);
        assert_eq!(updates.last().unwrap().current, 2);
        assert_eq!(updates.last().unwrap().total, 2);
    }

    #[test]
    fn test_materialize_missing_image_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_image(&root.join("Tomato___healthy/a.png"));

        let rows = vec![
            record("Tomato___healthy", "missing.png"),
            record("Tomato___healthy", "a.png"),
        ];

        let result = materialize(rows, root, &JpegCodec::default(), |_| {});
        match result {
            Err(Error::MissingImage(msg)) => assert!(msg.contains("missing.png")),
            other => panic!("expected MissingImage, got {:?}", other),
        }
    }

    #[test]
    fn test_materialize_empty() {
        let temp_dir = TempDir::new().unwrap();
        let materialized =
            materialize(Vec::new(), temp_dir.path(), &JpegCodec::default(), |_| {}).unwrap();
        assert!(materialized.is_empty());
    }
}
