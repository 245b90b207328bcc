// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use assert_cmd::Command;
use polars::prelude::*;
use std::{fs, path::Path};
use tempfile::TempDir;

fn write_image(path: &Path, shade: u8) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(8, 8, image::Rgb([shade, shade, 128]))
        .save(path)
        .unwrap();
}

fn corpus(root: &Path) {
    for (idx, name) in ["h1.png", "h2.png"].iter().enumerate() {
        write_image(
            &root.join("color").join("Pepper___healthy").join(name),
            idx as u8 * 50,
        );
    }
    write_image(
        &root.join("color").join("Pepper___Bacterial_spot").join("s1.png"),
        220,
    );

    fs::create_dir_all(root.join("leaf_maps")).unwrap();
    fs::write(
        root.join("leaf_maps").join("pepper.csv"),
        "File Name,Leaf #\nh1.png,1\nh2.png,2\ns1.png,1\n",
    )
    .unwrap();
}

#[test]
fn test_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn test_help_lists_subcommands() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("build"))
        .stdout(predicates::str::contains("reattach"));
    Ok(())
}

#[test]
fn test_build() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    corpus(temp_dir.path());
    let output = temp_dir.path().join("configs");

    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.arg("build")
        .arg(temp_dir.path().join("color"))
        .arg(temp_dir.path().join("leaf_maps"))
        .arg("--output")
        .arg(&output)
        .arg("--quality")
        .arg("90");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Pepper_disease: 3 rows, 2 classes"))
        .stdout(predicates::str::contains("Wrote 4 configurations"));

    let mapping = fs::read_to_string(
        output
            .join("by_plant")
            .join("Pepper")
            .join("Pepper_disease")
            .join("Pepper_disease_mapping.json"),
    )?;
    let mapping: serde_json::Value = serde_json::from_str(&mapping)?;
    assert_eq!(
        mapping,
        serde_json::json!({"0": "healthy", "1": "Bacterial_spot"})
    );
    Ok(())
}

#[test]
fn test_build_custom_targets_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    corpus(temp_dir.path());
    let output = temp_dir.path().join("from-env");

    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.env("LEAFSET_OUTPUT", &output)
        .arg("build")
        .arg(temp_dir.path().join("color"))
        .arg(temp_dir.path().join("leaf_maps"))
        .arg("--all-targets")
        .arg("plant")
        .arg("--plant-targets")
        .arg("disease_binary,leaf_ID");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Wrote 3 configurations"));

    assert!(output.join("all_plants").join("all_plants_plant").is_dir());
    assert!(
        output
            .join("by_plant")
            .join("Pepper")
            .join("Pepper_leaf_ID")
            .join("Pepper_leaf_ID.parquet")
            .is_file()
    );
    Ok(())
}

#[test]
fn test_build_unknown_target() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    corpus(temp_dir.path());

    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.arg("build")
        .arg(temp_dir.path().join("color"))
        .arg(temp_dir.path().join("leaf_maps"))
        .arg("--output")
        .arg(temp_dir.path().join("configs"))
        .arg("--plant-targets")
        .arg("severity");
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("severity"));
    assert!(!temp_dir.path().join("configs").exists());
    Ok(())
}

#[test]
fn test_build_malformed_class_directory() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    corpus(temp_dir.path());
    write_image(&temp_dir.path().join("color").join("Pepper").join("x.png"), 1);

    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.arg("build")
        .arg(temp_dir.path().join("color"))
        .arg(temp_dir.path().join("leaf_maps"))
        .arg("--output")
        .arg(temp_dir.path().join("configs"));
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("MalformedLabel"));
    Ok(())
}

#[test]
fn test_reattach() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let metadata = temp_dir.path().join("meta.csv");
    let embedded = temp_dir.path().join("embedded.parquet");

    fs::write(&metadata, "leaf_ID,disease\n0,healthy\n1,healthy\n2,blight\n")?;
    let mut df = DataFrame::new(vec![
        Series::new("e0".into(), &[0.1f64, 0.2, 0.3]).into(),
        Series::new("e1".into(), &[1.0f64, 2.0, 3.0]).into(),
    ])?;
    ParquetWriter::new(fs::File::create(&embedded)?).finish(&mut df)?;

    let mut cmd = Command::cargo_bin("leafset")?;
    cmd.arg("reattach")
        .arg(&metadata)
        .arg(&embedded)
        .arg("--format")
        .arg("csv");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("3 rows, 4 columns"));

    let combined = fs::read_to_string(temp_dir.path().join("embedded-complete.csv"))?;
    assert_eq!(combined.lines().next(), Some("leaf_ID,disease,e0,e1"));
    assert_eq!(combined.lines().count(), 4);
    Ok(())
}
