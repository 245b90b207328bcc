// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use leafset::{Error, PipelineOptions, TableFormat, reattach_files};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Leafset Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Build every dataset configuration from a folder-per-class image corpus
    /// and a directory of leaf registry tables.
    Build {
        /// Root of the image corpus, one `<plant>___<disease>` directory per
        /// class.
        dataset: PathBuf,

        /// Directory holding the leaf registry CSV tables.
        leaf_maps: PathBuf,

        /// Output directory for the generated configurations.
        #[clap(long, env = "LEAFSET_OUTPUT", default_value = "all_parquet_configs")]
        output: PathBuf,

        /// JPEG quality used when re-encoding images.
        #[clap(
            long,
            env = "LEAFSET_JPEG_QUALITY",
            default_value_t = 75,
            value_parser = clap::value_parser!(u8).range(1..=100)
        )]
        quality: u8,

        /// Also save the canonical table, without images, to this path.  The
        /// format follows the extension (csv, parquet or arrow).
        #[clap(long)]
        metadata: Option<PathBuf>,

        /// Comma separated targets of the all-plants subset
        /// [default: plant_disease,disease_binary]
        #[clap(long, value_delimiter = ',')]
        all_targets: Option<Vec<String>>,

        /// Comma separated targets of every per-plant subset
        /// [default: disease,disease_binary]
        #[clap(long, value_delimiter = ',')]
        plant_targets: Option<Vec<String>>,
    },
    /// Join externally computed embeddings back onto a saved metadata table,
    /// aligning rows by position.
    Reattach {
        /// Metadata table (csv, parquet or arrow).
        metadata: PathBuf,

        /// Embedding table (csv, parquet or arrow).
        embedded: PathBuf,

        /// Format of the combined table: parquet, csv or arrow.
        #[clap(long, default_value = "parquet")]
        format: String,
    },
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Encoding");
    bar
}

fn handle_build(options: PipelineOptions) -> Result<(), Error> {
    let bar = progress_bar();

    let summary = leafset::run(&options, |progress| {
        if progress.total > 0 {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.current as u64);
        }
    })?;
    bar.finish_and_clear();

    log::info!(
        "{} images extracted, {} kept after plant filtering, {} associated with a leaf",
        summary.extracted,
        summary.retained,
        summary.normalized
    );

    for config in &summary.configs {
        println!(
            "{}: {} rows, {} classes ({})",
            config.name,
            config.rows,
            config.classes,
            config.dir.display()
        );
    }
    println!(
        "Wrote {} configurations to {}",
        summary.configs.len(),
        options.output.display()
    );

    Ok(())
}

fn handle_reattach(metadata: PathBuf, embedded: PathBuf, format: String) -> Result<(), Error> {
    let format: TableFormat = format.parse()?;
    let summary = reattach_files(&metadata, &embedded, format)?;
    println!(
        "Wrote {} ({} rows, {} columns)",
        summary.output.display(),
        summary.rows,
        summary.columns
    );
    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.cmd {
        Command::Build {
            dataset,
            leaf_maps,
            output,
            quality,
            metadata,
            all_targets,
            plant_targets,
        } => {
            let mut options = PipelineOptions::new(dataset, leaf_maps)
                .with_output(output)
                .with_jpeg_quality(quality)
                .with_metadata(metadata);
            if let Some(targets) = all_targets {
                options = options.with_all_plants_targets(targets);
            }
            if let Some(targets) = plant_targets {
                options = options.with_plant_targets(targets);
            }
            handle_build(options)
        }
        Command::Reattach {
            metadata,
            embedded,
            format,
        } => handle_reattach(metadata, embedded, format),
    }
}
