// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tumtraf_prep::{
    AnnotationIndex, Camera, CameraSelection, Error, FileImageCodec, IndexOptions,
    PrepareConfig, RoiRect, RoiRectifier, RoiSource, Split, SplitLayout, UnitStatus, is_prepared,
    prepare_with_progress, scan,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Worker threads for parallel passes, defaults to the number of CPUs
    #[clap(long, global = true, env = "TUMTRAF_THREADS")]
    threads: Option<usize>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Regroup a raw TUMTraf tree into fixed-length temporal groups and crop
    /// the regrouped EB frames to the region of interest.
    Prepare {
        /// Settings file (TOML, JSON or YAML)
        #[clap(long)]
        config: Option<PathBuf>,

        /// Root of the raw dataset
        #[clap(long)]
        data_path: Option<PathBuf>,

        /// Root of the regrouped dataset
        #[clap(long)]
        out_path: Option<PathBuf>,

        /// Replace units that were already prepared
        #[clap(long)]
        rewrite: bool,

        /// Process the RGB camera
        #[clap(long)]
        rgb: bool,

        /// Process the EB camera
        #[clap(long)]
        eb: bool,

        /// Process both cameras
        #[clap(long)]
        all: bool,

        /// Comma separated splits, e.g. train,test/day
        #[clap(long)]
        split: Option<String>,

        /// Frames per group
        #[clap(long)]
        n_frames: Option<usize>,

        /// Maximum gap between consecutive frames of a group, in milliseconds
        #[clap(long)]
        max_time_diff: Option<u64>,

        #[command(flatten)]
        roi: RoiArgs,

        /// Do not crop EB frames
        #[clap(long, conflicts_with_all = ["roi_json", "roi_text", "roi"])]
        no_roi: bool,
    },
    /// Crop an already grouped EB unit to the region of interest.  This is
    /// destructive and must run exactly once per dataset copy.
    Rectify {
        /// Grouped images root, e.g. <root>/train/images/eb_transformed
        images: PathBuf,

        /// Grouped labels root, e.g. <root>/train/OPENLabel_labels_eb
        labels: PathBuf,

        #[command(flatten)]
        roi: RoiArgs,
    },
    /// Print the class distribution of a grouped unit.
    Stats {
        #[command(flatten)]
        unit: UnitArgs,

        /// Count per group instead of per frame
        #[clap(long)]
        by_group: bool,

        /// Derive the vocabulary from the labels instead of the fixed
        /// TUMTraf classes
        #[clap(long)]
        derive_classes: bool,

        /// Print JSON
        #[clap(long)]
        json: bool,
    },
    /// Print vocabulary and index sizes of every prepared split and camera.
    Info {
        /// Root of the regrouped dataset
        #[clap(long, default_value = "data/preprocessed")]
        root: PathBuf,

        /// Comma separated splits, defaults to every known split
        #[clap(long)]
        split: Option<String>,
    },
}

#[derive(clap::Args, PartialEq, Clone, Debug)]
struct RoiArgs {
    /// JSON file with x, y, width and height keys
    #[clap(long, conflicts_with_all = ["roi_text", "roi"])]
    roi_json: Option<PathBuf>,

    /// Text file with x, y, width and height on four lines
    #[clap(long, conflicts_with = "roi")]
    roi_text: Option<PathBuf>,

    /// Rectangle as x,y,width,height
    #[clap(long)]
    roi: Option<String>,
}

impl RoiArgs {
    fn source(&self) -> Result<Option<RoiSource>, Error> {
        Ok(match (&self.roi_json, &self.roi_text, &self.roi) {
            (Some(path), _, _) => Some(RoiSource::Json(path.clone())),
            (_, Some(path), _) => Some(RoiSource::Text(path.clone())),
            (_, _, Some(rect)) => Some(RoiSource::Inline(RoiRect::parse_csv(rect)?)),
            _ => None,
        })
    }
}

#[derive(clap::Args, PartialEq, Clone, Debug)]
struct UnitArgs {
    /// Grouped images root
    #[clap(long, requires = "labels", conflicts_with = "root")]
    images: Option<PathBuf>,

    /// Grouped labels root
    #[clap(long, requires = "images")]
    labels: Option<PathBuf>,

    /// Root of the regrouped dataset
    #[clap(long)]
    root: Option<PathBuf>,

    /// Split under the root
    #[clap(long, default_value = "train")]
    split: String,

    /// Camera under the root (rgb or eb)
    #[clap(long, default_value = "rgb")]
    camera: Camera,
}

impl UnitArgs {
    fn dirs(&self) -> Result<(PathBuf, PathBuf), Error> {
        match (&self.images, &self.labels, &self.root) {
            (Some(images), Some(labels), _) => Ok((images.clone(), labels.clone())),
            (_, _, Some(root)) => {
                let layout = SplitLayout::new(root, Split::new(&self.split), self.camera);
                Ok((layout.images_dir(), layout.labels_dir()))
            }
            _ => Err(Error::InvalidParameters(
                "either --images and --labels or --root is required".to_string(),
            )),
        }
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap()
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar
}

#[allow(clippy::too_many_arguments)]
fn handle_prepare(
    config: Option<PathBuf>,
    data_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    rewrite: bool,
    cameras: Option<CameraSelection>,
    split: Option<String>,
    n_frames: Option<usize>,
    max_time_diff: Option<u64>,
    roi: Option<RoiSource>,
) -> Result<(), Error> {
    let mut settings = PrepareConfig::load(config.as_deref())?;

    if let Some(data_path) = data_path {
        settings.data_path = data_path;
    }
    if let Some(out_path) = out_path {
        settings.out_path = out_path;
    }
    settings.rewrite |= rewrite;
    if let Some(cameras) = cameras {
        settings.camera = cameras;
    }
    if let Some(split) = split {
        settings.splits = Split::parse_list(&split);
    }
    if let Some(n_frames) = n_frames {
        settings.n_frames = n_frames;
    }
    if let Some(max_time_diff) = max_time_diff {
        settings.max_time_diff = max_time_diff;
    }
    if let Some(roi) = roi {
        settings.roi = roi;
    }

    info!(
        "Preparing {:?} into {:?}: {} frames per group, {} ms max gap",
        settings.data_path, settings.out_path, settings.n_frames, settings.max_time_diff
    );

    let bar = progress_bar((settings.splits.len() * settings.camera.cameras().len()) as u64);
    bar.set_message("Units");

    let report = prepare_with_progress(&settings, Arc::new(FileImageCodec::new()), |unit| {
        bar.inc(1);
        bar.set_message(format!("{}/{}", unit.split, unit.camera));
    })?;
    bar.finish_and_clear();

    for unit in &report.units {
        println!("{}", unit);
    }
    println!(
        "{} prepared, {} already prepared, {} missing, {} failed, {} groups",
        report.count(&UnitStatus::Prepared),
        report.count(&UnitStatus::AlreadyPrepared),
        report.count(&UnitStatus::MissingSource),
        report.failed().count(),
        report.groups()
    );

    Ok(())
}

fn handle_rectify(images: PathBuf, labels: PathBuf, roi: Option<RoiSource>) -> Result<(), Error> {
    let roi = roi
        .unwrap_or_default()
        .load()?
        .ok_or_else(|| Error::InvalidRoi("no region of interest".to_string()))?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Cropping {:?} to {:?}", images, roi));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let rectifier = RoiRectifier::new(roi, Arc::new(FileImageCodec::new()));
    let report = rectifier.rectify(&images, &labels)?;
    spinner.finish_and_clear();

    for failure in report.failures() {
        warn!(
            "{:?}: {}",
            failure.path,
            failure.error.as_deref().unwrap_or("not written")
        );
    }
    println!(
        "Cropped {}/{} frames, adjusted {}/{} label files",
        report.images_written(),
        report.images.len(),
        report.labels_written(),
        report.labels.len()
    );

    Ok(())
}

fn handle_stats(unit: UnitArgs, by_group: bool, derive_classes: bool, json: bool) -> Result<(), Error> {
    let (images, labels) = unit.dirs()?;

    let options = if by_group {
        IndexOptions::by_group()
    } else {
        IndexOptions::flat()
    };
    let options = if derive_classes {
        options
    } else {
        options.with_tumtraf_classes()
    };

    let index = AnnotationIndex::open(images, labels, options)?;
    let stats = scan(&index);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", stats);
    }

    Ok(())
}

fn handle_info(root: PathBuf, split: Option<String>) -> Result<(), Error> {
    if !root.is_dir() {
        return Err(Error::InvalidDirectory(root));
    }

    let splits = split
        .map(|s| Split::parse_list(&s))
        .unwrap_or_else(Split::defaults);

    for split in &splits {
        for camera in Camera::ALL {
            if !is_prepared(&root, split, camera) {
                continue;
            }

            let layout = SplitLayout::new(&root, split.clone(), camera);
            let index = AnnotationIndex::open(
                layout.images_dir(),
                layout.labels_dir(),
                IndexOptions::by_group(),
            )?;

            println!(
                "{}: {} groups, {} frames",
                layout,
                index.len(),
                index.frame_count()
            );
            println!("  classes: {}", index.classes().join(", "));
        }
    }

    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|err| Error::InvalidParameters(err.to_string()))?;
    }

    match args.cmd {
        Command::Prepare {
            config,
            data_path,
            out_path,
            rewrite,
            rgb,
            eb,
            all,
            split,
            n_frames,
            max_time_diff,
            roi,
            no_roi,
        } => {
            let roi = match no_roi {
                true => Some(RoiSource::Disabled),
                false => roi.source()?,
            };
            handle_prepare(
                config,
                data_path,
                out_path,
                rewrite,
                (rgb || eb || all).then(|| CameraSelection::from_flags(rgb, eb, all)),
                split,
                n_frames,
                max_time_diff,
                roi,
            )
        }
        Command::Rectify { images, labels, roi } => handle_rectify(images, labels, roi.source()?),
        Command::Stats {
            unit,
            by_group,
            derive_classes,
            json,
        } => handle_stats(unit, by_group, derive_classes, json),
        Command::Info { root, split } => handle_info(root, split),
    }
}
