// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Preparation settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML/JSON/YAML
//! file, then `TUMTRAF_*` environment variables. Command line flags are
//! applied on top by the caller.
//!
//! ```toml
//! data_path = "/datasets/tumtraf/raw"
//! out_path = "/datasets/tumtraf/grouped"
//! camera = "eb"
//! splits = ["train", "val"]
//! n_frames = 16
//! max_time_diff = 200
//! roi = { inline = { x = 130, y = 9, width = 612, height = 451 } }
//! ```

use config::{Config, Environment, File};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    Error,
    grouper::{DEFAULT_MAX_TIME_DIFF, DEFAULT_N_FRAMES, FrameGrouper},
    layout::{CameraSelection, Split},
    roi::RoiSource,
};

/// Prefix of the environment variables read by [`PrepareConfig::load`].
pub const ENV_PREFIX: &str = "TUMTRAF";

/// Settings of a preparation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Root of the raw dataset.
    pub data_path: PathBuf,
    /// Root of the regrouped dataset.
    pub out_path: PathBuf,
    /// Regroup units whose output already exists.
    pub rewrite: bool,
    /// Cameras to process.
    pub camera: CameraSelection,
    /// Splits to process.
    pub splits: Vec<Split>,
    /// Frames per group.
    pub n_frames: usize,
    /// Maximum gap between consecutive frames of a group, in milliseconds.
    pub max_time_diff: u64,
    /// Crop rectangle applied to regrouped EB frames.
    pub roi: RoiSource,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/raw"),
            out_path: PathBuf::from("data/preprocessed"),
            rewrite: false,
            camera: CameraSelection::Both,
            splits: Split::defaults(),
            n_frames: DEFAULT_N_FRAMES,
            max_time_diff: DEFAULT_MAX_TIME_DIFF,
            roi: RoiSource::default(),
        }
    }
}

impl PrepareConfig {
    /// Load settings from `path`, or from `config.toml` in the user config
    /// directory when it exists, then from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    /// Load settings using `env` as the environment layer.
    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, Error> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                debug!("Loading settings from {:?}", path);
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(path) = default_config_path()
                    && path.is_file()
                {
                    debug!("Loading settings from {:?}", path);
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("splits"),
            )
            .build()?;

        let config: PrepareConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> Result<(), Error> {
        if self.n_frames == 0 {
            return Err(Error::InvalidParameters(
                "n_frames must be at least 1".to_string(),
            ));
        }
        if self.splits.is_empty() {
            return Err(Error::InvalidParameters("no splits selected".to_string()));
        }
        Ok(())
    }

    /// Grouper configured with these settings.
    pub fn grouper(&self) -> FrameGrouper {
        FrameGrouper::new(self.n_frames, self.max_time_diff)
    }
}

/// `config.toml` in the platform configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("ai", "EdgeFirst", "TUMTraf").map(|dirs| dirs.config_dir().join("config.toml"))
}
