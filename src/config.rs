// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run configuration: what to draw, how big, and how hard to try.
//!
//! ```text
//! {
//!   "image_settings":      { "width": 800, "height": 800, "path": "fern.png" },
//!   "evaluation_settings": { "iterations": 1000, "num_points": 10000 },
//!   "transforms":          { "AffineTransform": [ ... ] },
//!   "random_transforms":   { "count": 4 }
//! }
//! ```
//!
//! At least one of `transforms` and `random_transforms` must be given.
//! The same layout is written back out after a render, with
//! `transforms` holding every transform actually used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::SystemDescriptor;
use crate::engine::RenderSettings;
use crate::ensemble::WeightedEnsemble;
use crate::errors::IfsError;
use crate::transform::{RandomBounds, TransformKind, DEFAULT_RANDOM_KINDS};

/// The output image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSettings {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Where the image goes; the extension picks the format.
    pub path: PathBuf,
}

/// How many walks, how long, and on how many threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationSettings {
    /// Steps per walk.
    pub iterations: usize,
    /// Number of walks.
    pub num_points: usize,
    /// Leading steps of every walk left unplotted.
    #[serde(default)]
    pub burn_in: usize,
    /// Worker threads; all CPUs when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Master random seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Stop starting walks after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<f64>,
}

fn default_kinds() -> Vec<TransformKind> {
    DEFAULT_RANDOM_KINDS.to_vec()
}

fn default_matrix_bounds() -> [f64; 2] {
    let bounds = RandomBounds::default();
    [bounds.matrix.0, bounds.matrix.1]
}

fn default_shift_bounds() -> [f64; 2] {
    let bounds = RandomBounds::default();
    [bounds.shift.0, bounds.shift.1]
}

/// Asks for transforms to be generated rather than listed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomSystem {
    /// How many transforms to generate.
    pub count: usize,
    /// Kinds to draw from, uniformly.
    #[serde(default = "default_kinds")]
    pub kinds: Vec<TransformKind>,
    /// Range of matrix entries for linear and affine maps.
    #[serde(default = "default_matrix_bounds")]
    pub matrix_bounds: [f64; 2],
    /// Range of translations for affine maps.
    #[serde(default = "default_shift_bounds")]
    pub shift_bounds: [f64; 2],
}

impl RandomSystem {
    /// The two ranges as a [`RandomBounds`].
    pub fn bounds(&self) -> RandomBounds {
        RandomBounds {
            matrix: (self.matrix_bounds[0], self.matrix_bounds[1]),
            shift: (self.shift_bounds[0], self.shift_bounds[1]),
        }
    }
}

/// A whole run configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// What to draw into.
    pub image_settings: ImageSettings,
    /// How much work to do.
    pub evaluation_settings: EvaluationSettings,
    /// A system descriptor; see [`crate::descriptor`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Value>,
    /// Transforms to generate in addition to the listed ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_transforms: Option<RandomSystem>,
}

impl RenderConfig {
    /// Reads and checks a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IfsError> {
        let text = fs::read_to_string(path.as_ref())?;
        RenderConfig::from_json(&text)
    }

    /// Parses and checks a configuration document.
    pub fn from_json(text: &str) -> Result<Self, IfsError> {
        let config: RenderConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Everything that can be checked without drawing random numbers.
    pub fn validate(&self) -> Result<(), IfsError> {
        let image = &self.image_settings;
        if image.width == 0 || image.height == 0 {
            return Err(IfsError::Config(format!(
                "image size {}x{} has no pixels",
                image.width, image.height
            )));
        }
        let too_big = image.width > u32::MAX as usize
            || image.height > u32::MAX as usize
            || image
                .width
                .checked_mul(image.height)
                .and_then(|pixels| pixels.checked_mul(3))
                .is_none();
        if too_big {
            return Err(IfsError::Config(format!(
                "image size {}x{} is too large",
                image.width, image.height
            )));
        }
        let evaluation = &self.evaluation_settings;
        if evaluation.threads == Some(0) {
            return Err(IfsError::Config("threads must be at least 1".to_string()));
        }
        if let Some(limit) = evaluation.time_limit_secs {
            if Duration::try_from_secs_f64(limit).is_err() {
                return Err(IfsError::Config(format!(
                    "time limit {} is not a number of seconds",
                    limit
                )));
            }
        }
        if self.transforms.is_none() && self.random_transforms.is_none() {
            return Err(IfsError::Config(
                "either transforms or random_transforms must be given".to_string(),
            ));
        }
        if let Some(ref transforms) = self.transforms {
            SystemDescriptor::from_value(transforms)?;
        }
        if let Some(ref random) = self.random_transforms {
            if random.kinds.is_empty() {
                return Err(IfsError::Config(
                    "random_transforms.kinds is empty".to_string(),
                ));
            }
            random.bounds().validate()?;
        }
        Ok(())
    }

    /// The listed transforms, then the generated ones.
    pub fn build_ensemble<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<WeightedEnsemble, IfsError> {
        let mut ensemble = match self.transforms {
            Some(ref transforms) => {
                WeightedEnsemble::from_descriptor(&SystemDescriptor::from_value(transforms)?, rng)?
            }
            None => WeightedEnsemble::new(),
        };
        if let Some(ref random) = self.random_transforms {
            ensemble.add_random(random.count, &random.kinds, &random.bounds(), rng)?;
        }
        Ok(ensemble)
    }

    /// Render settings from the evaluation section.
    pub fn render_settings(&self) -> RenderSettings {
        let evaluation = &self.evaluation_settings;
        let defaults = RenderSettings::new(evaluation.num_points, evaluation.iterations);
        RenderSettings {
            burn_in: evaluation.burn_in,
            threads: evaluation.threads.unwrap_or(defaults.threads),
            seed: evaluation.seed,
            time_limit: evaluation
                .time_limit_secs
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            ..defaults
        }
    }

    /// Where the system used for a render is saved: the image path
    /// with a `.json` extension.
    pub fn system_path(&self) -> PathBuf {
        self.image_settings.path.with_extension("json")
    }

    /// This configuration with its transforms replaced by `ensemble`
    /// and the random section dropped, so that loading it again
    /// reproduces the same system.
    pub fn with_system(&self, ensemble: &WeightedEnsemble) -> Result<RenderConfig, IfsError> {
        Ok(RenderConfig {
            transforms: Some(ensemble.to_descriptor().to_value()?),
            random_transforms: None,
            ..self.clone()
        })
    }

    /// Writes this configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IfsError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), text)?;
        Ok(())
    }
}
