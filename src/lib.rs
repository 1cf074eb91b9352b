#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Iterated function system renderer
//!
//! An iterated function system is a handful of maps from the plane to
//! itself.  Its attractor is the one shape that the maps, taken
//! together, carry onto itself, and it is usually a fractal.  The
//! "chaos game" draws the attractor without ever solving for it: pick
//! a point, then over and over pick one of the maps at random and move
//! the point with it.  After a few steps the point is (to within a
//! pixel) on the attractor, and every later position is a sample of
//! it.  Plot enough samples and the density of the plot is the image.
//!
//! Each map here also carries a color, and the wandering point keeps
//! a running color that it blends halfway toward the color of every
//! map it visits.  Regions of the attractor reached mostly through one
//! map take on that map's color, and the blend across boundaries gives
//! the soft gradients typical of fractal flames.
//!
//! The pieces, leaves first:
//!
//! * [`transform`]: the maps (linear, affine, Möbius, inverse Julia).
//! * [`ensemble`]: the weighted collection of maps and the random
//!   choice between them.
//! * [`engine`]: the walks themselves, spread across threads.
//! * [`canvas`]: where samples accumulate, and how they become an image.
//! * [`descriptor`] and [`config`]: the JSON the system is read from
//!   and saved to.

extern crate crossbeam;
extern crate image;
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod canvas;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod ensemble;
pub mod errors;
pub mod planes;
pub mod transform;

pub use canvas::{normalization_scale, Canvas, RadianceSink};
pub use config::RenderConfig;
pub use descriptor::SystemDescriptor;
pub use engine::{ChaosGame, RenderSettings, RenderStats};
pub use ensemble::WeightedEnsemble;
pub use errors::IfsError;
pub use transform::{Rgb, Transform, TransformKind};
