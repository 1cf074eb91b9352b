// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one error type shared by every part of the renderer.

use failure::Fail;

/// Everything that can go wrong between reading a configuration and
/// writing the final image.
#[derive(Debug, Fail)]
pub enum IfsError {
    /// The configuration or system descriptor could not be understood:
    /// an unknown transform name, a missing or extra field, or a value
    /// of the wrong shape.
    #[fail(display = "configuration error: {}", _0)]
    Config(String),

    /// The ensemble cannot be evaluated because it has no entries or
    /// its total weight is not positive.
    #[fail(display = "degenerate system: {}", _0)]
    DegenerateSystem(String),

    /// A transform weight was negative or not a number.
    #[fail(display = "invalid weight {}: weights must be finite and non-negative", _0)]
    InvalidWeight(f64),

    /// The denominator of a linear-fractional map was exactly zero at
    /// the current point.
    #[fail(display = "division singularity in linear-fractional map")]
    DivisionSingularity,

    /// Reading or writing a file failed.
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] std::io::Error),

    /// The image encoder refused the rendered buffer.
    #[fail(display = "could not write image: {}", _0)]
    Image(String),

    /// A render worker panicked.
    #[fail(display = "render worker failed: {}", _0)]
    Worker(String),
}

impl From<std::io::Error> for IfsError {
    fn from(e: std::io::Error) -> Self {
        IfsError::Io(e)
    }
}

impl From<serde_json::Error> for IfsError {
    fn from(e: serde_json::Error) -> Self {
        IfsError::Config(e.to_string())
    }
}
