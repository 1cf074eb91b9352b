// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The radiance accumulator.
//!
//! Every sample a walk emits adds its color to one pixel.  Workers
//! each fill a private canvas; the canvases are summed once all the
//! workers are done, so the hot loop never takes a lock.  Because
//! addition commutes, the order in which samples arrive does not
//! change the final image.

use std::path::Path;

use image::RgbImage;
use itertools::iproduct;
use num::clamp;

use crate::errors::IfsError;
use crate::planes::Pixel;
use crate::transform::Rgb;

/// Anything that can soak up samples.
pub trait RadianceSink {
    /// Width and height in pixels.
    fn dimensions(&self) -> (usize, usize);

    /// Adds `color` to the running total at `pixel`.  Pixels outside
    /// the sink are ignored and reported by returning `false`.
    fn add_radiance(&mut self, pixel: Pixel, color: Rgb) -> bool;
}

/// Average samples per pixel, never less than one.  Used to normalize
/// brightness when tone mapping.
pub fn normalization_scale(num_points: usize, iterations: usize, width: usize, height: usize) -> f64 {
    let samples = (num_points as f64) * (iterations as f64);
    let pixels = (width as f64) * (height as f64);
    (samples / pixels).max(1.0)
}

/// A width × height buffer of accumulated radiance.
#[derive(Clone, Debug, PartialEq)]
pub struct Canvas {
    width: usize,
    height: usize,
    radiance: Vec<Rgb>,
}

impl Canvas {
    /// A black canvas.
    pub fn new(width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            radiance: vec![Rgb::BLACK; width * height],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    fn offset(&self, pixel: Pixel) -> Option<usize> {
        let Pixel(x, y) = pixel;
        if x < 0 || y < 0 || (x as u64) >= (self.width as u64) || (y as u64) >= (self.height as u64) {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// The accumulated radiance at a pixel, if it is on the canvas.
    pub fn radiance_at(&self, pixel: Pixel) -> Option<Rgb> {
        self.offset(pixel).map(|offset| self.radiance[offset])
    }

    /// Every pixel that has received anything, with its radiance.
    pub fn lit_pixels<'a>(&'a self) -> impl Iterator<Item = (Pixel, Rgb)> + 'a {
        iproduct!(0..self.height, 0..self.width)
            .map(move |(y, x)| (Pixel(x as i64, y as i64), self.radiance[y * self.width + x]))
            .filter(|(_, color)| *color != Rgb::BLACK)
    }

    /// Adds another canvas of the same size into this one.
    pub fn merge(&mut self, other: &Canvas) -> Result<(), IfsError> {
        if (self.width, self.height) != (other.width, other.height) {
            return Err(IfsError::Worker(format!(
                "cannot merge a {}x{} canvas into a {}x{} one",
                other.width, other.height, self.width, self.height
            )));
        }
        for (mine, theirs) in self.radiance.iter_mut().zip(other.radiance.iter()) {
            *mine += *theirs;
        }
        Ok(())
    }

    /// Sums a collection of canvases into one.
    pub fn merge_all<I>(width: usize, height: usize, canvases: I) -> Result<Canvas, IfsError>
    where
        I: IntoIterator<Item = Canvas>,
    {
        let mut total = Canvas::new(width, height);
        for canvas in canvases {
            total.merge(&canvas)?;
        }
        Ok(total)
    }

    /// Log-density tone mapping: each channel becomes
    /// `ln(1 + c) / ln(1 + scale)`, clamped to `[0,1]` and scaled to a
    /// byte.  Returns the bytes row by row, RGB interleaved.
    pub fn tone_map(&self, scale: f64) -> Vec<u8> {
        let denominator = (1.0 + scale.max(1.0)).ln();
        let channel = |c: f64| -> u8 {
            let v = (1.0 + c.max(0.0)).ln() / denominator;
            (clamp(v, 0.0, 1.0) * 255.0).round() as u8
        };
        let mut bytes = Vec::with_capacity(self.radiance.len() * 3);
        for color in &self.radiance {
            bytes.push(channel(color.0));
            bytes.push(channel(color.1));
            bytes.push(channel(color.2));
        }
        bytes
    }

    /// Tone maps and writes the image.  The format follows the file
    /// extension.
    pub fn save<P: AsRef<Path>>(&self, path: P, scale: f64) -> Result<(), IfsError> {
        let image = RgbImage::from_raw(self.width as u32, self.height as u32, self.tone_map(scale))
            .ok_or_else(|| IfsError::Image("pixel buffer does not match image size".to_string()))?;
        image
            .save(path.as_ref())
            .map_err(|e| IfsError::Image(format!("{}: {}", path.as_ref().display(), e)))
    }
}

impl RadianceSink for Canvas {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn add_radiance(&mut self, pixel: Pixel, color: Rgb) -> bool {
        match self.offset(pixel) {
            Some(offset) => {
                self.radiance[offset] += color;
                true
            }
            None => false,
        }
    }
}
