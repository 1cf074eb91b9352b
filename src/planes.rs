// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane with an arbitrary pair of
//! corners defining its leftlower and rightupper corners.  The chaos
//! game always plots the square from -1-1i to 1+1i.
use num::Complex;

use crate::errors::IfsError;

/// Describes the width and height of an integral plane that is assumed
/// to start at 0,0.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the lower-left corner and upper-right corner of the
/// Complex plane, treating the real part of each value as the
/// x-component and the imaginary part of each value as the
/// y-component.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlane(pub Complex<f64>, pub Complex<f64>);

/// The column and row a point lands on.  Signed, because points off
/// the left or top of the image land on negative pixels, and those
/// are dropped by the sink rather than here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pixel(pub i64, pub i64);

/// Maps points on the complex plane to pixels on the integral plane.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// The right-upper hand corner of the integral cartesian plane.
    /// The left-lower is assumed to be at 0,0
    pub integral_plane: IntegralPlane,
    /// The two coordinates defining the complex cartesian plane,
    /// left-lower and right-upper
    pub complex_plane: ComplexPlane,
    // Pixels per unit along each axis.
    grid_factors: (f64, f64),
}

impl PlaneMapper {
    /// Takes the size of the integral plane and two points describing
    /// the complex plane.
    pub fn new(
        width: usize,
        height: usize,
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
    ) -> Result<PlaneMapper, IfsError> {
        if width == 0 || height == 0 {
            return Err(IfsError::Config(format!(
                "image size {}x{} has no pixels",
                width, height
            )));
        }

        if rightupper.re <= leftlower.re {
            return Err(IfsError::Config(
                "The left lower corner is not to the left of the right upper corner.".to_string(),
            ));
        }

        if rightupper.im <= leftlower.im {
            return Err(IfsError::Config(
                "The left lower corner is not lower than the right upper corner".to_string(),
            ));
        }

        let region_width = rightupper.re - leftlower.re;
        let region_height = rightupper.im - leftlower.im;

        let grid_factors = (
            (width as f64) / region_width,
            (height as f64) / region_height,
        );

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            complex_plane: ComplexPlane(leftlower, rightupper),
            grid_factors,
        })
    }

    /// The viewport the chaos game plots: -1-1i to 1+1i.
    pub fn unit_square(width: usize, height: usize) -> Result<PlaneMapper, IfsError> {
        PlaneMapper::new(
            width,
            height,
            Complex::new(-1.0, -1.0),
            Complex::new(1.0, 1.0),
        )
    }

    /// Given a complex number corresponding to a location on the
    /// complex cartesian plane, find the pixel it falls in by flooring.
    /// The pixel may lie outside the image.  A point with a non-finite
    /// coordinate has no pixel.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let left = ((point.re - self.complex_plane.0.re) * self.grid_factors.0).floor();
        let top = ((point.im - self.complex_plane.0.im) * self.grid_factors.1).floor();
        if !left.is_finite() || !top.is_finite() {
            return None;
        }
        Some(Pixel(left as i64, top as i64))
    }
}
