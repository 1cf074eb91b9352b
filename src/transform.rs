// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The transform library.
//!
//! Each transform is a map from the plane to itself.  We treat the
//! plane as the complex plane throughout: a point is just a
//! `Complex<f64>`, the real part being the x-component and the
//! imaginary part the y-component.  The real-linear maps (`Linear`,
//! `Affine`) read the point as a pair of reals; the complex maps
//! (`Moebius`, `InverseJulia`) read it as a single complex number.
//!
//! Every transform also carries a base color.  As a walk visits a
//! transform, the walk's running color is averaged toward that base
//! color, so each transform "paints" the part of the attractor it is
//! responsible for, and the colors bleed across the boundaries where
//! transforms hand the point to one another.

use std::f64::consts::PI;
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

use num::Complex;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::descriptor::{
    AffineParams, InverseJuliaParams, JsonComplex, LinearParams, MoebiusParams, TransformParams,
};
use crate::errors::IfsError;

/// A red, green, blue triple.  Base colors live in `[0,1)`; a walk's
/// running color stays inside `[0,1]`; accumulated radiance is
/// unbounded.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    /// The color every walk starts with.
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    /// A color with each channel drawn uniformly from `[0,1)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Rgb(rng.gen(), rng.gen(), rng.gen())
    }

    /// Validates a color read from a descriptor.
    pub fn from_array(channels: [f64; 3]) -> Result<Self, IfsError> {
        if channels
            .iter()
            .any(|c| !c.is_finite() || *c < 0.0 || *c > 1.0)
        {
            return Err(IfsError::Config(format!(
                "color {:?} has a channel outside [0,1]",
                channels
            )));
        }
        Ok(Rgb(channels[0], channels[1], channels[2]))
    }

    /// The channels as an array, for serialization.
    pub fn to_array(self) -> [f64; 3] {
        [self.0, self.1, self.2]
    }

    /// The channel-wise mean of two colors.
    pub fn average(self, other: Rgb) -> Rgb {
        Rgb(
            (self.0 + other.0) / 2.0,
            (self.1 + other.1) / 2.0,
            (self.2 + other.2) / 2.0,
        )
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, other: Rgb) {
        self.0 += other.0;
        self.1 += other.1;
        self.2 += other.2;
    }
}

/// A complex linear-fractional (Möbius) map `z -> (az + b) / (cz + d)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mobius {
    /// Numerator coefficient of `z`.
    pub a: Complex<f64>,
    /// Numerator constant.
    pub b: Complex<f64>,
    /// Denominator coefficient of `z`.
    pub c: Complex<f64>,
    /// Denominator constant.
    pub d: Complex<f64>,
}

impl Mobius {
    /// Builds the map from its four coefficients.
    pub fn new(a: Complex<f64>, b: Complex<f64>, c: Complex<f64>, d: Complex<f64>) -> Self {
        Mobius { a, b, c, d }
    }

    /// The fixed map applied to every point before plotting: `z/2`.
    /// Chaotic trajectories wander well outside the unit square; this
    /// pulls them back toward the `[-1,1]` viewport.
    pub fn final_projection() -> Self {
        Mobius::new(
            Complex::new(0.5, 0.0),
            Complex::new(0.0, 0.0),
            Complex::new(0.0, 0.0),
            Complex::new(1.0, 0.0),
        )
    }

    /// Coefficients with real and imaginary parts uniform in `[-1,1)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let unit = Uniform::new(-1.0_f64, 1.0);
        let mut coefficients = [Complex::new(0.0, 0.0); 4];
        for coefficient in coefficients.iter_mut() {
            let re = unit.sample(rng);
            let im = unit.sample(rng);
            *coefficient = Complex::new(re, im);
        }
        let [a, b, c, d] = coefficients;
        Mobius::new(a, b, c, d)
    }

    /// Applies the map.  A denominator that is exactly zero is reported
    /// rather than turned into an infinity.
    pub fn map(&self, z: Complex<f64>) -> Result<Complex<f64>, IfsError> {
        let denominator = self.c * z + self.d;
        if denominator.re == 0.0 && denominator.im == 0.0 {
            return Err(IfsError::DivisionSingularity);
        }
        Ok(scaled_div(self.a * z + self.b, denominator))
    }
}

/// Smith's complex division.  Dividing through by the larger part of
/// the denominator keeps `|d|²` out of the computation, so very small
/// or very large denominators don't overflow to infinity or NaN.
fn scaled_div(n: Complex<f64>, d: Complex<f64>) -> Complex<f64> {
    if d.re.abs() >= d.im.abs() {
        let ratio = d.im / d.re;
        let scale = d.re + d.im * ratio;
        Complex::new((n.re + n.im * ratio) / scale, (n.im - n.re * ratio) / scale)
    } else {
        let ratio = d.re / d.im;
        let scale = d.re * ratio + d.im;
        Complex::new((n.re * ratio + n.im) / scale, (n.im * ratio - n.re) / scale)
    }
}

/// The geometric half of a transform.  Immutable once built.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Geometry {
    /// The real matrix `[[a,b],[c,d]]`.
    Linear {
        /// Row 0, column 0.
        a: f64,
        /// Row 0, column 1.
        b: f64,
        /// Row 1, column 0.
        c: f64,
        /// Row 1, column 1.
        d: f64,
    },
    /// The real matrix `[[a,b],[c,d]]` followed by a translation.
    Affine {
        /// Row 0, column 0.
        a: f64,
        /// Row 0, column 1.
        b: f64,
        /// Row 1, column 0.
        c: f64,
        /// Row 1, column 1.
        d: f64,
        /// Translation along x.
        xshift: f64,
        /// Translation along y.
        yshift: f64,
    },
    /// A complex linear-fractional map.
    Moebius(Mobius),
    /// One randomly chosen square-root branch of the inverse of
    /// `z -> z² + c`, with `c = r·e^(iθ)`.
    InverseJulia {
        /// Modulus of `c`.
        r: f64,
        /// Argument of `c`.
        theta: f64,
        /// The constant itself, derived from `r` and `theta`.
        c: Complex<f64>,
    },
}

/// The closed set of transform variants, named the way descriptors
/// name them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// See [`Geometry::Linear`].
    #[serde(rename = "Linear")]
    Linear,
    /// See [`Geometry::Affine`].
    #[serde(rename = "AffineTransform")]
    Affine,
    /// See [`Geometry::Moebius`].
    #[serde(rename = "MoebiusTransform")]
    Moebius,
    /// See [`Geometry::InverseJulia`].
    #[serde(rename = "InverseJuliaTransform")]
    InverseJulia,
}

/// The kinds a randomly generated system draws from when none are
/// named.  Plain linear maps are left out: without a translation they
/// all share the origin as a fixed point, which makes for dull systems.
pub const DEFAULT_RANDOM_KINDS: [TransformKind; 3] = [
    TransformKind::Affine,
    TransformKind::Moebius,
    TransformKind::InverseJulia,
];

impl TransformKind {
    /// Every variant, in descriptor order.
    pub const ALL: [TransformKind; 4] = [
        TransformKind::Linear,
        TransformKind::Affine,
        TransformKind::Moebius,
        TransformKind::InverseJulia,
    ];

    /// The key this kind is filed under in a system descriptor.
    pub fn name(self) -> &'static str {
        match self {
            TransformKind::Linear => "Linear",
            TransformKind::Affine => "AffineTransform",
            TransformKind::Moebius => "MoebiusTransform",
            TransformKind::InverseJulia => "InverseJuliaTransform",
        }
    }
}

impl FromStr for TransformKind {
    type Err = IfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformKind::ALL
            .iter()
            .find(|kind| kind.name() == s)
            .cloned()
            .ok_or_else(|| IfsError::Config(format!("unknown transform type `{}`", s)))
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The ranges random real-linear transforms draw their coefficients
/// from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RandomBounds {
    /// Range of each matrix entry.
    pub matrix: (f64, f64),
    /// Range of each translation component.
    pub shift: (f64, f64),
}

impl Default for RandomBounds {
    fn default() -> Self {
        RandomBounds {
            matrix: (-1.0, 1.0),
            shift: (-2.0, 2.0),
        }
    }
}

impl RandomBounds {
    /// Both ranges must be finite and non-empty.
    pub fn validate(&self) -> Result<(), IfsError> {
        for (label, (low, high)) in &[("matrix", self.matrix), ("shift", self.shift)] {
            if !low.is_finite() || !high.is_finite() || low >= high {
                return Err(IfsError::Config(format!(
                    "{} bounds [{}, {}] are not a valid range",
                    label, low, high
                )));
            }
        }
        Ok(())
    }
}

/// A transform: a geometry plus the base color it blends walks toward.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    geometry: Geometry,
    color: Rgb,
}

impl Transform {
    /// A linear map from its matrix `[[a,b],[c,d]]`.
    pub fn linear(matrix: [[f64; 2]; 2], color: Rgb) -> Self {
        let [[a, b], [c, d]] = matrix;
        Transform {
            geometry: Geometry::Linear { a, b, c, d },
            color,
        }
    }

    /// An affine map from its matrix and translation.
    pub fn affine(matrix: [[f64; 2]; 2], translation: [f64; 2], color: Rgb) -> Self {
        let [[a, b], [c, d]] = matrix;
        let [xshift, yshift] = translation;
        Transform {
            geometry: Geometry::Affine {
                a,
                b,
                c,
                d,
                xshift,
                yshift,
            },
            color,
        }
    }

    /// A Möbius map from its four coefficients.
    pub fn moebius(mobius: Mobius, color: Rgb) -> Self {
        Transform {
            geometry: Geometry::Moebius(mobius),
            color,
        }
    }

    /// An inverse Julia map for the constant `r·e^(iθ)`.
    pub fn inverse_julia(r: f64, theta: f64, color: Rgb) -> Self {
        Transform {
            geometry: Geometry::InverseJulia {
                r,
                theta,
                c: Complex::new(r * theta.cos(), r * theta.sin()),
            },
            color,
        }
    }

    /// A random linear map, each entry uniform in `bounds`.
    ///
    /// # Panics
    ///
    /// Panics if `bounds` is an empty range; see
    /// [`RandomBounds::validate`].
    pub fn random_linear<R: Rng + ?Sized>(bounds: (f64, f64), rng: &mut R) -> Self {
        let matrix = random_matrix(bounds, rng);
        Transform::linear(matrix, Rgb::random(rng))
    }

    /// A random affine map, matrix entries uniform in `bounds` and
    /// translation components uniform in `shift`.
    pub fn random_affine<R: Rng + ?Sized>(
        bounds: (f64, f64),
        shift: (f64, f64),
        rng: &mut R,
    ) -> Self {
        let matrix = random_matrix(bounds, rng);
        let shift = Uniform::new(shift.0, shift.1);
        let translation = [shift.sample(rng), shift.sample(rng)];
        Transform::affine(matrix, translation, Rgb::random(rng))
    }

    /// A random Möbius map.
    pub fn random_moebius<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mobius = Mobius::random(rng);
        Transform::moebius(mobius, Rgb::random(rng))
    }

    /// A random inverse Julia map.  `r` lands in `[0.8,1.2)`, weighted
    /// toward the outside of that ring the way a uniform draw over an
    /// annulus would be; `theta` is uniform around the circle.
    pub fn random_inverse_julia<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let r = rng.gen::<f64>().sqrt() * 0.4 + 0.8;
        let theta = 2.0 * PI * rng.gen::<f64>();
        Transform::inverse_julia(r, theta, Rgb::random(rng))
    }

    /// A random transform of the given kind.
    pub fn random<R: Rng + ?Sized>(kind: TransformKind, bounds: &RandomBounds, rng: &mut R) -> Self {
        match kind {
            TransformKind::Linear => Transform::random_linear(bounds.matrix, rng),
            TransformKind::Affine => Transform::random_affine(bounds.matrix, bounds.shift, rng),
            TransformKind::Moebius => Transform::random_moebius(rng),
            TransformKind::InverseJulia => Transform::random_inverse_julia(rng),
        }
    }

    /// Which variant this is.
    pub fn kind(&self) -> TransformKind {
        match self.geometry {
            Geometry::Linear { .. } => TransformKind::Linear,
            Geometry::Affine { .. } => TransformKind::Affine,
            Geometry::Moebius(_) => TransformKind::Moebius,
            Geometry::InverseJulia { .. } => TransformKind::InverseJulia,
        }
    }

    /// The geometric parameters.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The base color.
    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Moves a point.  The inverse Julia map consumes one random bit
    /// per call to pick its square-root branch; the other variants
    /// leave `rng` alone.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        z: Complex<f64>,
        rng: &mut R,
    ) -> Result<Complex<f64>, IfsError> {
        match self.geometry {
            Geometry::Linear { a, b, c, d } => {
                Ok(Complex::new(a * z.re + b * z.im, c * z.re + d * z.im))
            }
            Geometry::Affine {
                a,
                b,
                c,
                d,
                xshift,
                yshift,
            } => Ok(Complex::new(
                (a * z.re + b * z.im) + xshift,
                (c * z.re + d * z.im) + yshift,
            )),
            Geometry::Moebius(ref mobius) => mobius.map(z),
            Geometry::InverseJulia { c, .. } => {
                let z2 = c - z;
                let theta = z2.im.atan2(z2.re) * 0.5;
                let magnitude = z2.norm_sqr().powf(0.25);
                let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
                Ok(Complex::new(
                    sign * magnitude * theta.cos(),
                    sign * magnitude * theta.sin(),
                ))
            }
        }
    }

    /// Moves a running color halfway toward this transform's base
    /// color.  After `k` consecutive visits the distance to the base
    /// color has shrunk by `2^-k`.
    pub fn blend_color(&self, color: Rgb) -> Rgb {
        self.color.average(color)
    }

    /// Exports the parameters needed to rebuild this transform,
    /// color included.  The weight is the ensemble's business and is
    /// left unset.
    pub fn describe(&self) -> TransformParams {
        let color = Some(self.color.to_array());
        match self.geometry {
            Geometry::Linear { a, b, c, d } => TransformParams::Linear(LinearParams {
                matrix: [[a, b], [c, d]],
                color,
                weight: None,
            }),
            Geometry::Affine {
                a,
                b,
                c,
                d,
                xshift,
                yshift,
            } => TransformParams::Affine(AffineParams {
                matrix: [[a, b], [c, d]],
                translation: [xshift, yshift],
                color,
                weight: None,
            }),
            Geometry::Moebius(mobius) => TransformParams::Moebius(MoebiusParams {
                a: JsonComplex::from(mobius.a),
                b: JsonComplex::from(mobius.b),
                c: JsonComplex::from(mobius.c),
                d: JsonComplex::from(mobius.d),
                color,
                weight: None,
            }),
            Geometry::InverseJulia { r, theta, .. } => {
                TransformParams::InverseJulia(InverseJuliaParams {
                    r,
                    theta,
                    color,
                    weight: None,
                })
            }
        }
    }

    /// Builds a transform from descriptor parameters.  A missing color
    /// is drawn at random.
    pub fn from_params<R: Rng + ?Sized>(
        params: &TransformParams,
        rng: &mut R,
    ) -> Result<Self, IfsError> {
        let color = match params.color() {
            Some(channels) => Rgb::from_array(channels)?,
            None => Rgb::random(rng),
        };
        let transform = match params {
            TransformParams::Linear(p) => Transform::linear(p.matrix, color),
            TransformParams::Affine(p) => Transform::affine(p.matrix, p.translation, color),
            TransformParams::Moebius(p) => Transform::moebius(
                Mobius::new(
                    Complex::from(p.a),
                    Complex::from(p.b),
                    Complex::from(p.c),
                    Complex::from(p.d),
                ),
                color,
            ),
            TransformParams::InverseJulia(p) => Transform::inverse_julia(p.r, p.theta, color),
        };
        Ok(transform)
    }
}

fn random_matrix<R: Rng + ?Sized>(bounds: (f64, f64), rng: &mut R) -> [[f64; 2]; 2] {
    let entry = Uniform::new(bounds.0, bounds.1);
    let a = entry.sample(rng);
    let b = entry.sample(rng);
    let c = entry.sample(rng);
    let d = entry.sample(rng);
    [[a, b], [c, d]]
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.geometry {
            Geometry::Linear { a, b, c, d } => write!(
                f,
                "Linear:[[{:+.5},{:+.5}],[{:+.5},{:+.5}]]",
                a, b, c, d
            ),
            Geometry::Affine {
                a,
                b,
                c,
                d,
                xshift,
                yshift,
            } => write!(
                f,
                "Affine:[[{:+.5},{:+.5}],[{:+.5},{:+.5}]]+[{:+.5},{:+.5}]",
                a, b, c, d, xshift, yshift
            ),
            Geometry::Moebius(m) => write!(
                f,
                "Moebius:(({:.5}+{:.5}i)z+({:.5}+{:.5}i))/(({:.5}+{:.5}i)z+({:.5}+{:.5}i))",
                m.a.re, m.a.im, m.b.re, m.b.im, m.c.re, m.c.im, m.d.re, m.d.im
            ),
            Geometry::InverseJulia { r, theta, .. } => {
                write!(f, "Inverse Julia: r={}, theta={}", r, theta)
            }
        }
    }
}
