// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! System descriptors: the JSON form of an iterated function system.
//!
//! A descriptor maps a transform name to the list of parameter
//! objects for every transform of that kind:
//!
//! ```text
//! {
//!   "Linear":                [ { "matrix": [[a,b],[c,d]] } ],
//!   "AffineTransform":       [ { "matrix": [[a,b],[c,d]], "translation": [x,y] } ],
//!   "MoebiusTransform":      [ { "a": z, "b": z, "c": z, "d": z } ],
//!   "InverseJuliaTransform": [ { "r": 1.0, "theta": 0.5 } ]
//! }
//! ```
//!
//! Complex numbers are written as
//! `{"__complex__": true, "real": 1.0, "imag": 0.0}`.  Any parameter
//! object may also carry a `"weight"` and a `"color"`; both are
//! written on export so that a saved system reloads exactly.

use num::Complex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::IfsError;
use crate::transform::TransformKind;

/// A complex number in its tagged JSON form.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonComplex {
    /// Always `true`; marks the object as a complex number.
    #[serde(rename = "__complex__")]
    pub tag: bool,
    /// Real part.
    pub real: f64,
    /// Imaginary part.
    pub imag: f64,
}

impl From<Complex<f64>> for JsonComplex {
    fn from(z: Complex<f64>) -> Self {
        JsonComplex {
            tag: true,
            real: z.re,
            imag: z.im,
        }
    }
}

impl From<JsonComplex> for Complex<f64> {
    fn from(z: JsonComplex) -> Self {
        Complex::new(z.real, z.imag)
    }
}

/// Parameters of a `Linear` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearParams {
    /// `[[a,b],[c,d]]`
    pub matrix: [[f64; 2]; 2],
    /// Base color; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f64; 3]>,
    /// Selection weight; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Parameters of an `AffineTransform` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AffineParams {
    /// `[[a,b],[c,d]]`
    pub matrix: [[f64; 2]; 2],
    /// `[xshift, yshift]`
    pub translation: [f64; 2],
    /// Base color; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f64; 3]>,
    /// Selection weight; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Parameters of a `MoebiusTransform` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoebiusParams {
    /// Numerator coefficient of `z`.
    pub a: JsonComplex,
    /// Numerator constant.
    pub b: JsonComplex,
    /// Denominator coefficient of `z`.
    pub c: JsonComplex,
    /// Denominator constant.
    pub d: JsonComplex,
    /// Base color; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f64; 3]>,
    /// Selection weight; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Parameters of an `InverseJuliaTransform` entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InverseJuliaParams {
    /// Modulus of the Julia constant.
    pub r: f64,
    /// Argument of the Julia constant.
    pub theta: f64,
    /// Base color; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[f64; 3]>,
    /// Selection weight; drawn at random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// One descriptor entry, tagged by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformParams {
    /// A `Linear` entry.
    Linear(LinearParams),
    /// An `AffineTransform` entry.
    Affine(AffineParams),
    /// A `MoebiusTransform` entry.
    Moebius(MoebiusParams),
    /// An `InverseJuliaTransform` entry.
    InverseJulia(InverseJuliaParams),
}

impl TransformParams {
    /// The registry: maps a kind to the parameter record it reads.
    /// Field names and shapes are checked here, so a bad entry fails
    /// at load time and never reaches the renderer.
    pub fn parse(kind: TransformKind, value: Value) -> Result<Self, IfsError> {
        let parsed = match kind {
            TransformKind::Linear => serde_json::from_value(value).map(TransformParams::Linear),
            TransformKind::Affine => serde_json::from_value(value).map(TransformParams::Affine),
            TransformKind::Moebius => serde_json::from_value(value).map(TransformParams::Moebius),
            TransformKind::InverseJulia => {
                serde_json::from_value(value).map(TransformParams::InverseJulia)
            }
        };
        let params = parsed.map_err(|e| IfsError::Config(format!("{} entry: {}", kind, e)))?;
        if let TransformParams::Moebius(ref p) = params {
            if [p.a, p.b, p.c, p.d].iter().any(|z| !z.tag) {
                return Err(IfsError::Config(format!(
                    "{} entry: coefficients must be tagged complex numbers",
                    kind
                )));
            }
        }
        Ok(params)
    }

    /// Which kind of transform these parameters build.
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformParams::Linear(_) => TransformKind::Linear,
            TransformParams::Affine(_) => TransformKind::Affine,
            TransformParams::Moebius(_) => TransformKind::Moebius,
            TransformParams::InverseJulia(_) => TransformKind::InverseJulia,
        }
    }

    /// The stored weight, if any.
    pub fn weight(&self) -> Option<f64> {
        match self {
            TransformParams::Linear(p) => p.weight,
            TransformParams::Affine(p) => p.weight,
            TransformParams::Moebius(p) => p.weight,
            TransformParams::InverseJulia(p) => p.weight,
        }
    }

    /// The stored color, if any.
    pub fn color(&self) -> Option<[f64; 3]> {
        match self {
            TransformParams::Linear(p) => p.color,
            TransformParams::Affine(p) => p.color,
            TransformParams::Moebius(p) => p.color,
            TransformParams::InverseJulia(p) => p.color,
        }
    }

    /// Replaces the stored weight.
    pub fn with_weight(mut self, weight: Option<f64>) -> Self {
        match self {
            TransformParams::Linear(ref mut p) => p.weight = weight,
            TransformParams::Affine(ref mut p) => p.weight = weight,
            TransformParams::Moebius(ref mut p) => p.weight = weight,
            TransformParams::InverseJulia(ref mut p) => p.weight = weight,
        }
        self
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            TransformParams::Linear(p) => serde_json::to_value(p),
            TransformParams::Affine(p) => serde_json::to_value(p),
            TransformParams::Moebius(p) => serde_json::to_value(p),
            TransformParams::InverseJulia(p) => serde_json::to_value(p),
        }
    }
}

/// An ordered list of descriptor entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemDescriptor {
    entries: Vec<TransformParams>,
}

impl SystemDescriptor {
    /// An empty descriptor.
    pub fn new() -> Self {
        SystemDescriptor::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, params: TransformParams) {
        self.entries.push(params);
    }

    /// The entries, in load (or insertion) order.
    pub fn entries(&self) -> &[TransformParams] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads the JSON mapping.  Groups are visited in file order and
    /// entries within a group in list order.
    pub fn from_value(value: &Value) -> Result<Self, IfsError> {
        let groups = value.as_object().ok_or_else(|| {
            IfsError::Config("transforms must map transform names to lists".to_string())
        })?;
        let mut descriptor = SystemDescriptor::new();
        for (name, list) in groups {
            let kind: TransformKind = name.parse()?;
            let items = list.as_array().ok_or_else(|| {
                IfsError::Config(format!("{} must be a list of parameter objects", name))
            })?;
            for item in items {
                descriptor.push(TransformParams::parse(kind, item.clone())?);
            }
        }
        Ok(descriptor)
    }

    /// Parses a JSON document holding just the mapping.
    pub fn from_json(text: &str) -> Result<Self, IfsError> {
        let value: Value = serde_json::from_str(text)?;
        SystemDescriptor::from_value(&value)
    }

    /// Writes the JSON mapping.  Entries are grouped by kind; groups
    /// appear in the order their first entry does.
    pub fn to_value(&self) -> Result<Value, IfsError> {
        let mut groups = Map::new();
        for entry in &self.entries {
            let value = entry.to_value()?;
            let slot = groups
                .entry(entry.kind().name())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = slot {
                list.push(value);
            }
        }
        Ok(Value::Object(groups))
    }
}
