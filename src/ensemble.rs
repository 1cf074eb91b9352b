// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The weighted ensemble: the iterated function system proper.
//!
//! The ensemble is an ordered list of transforms, each with a weight.
//! On every step of a walk one transform is picked with probability
//! proportional to its weight.  Unless told otherwise, a new transform
//! gets a weight drawn as the product of two normal samples with mean
//! 1 and deviation 0.15, which gives most transforms roughly equal say
//! while letting a few dominate or fade.

use rand::distributions::{Distribution, Uniform};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::{debug, info};

use crate::descriptor::SystemDescriptor;
use crate::errors::IfsError;
use crate::transform::{RandomBounds, Transform, TransformKind};

/// A transform and its selection weight.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Entry {
    /// Relative probability of selection; never negative.
    pub weight: f64,
    /// The transform applied when this entry is selected.
    pub transform: Transform,
}

/// An ordered, weighted list of transforms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightedEnsemble {
    entries: Vec<Entry>,
    total_weight: f64,
}

/// `N(1, 0.15) · N(1, 0.15)`
pub fn default_weight<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let first: f64 = StandardNormal.sample(rng);
    let second: f64 = StandardNormal.sample(rng);
    (1.0 + 0.15 * first) * (1.0 + 0.15 * second)
}

fn checked_weight<R: Rng + ?Sized>(weight: Option<f64>, rng: &mut R) -> Result<f64, IfsError> {
    let weight = weight.unwrap_or_else(|| default_weight(rng));
    if !weight.is_finite() || weight < 0.0 {
        return Err(IfsError::InvalidWeight(weight));
    }
    Ok(weight)
}

impl WeightedEnsemble {
    /// An empty ensemble.  It must be given at least one transform of
    /// positive weight before it can be rendered.
    pub fn new() -> Self {
        WeightedEnsemble::default()
    }

    /// Appends a transform.  With no weight given one is drawn from
    /// [`default_weight`].
    pub fn add_transform<R: Rng + ?Sized>(
        &mut self,
        transform: Transform,
        weight: Option<f64>,
        rng: &mut R,
    ) -> Result<(), IfsError> {
        let weight = checked_weight(weight, rng)?;
        self.entries.push(Entry { weight, transform });
        self.total_weight += weight;
        Ok(())
    }

    /// Inserts a transform at `index`, shifting later entries back.
    /// Selection walks entries in order, so position matters only for
    /// which transform a given random draw lands on, never for the
    /// probabilities.
    pub fn insert_transform<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        transform: Transform,
        weight: Option<f64>,
        rng: &mut R,
    ) -> Result<(), IfsError> {
        if index > self.entries.len() {
            return Err(IfsError::Config(format!(
                "cannot insert at {} into an ensemble of {}",
                index,
                self.entries.len()
            )));
        }
        let weight = checked_weight(weight, rng)?;
        self.entries.insert(index, Entry { weight, transform });
        self.total_weight = self.entries.iter().map(|e| e.weight).sum();
        Ok(())
    }

    /// An ensemble of `count` random transforms, each of a kind drawn
    /// uniformly from `kinds`.
    pub fn random<R: Rng + ?Sized>(
        count: usize,
        kinds: &[TransformKind],
        bounds: &RandomBounds,
        rng: &mut R,
    ) -> Result<Self, IfsError> {
        let mut ensemble = WeightedEnsemble::new();
        ensemble.add_random(count, kinds, bounds, rng)?;
        Ok(ensemble)
    }

    /// Appends `count` random transforms.
    pub fn add_random<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        kinds: &[TransformKind],
        bounds: &RandomBounds,
        rng: &mut R,
    ) -> Result<(), IfsError> {
        if count == 0 {
            return Ok(());
        }
        bounds.validate()?;
        for _ in 0..count {
            let kind = *kinds.choose(rng).ok_or_else(|| {
                IfsError::Config("no transform kinds to draw from".to_string())
            })?;
            let transform = Transform::random(kind, bounds, rng);
            debug!("random transform {}", transform);
            self.add_transform(transform, None, rng)?;
        }
        Ok(())
    }

    /// The entries in selection order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ensemble has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sum of all entry weights.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Checks that the ensemble can be rendered.  Called before any
    /// walk starts, so a degenerate system never reaches the hot loop.
    pub fn validate(&self) -> Result<(), IfsError> {
        if self.entries.is_empty() {
            return Err(IfsError::DegenerateSystem(
                "the system has no transforms".to_string(),
            ));
        }
        if !(self.total_weight > 0.0 && self.total_weight.is_finite()) {
            return Err(IfsError::DegenerateSystem(format!(
                "total weight is {}, it must be positive and finite",
                self.total_weight
            )));
        }
        Ok(())
    }

    /// Picks a transform with probability proportional to its weight.
    /// Returns `None` only when no entry has positive weight.
    pub fn choose_transform<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Transform> {
        if !(self.total_weight > 0.0 && self.total_weight.is_finite()) {
            return None;
        }
        let w = Uniform::new(0.0, self.total_weight).sample(rng);
        let mut running_total = 0.0;
        for entry in &self.entries {
            running_total += entry.weight;
            if w < running_total {
                return Some(&entry.transform);
            }
        }
        // Rounding in the running sum can leave it a hair short of the
        // cached total.
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.weight > 0.0)
            .map(|entry| &entry.transform)
    }

    /// Builds an ensemble from a descriptor, in descriptor order.
    /// Entries without a weight get a random one.
    pub fn from_descriptor<R: Rng + ?Sized>(
        descriptor: &SystemDescriptor,
        rng: &mut R,
    ) -> Result<Self, IfsError> {
        let mut ensemble = WeightedEnsemble::new();
        for params in descriptor.entries() {
            let transform = Transform::from_params(params, rng)?;
            info!("loaded {}", transform);
            ensemble.add_transform(transform, params.weight(), rng)?;
        }
        Ok(ensemble)
    }

    /// Exports every entry, weights and colors included, so that
    /// [`WeightedEnsemble::from_descriptor`] rebuilds this ensemble.
    pub fn to_descriptor(&self) -> SystemDescriptor {
        let mut descriptor = SystemDescriptor::new();
        for entry in &self.entries {
            descriptor.push(entry.transform.describe().with_weight(Some(entry.weight)));
        }
        descriptor
    }
}
