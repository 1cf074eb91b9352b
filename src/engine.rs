// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The chaos game.
//!
//! A walk starts at a random point in the unit square with a black
//! color.  On every step it asks the ensemble for a transform, moves
//! the point with it, blends the color toward the transform's base
//! color, pushes the point through the fixed final projection and
//! plots the result.  Walks share nothing but the image, so the render
//! hands each worker thread its own share of walks, its own random
//! generator and its own canvas, and sums the canvases at the end.

use std::ops::AddAssign;
use std::time::{Duration, Instant};

use crossbeam::thread::ScopedJoinHandle;
use num::Complex;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::canvas::{Canvas, RadianceSink};
use crate::ensemble::WeightedEnsemble;
use crate::errors::IfsError;
use crate::planes::{Pixel, PlaneMapper};
use crate::transform::{Mobius, Rgb};

/// A colored point headed for the image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample {
    /// Where it lands.  May be off the image.
    pub pixel: Pixel,
    /// The walk's running color at the time.
    pub color: Rgb,
}

/// What happened on one step of a walk.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Step {
    /// The point moved and should be plotted.
    Sample(Sample),
    /// The point moved, but the walk is still inside its burn-in.
    BurnIn,
    /// The chosen map had a zero denominator here; the point and
    /// color were left as they were and nothing was plotted.
    Singular,
    /// The point left the representable numbers.  The walk ends.
    Diverged,
}

/// The mutable state of one walk.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WalkState {
    /// Current position.
    pub point: Complex<f64>,
    /// Current running color.
    pub color: Rgb,
}

impl WalkState {
    /// A fresh walk: uniform in the unit square, black.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let unit = Uniform::new_inclusive(-1.0_f64, 1.0);
        let re = unit.sample(rng);
        let im = unit.sample(rng);
        WalkState {
            point: Complex::new(re, im),
            color: Rgb::BLACK,
        }
    }
}

/// Counts of what the walks did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Walks started.
    pub walks: usize,
    /// Samples that landed on the image.
    pub plotted: usize,
    /// Samples that landed off the image and were dropped.
    pub out_of_bounds: usize,
    /// Steps skipped at a zero denominator.
    pub singularities: usize,
    /// Walks cut short because the point stopped being finite.
    pub diverged: usize,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: RenderStats) {
        self.walks += other.walks;
        self.plotted += other.plotted;
        self.out_of_bounds += other.out_of_bounds;
        self.singularities += other.singularities;
        self.diverged += other.diverged;
    }
}

/// How much work to do, and how to split it.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Independent walks.
    pub num_points: usize,
    /// Steps per walk.
    pub iterations: usize,
    /// Leading steps of each walk that move the point without
    /// plotting it.  Zero plots every step.
    pub burn_in: usize,
    /// Worker threads.
    pub threads: usize,
    /// Master seed.  With a seed, the same settings produce the same
    /// image; without one, the seed comes from the operating system.
    pub seed: Option<u64>,
    /// Stop starting new walks once this much time has passed.
    pub time_limit: Option<Duration>,
}

impl RenderSettings {
    /// `num_points` walks of `iterations` steps on every CPU.
    pub fn new(num_points: usize, iterations: usize) -> Self {
        RenderSettings {
            num_points,
            iterations,
            burn_in: 0,
            threads: num_cpus::get(),
            seed: None,
            time_limit: None,
        }
    }
}

/// Splits `total` walks into `parts` shares that differ by at most one.
pub fn partition(total: usize, parts: usize) -> Vec<usize> {
    let parts = parts.max(1);
    let base = total / parts;
    let extra = total % parts;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// A ready-to-run chaos game: the ensemble, the final projection and
/// the mapping from the plane to the image.
#[derive(Debug, Clone)]
pub struct ChaosGame {
    ensemble: WeightedEnsemble,
    projection: Mobius,
    plane: PlaneMapper,
}

impl ChaosGame {
    /// Checks the ensemble up front so a degenerate system fails here
    /// and never in the middle of a render.
    pub fn new(ensemble: WeightedEnsemble, width: usize, height: usize) -> Result<Self, IfsError> {
        ensemble.validate()?;
        Ok(ChaosGame {
            ensemble,
            projection: Mobius::final_projection(),
            plane: PlaneMapper::unit_square(width, height)?,
        })
    }

    /// The system being rendered.
    pub fn ensemble(&self) -> &WeightedEnsemble {
        &self.ensemble
    }

    /// Image width and height.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.plane.integral_plane.0, self.plane.integral_plane.1)
    }

    /// Starts a walk at a random point.
    pub fn walk<'g, 'r, R: Rng + ?Sized>(
        &'g self,
        iterations: usize,
        burn_in: usize,
        rng: &'r mut R,
    ) -> Walk<'g, 'r, R> {
        let state = WalkState::random(rng);
        self.walk_from(state, iterations, burn_in, rng)
    }

    /// Starts a walk at a given state.
    pub fn walk_from<'g, 'r, R: Rng + ?Sized>(
        &'g self,
        state: WalkState,
        iterations: usize,
        burn_in: usize,
        rng: &'r mut R,
    ) -> Walk<'g, 'r, R> {
        Walk {
            game: self,
            rng,
            state,
            remaining: iterations,
            burn_in,
        }
    }

    /// Runs `walks` walks into `sink`, one after another.  Stops
    /// starting new walks once `deadline` passes; a walk already under
    /// way is finished.
    pub fn run<R, S>(
        &self,
        walks: usize,
        iterations: usize,
        burn_in: usize,
        rng: &mut R,
        sink: &mut S,
        deadline: Option<Instant>,
    ) -> RenderStats
    where
        R: Rng + ?Sized,
        S: RadianceSink + ?Sized,
    {
        let mut stats = RenderStats::default();
        for _ in 0..walks {
            if deadline.map_or(false, |d| Instant::now() >= d) {
                break;
            }
            stats.walks += 1;
            for step in self.walk(iterations, burn_in, rng) {
                match step {
                    Step::Sample(sample) => {
                        if sink.add_radiance(sample.pixel, sample.color) {
                            stats.plotted += 1;
                        } else {
                            stats.out_of_bounds += 1;
                        }
                    }
                    Step::BurnIn => {}
                    Step::Singular => stats.singularities += 1,
                    Step::Diverged => stats.diverged += 1,
                }
            }
        }
        stats
    }

    /// Renders the whole image across `settings.threads` workers.
    pub fn render(&self, settings: &RenderSettings) -> Result<(Canvas, RenderStats), IfsError> {
        self.ensemble.validate()?;
        let (width, height) = self.dimensions();
        let shares: Vec<usize> = partition(settings.num_points, settings.threads)
            .into_iter()
            .filter(|share| *share > 0)
            .collect();
        let mut seeder = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds: Vec<u64> = shares.iter().map(|_| seeder.gen()).collect();
        // A limit too far out to fall on the clock is no limit.
        let deadline = settings
            .time_limit
            .and_then(|limit| Instant::now().checked_add(limit));
        let (iterations, burn_in) = (settings.iterations, settings.burn_in);

        info!(
            "rendering {} walks of {} steps on {} workers",
            settings.num_points,
            iterations,
            shares.len()
        );

        let results = crossbeam::scope(|spawner| {
            let handles: Vec<ScopedJoinHandle<(Canvas, RenderStats)>> = shares
                .iter()
                .zip(seeds.iter())
                .enumerate()
                .map(|(worker, (&walks, &seed))| {
                    spawner.spawn(move |_| {
                        let mut rng = StdRng::seed_from_u64(seed);
                        let mut canvas = Canvas::new(width, height);
                        let stats =
                            self.run(walks, iterations, burn_in, &mut rng, &mut canvas, deadline);
                        debug!("worker {} finished: {:?}", worker, stats);
                        (canvas, stats)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|_| IfsError::Worker("render scope panicked".to_string()))?
        .map_err(|_| IfsError::Worker("a render worker panicked".to_string()))?;

        let mut stats = RenderStats::default();
        let mut canvases = Vec::with_capacity(results.len());
        for (canvas, worker_stats) in results {
            stats += worker_stats;
            canvases.push(canvas);
        }
        let canvas = Canvas::merge_all(width, height, canvases)?;

        if stats.walks < settings.num_points {
            warn!(
                "time limit reached after {} of {} walks",
                stats.walks, settings.num_points
            );
        }
        if stats.singularities > 0 {
            warn!("{} steps hit a zero denominator and were skipped", stats.singularities);
        }
        info!("render finished: {:?}", stats);
        Ok((canvas, stats))
    }
}

/// One walk, as an iterator over its steps.
pub struct Walk<'g, 'r, R: Rng + ?Sized> {
    game: &'g ChaosGame,
    rng: &'r mut R,
    state: WalkState,
    remaining: usize,
    burn_in: usize,
}

impl<'g, 'r, R: Rng + ?Sized> Walk<'g, 'r, R> {
    /// Where the walk is now.
    pub fn state(&self) -> WalkState {
        self.state
    }
}

impl<'g, 'r, R: Rng + ?Sized> Iterator for Walk<'g, 'r, R> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let transform = match self.game.ensemble.choose_transform(self.rng) {
            Some(transform) => transform,
            None => {
                self.remaining = 0;
                return None;
            }
        };
        let point = match transform.apply(self.state.point, self.rng) {
            Ok(point) => point,
            Err(_) => return Some(Step::Singular),
        };
        if !point.re.is_finite() || !point.im.is_finite() {
            self.remaining = 0;
            return Some(Step::Diverged);
        }
        self.state.point = point;
        self.state.color = transform.blend_color(self.state.color);

        if self.burn_in > 0 {
            self.burn_in -= 1;
            return Some(Step::BurnIn);
        }

        let projected = match self.game.projection.map(point) {
            Ok(projected) => projected,
            Err(_) => return Some(Step::Singular),
        };
        match self.game.plane.point_to_pixel(&projected) {
            Some(pixel) => Some(Step::Sample(Sample {
                pixel,
                color: self.state.color,
            })),
            None => {
                self.remaining = 0;
                Some(Step::Diverged)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Transform, DEFAULT_RANDOM_KINDS, RandomBounds};

    fn contraction(factor: f64) -> Transform {
        Transform::linear([[factor, 0.0], [0.0, factor]], Rgb(1.0, 0.5, 0.0))
    }

    fn single(transform: Transform) -> WeightedEnsemble {
        let mut rng = StdRng::seed_from_u64(0);
        let mut ensemble = WeightedEnsemble::new();
        ensemble.add_transform(transform, Some(1.0), &mut rng).unwrap();
        ensemble
    }

    fn settings(num_points: usize, iterations: usize, threads: usize, seed: u64) -> RenderSettings {
        RenderSettings {
            threads,
            seed: Some(seed),
            ..RenderSettings::new(num_points, iterations)
        }
    }

    #[test]
    fn partitions_cover_every_walk() {
        assert_eq!(partition(10, 3), vec![4, 3, 3]);
        assert_eq!(partition(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(partition(7, 0), vec![7]);
        assert_eq!(partition(1000, 7).iter().sum::<usize>(), 1000);
    }

    #[test]
    fn degenerate_systems_fail_before_any_walk() {
        match ChaosGame::new(WeightedEnsemble::new(), 10, 10) {
            Err(IfsError::DegenerateSystem(_)) => {}
            other => panic!("expected a degenerate system, got {:?}", other.map(|_| ())),
        }
        let mut rng = StdRng::seed_from_u64(1);
        let mut ensemble = WeightedEnsemble::new();
        ensemble.add_transform(contraction(0.5), Some(0.0), &mut rng).unwrap();
        assert!(ChaosGame::new(ensemble, 10, 10).is_err());
    }

    #[test]
    fn the_projection_halves_points_before_plotting() {
        let game = ChaosGame::new(single(contraction(1.0)), 100, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let start = WalkState {
            point: Complex::new(2.0, 0.0),
            color: Rgb::BLACK,
        };
        let steps: Vec<Step> = game.walk_from(start, 1, 0, &mut rng).collect();
        assert_eq!(
            steps,
            vec![Step::Sample(Sample {
                pixel: Pixel(100, 50),
                color: Rgb(0.5, 0.25, 0.0),
            })]
        );
        let mut canvas = Canvas::new(100, 100);
        let stats = game.run(1, 1, 0, &mut rng, &mut canvas, None);
        assert_eq!(stats.walks, 1);
        assert_eq!(stats.plotted + stats.out_of_bounds, 1);
    }

    #[test]
    fn a_contraction_converges_on_the_center_pixel() {
        // An odd size puts the origin in the middle of pixel (50, 50).
        let game = ChaosGame::new(single(contraction(0.5)), 101, 101).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let steps: Vec<Step> = game.walk(50, 0, &mut rng).collect();
        assert_eq!(steps.len(), 50);
        let pixels: Vec<Pixel> = steps
            .iter()
            .map(|step| match step {
                Step::Sample(sample) => sample.pixel,
                other => panic!("unexpected step {:?}", other),
            })
            .collect();
        // After one step the point is within 1/2 of the origin and the
        // projection halves that again, so every sample is in the
        // middle half of the image; after eight it is pinned.
        for pixel in &pixels {
            assert!((pixel.0 - 50).abs() <= 13 && (pixel.1 - 50).abs() <= 13);
        }
        assert!(pixels[8..].iter().all(|pixel| *pixel == Pixel(50, 50)));
    }

    #[test]
    fn walks_stay_put_at_a_singularity() {
        // Linear zero sends everything to the origin, where z -> 1/z
        // has a zero denominator.
        let zero = Complex::new(0.0, 0.0);
        let one = Complex::new(1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut ensemble = WeightedEnsemble::new();
        ensemble
            .add_transform(Transform::linear([[0.0, 0.0], [0.0, 0.0]], Rgb::BLACK), Some(1.0), &mut rng)
            .unwrap();
        ensemble
            .add_transform(
                Transform::moebius(Mobius::new(zero, one, one, zero), Rgb(1.0, 1.0, 1.0)),
                Some(1.0),
                &mut rng,
            )
            .unwrap();
        let game = ChaosGame::new(ensemble, 16, 16).unwrap();
        let mut canvas = Canvas::new(16, 16);
        let stats = game.run(1, 200, 0, &mut rng, &mut canvas, None);
        assert!(stats.singularities > 0);
        assert_eq!(stats.diverged, 0);
        assert_eq!(stats.plotted + stats.out_of_bounds + stats.singularities, 200);
    }

    #[test]
    fn a_singular_step_leaves_the_walk_state_alone() {
        let zero = Complex::new(0.0, 0.0);
        let one = Complex::new(1.0, 0.0);
        let reciprocal = Transform::moebius(Mobius::new(zero, one, one, zero), Rgb(1.0, 1.0, 1.0));
        let game = ChaosGame::new(single(reciprocal), 16, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let start = WalkState {
            point: zero,
            color: Rgb(0.25, 0.5, 0.75),
        };
        let mut walk = game.walk_from(start, 3, 0, &mut rng);
        for _ in 0..3 {
            assert_eq!(walk.next(), Some(Step::Singular));
            assert_eq!(walk.state(), start);
        }
        assert_eq!(walk.next(), None);
    }

    #[test]
    fn exploding_walks_end_early() {
        let game = ChaosGame::new(single(contraction(1e200)), 16, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let start = WalkState {
            point: Complex::new(1.0, 1.0),
            color: Rgb::BLACK,
        };
        let steps: Vec<Step> = game.walk_from(start, 100, 0, &mut rng).collect();
        assert_eq!(steps.last(), Some(&Step::Diverged));
        assert!(steps.len() < 100);
    }

    #[test]
    fn burn_in_suppresses_the_leading_samples() {
        let game = ChaosGame::new(single(contraction(0.5)), 32, 32).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let steps: Vec<Step> = game.walk(20, 5, &mut rng).collect();
        assert_eq!(steps.len(), 20);
        assert!(steps[..5].iter().all(|step| *step == Step::BurnIn));
        assert!(steps[5..].iter().all(|step| match step {
            Step::Sample(_) => true,
            _ => false,
        }));
    }

    #[test]
    fn bounded_systems_plot_every_step() {
        let game = ChaosGame::new(single(contraction(0.5)), 64, 64).unwrap();
        let (canvas, stats) = game.render(&settings(40, 25, 3, 7)).unwrap();
        assert_eq!(stats.walks, 40);
        assert_eq!(stats.plotted, 40 * 25);
        assert_eq!(stats.out_of_bounds, 0);
        let total: f64 = canvas.lit_pixels().map(|(_, color)| color.0).sum();
        assert!(total > 0.0);
    }

    #[test]
    fn seeded_renders_are_reproducible() {
        let mut rng = StdRng::seed_from_u64(8);
        let ensemble =
            WeightedEnsemble::random(5, &DEFAULT_RANDOM_KINDS, &RandomBounds::default(), &mut rng)
                .unwrap();
        let game = ChaosGame::new(ensemble, 48, 32).unwrap();
        let (first, first_stats) = game.render(&settings(64, 100, 4, 99)).unwrap();
        let (second, second_stats) = game.render(&settings(64, 100, 4, 99)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_stats, second_stats);
        assert_eq!(first_stats.walks, 64);
    }

    #[test]
    fn an_expired_deadline_starts_no_walks() {
        let game = ChaosGame::new(single(contraction(0.5)), 8, 8).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut canvas = Canvas::new(8, 8);
        let stats = game.run(10, 10, 0, &mut rng, &mut canvas, Some(Instant::now()));
        assert_eq!(stats, RenderStats::default());
        assert_eq!(canvas, Canvas::new(8, 8));
    }

    #[test]
    fn an_unreachable_time_limit_renders_everything() {
        let game = ChaosGame::new(single(contraction(0.5)), 8, 8).unwrap();
        let unbounded = RenderSettings {
            time_limit: Some(Duration::from_secs(u64::MAX)),
            ..settings(12, 10, 2, 13)
        };
        let (_, stats) = game.render(&unbounded).unwrap();
        assert_eq!(stats.walks, 12);
    }
}
