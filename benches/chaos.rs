// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate criterion;
extern crate ifsflame;
extern crate rand;

use criterion::Criterion;
use ifsflame::canvas::Canvas;
use ifsflame::transform::{RandomBounds, DEFAULT_RANDOM_KINDS};
use ifsflame::{ChaosGame, Rgb, Transform, WeightedEnsemble};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sierpinski() -> ChaosGame {
    let mut rng = StdRng::seed_from_u64(1);
    let mut ensemble = WeightedEnsemble::new();
    let corners = [[0.0, 0.0], [0.5, 0.0], [0.25, 0.5]];
    let colors = [Rgb(1.0, 0.0, 0.0), Rgb(0.0, 1.0, 0.0), Rgb(0.0, 0.0, 1.0)];
    for (corner, color) in corners.iter().zip(colors.iter()) {
        let t = Transform::affine([[0.5, 0.0], [0.0, 0.5]], *corner, *color);
        ensemble.add_transform(t, Some(1.0), &mut rng).unwrap();
    }
    ChaosGame::new(ensemble, 256, 256).unwrap()
}

fn random_system() -> ChaosGame {
    let mut rng = StdRng::seed_from_u64(2);
    let ensemble =
        WeightedEnsemble::random(8, &DEFAULT_RANDOM_KINDS, &RandomBounds::default(), &mut rng)
            .unwrap();
    ChaosGame::new(ensemble, 256, 256).unwrap()
}

fn bench_affine_walks(c: &mut Criterion) {
    let game = sierpinski();
    c.bench_function("sierpinski 10 walks x 1000", move |b| {
        let mut rng = StdRng::seed_from_u64(3);
        b.iter(|| {
            let mut canvas = Canvas::new(256, 256);
            game.run(10, 1000, 0, &mut rng, &mut canvas, None)
        })
    });
}

fn bench_mixed_walks(c: &mut Criterion) {
    let game = random_system();
    c.bench_function("random system 10 walks x 1000", move |b| {
        let mut rng = StdRng::seed_from_u64(4);
        b.iter(|| {
            let mut canvas = Canvas::new(256, 256);
            game.run(10, 1000, 0, &mut rng, &mut canvas, None)
        })
    });
}

fn bench_tone_map(c: &mut Criterion) {
    let game = sierpinski();
    let mut rng = StdRng::seed_from_u64(5);
    let mut canvas = Canvas::new(256, 256);
    game.run(100, 1000, 0, &mut rng, &mut canvas, None);
    c.bench_function("tone map 256x256", move |b| b.iter(|| canvas.tone_map(2.0)));
}

criterion_group!(benches, bench_affine_walks, bench_mixed_walks, bench_tone_map);
criterion_main!(benches);
