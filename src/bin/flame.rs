// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate ifsflame;
extern crate num_cpus;
extern crate rand;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ifsflame::{normalization_scale, ChaosGame, IfsError, RenderConfig};

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const CONFIG: &str = "config";
const THREADS: &str = "threads";
const SEED: &str = "seed";
const NO_SYSTEM: &str = "no-system";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("flame")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Iterated function system renderer")
        .arg(
            Arg::with_name(CONFIG)
                .required(true)
                .index(1)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to render with (overrides the configuration)"),
        )
        .arg(
            Arg::with_name(SEED)
                .required(false)
                .long(SEED)
                .short("s")
                .takes_value(true)
                .validator(|s| {
                    u64::from_str(&s)
                        .map(|_| ())
                        .map_err(|_| "Could not parse seed".to_string())
                })
                .help("Random seed (overrides the configuration)"),
        )
        .arg(
            Arg::with_name(NO_SYSTEM)
                .long(NO_SYSTEM)
                .help("Do not save the rendered system next to the image"),
        )
        .get_matches()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn run(matches: &ArgMatches) -> Result<(), IfsError> {
    let config_path = Path::new(
        matches
            .value_of(CONFIG)
            .ok_or_else(|| IfsError::Config("no configuration file given".to_string()))?,
    );
    let mut config = RenderConfig::load(config_path)?;
    if let Some(threads) = matches.value_of(THREADS) {
        config.evaluation_settings.threads = usize::from_str(threads).ok();
    }
    if let Some(seed) = matches.value_of(SEED) {
        config.evaluation_settings.seed = u64::from_str(seed).ok();
    }

    let mut rng = match config.evaluation_settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let ensemble = config.build_ensemble(&mut rng)?;
    let image = &config.image_settings;
    let game = ChaosGame::new(ensemble, image.width, image.height)?;

    let settings = config.render_settings();
    let (canvas, stats) = game.render(&settings)?;

    let scale = normalization_scale(stats.walks, settings.iterations, image.width, image.height);
    canvas.save(&image.path, scale)?;
    info!("wrote {}", image.path.display());

    if !matches.is_present(NO_SYSTEM) {
        let system_path = config.system_path();
        if same_file(config_path, &system_path) {
            warn!(
                "not saving the system over its own configuration {}",
                config_path.display()
            );
        } else {
            config.with_system(game.ensemble())?.save(&system_path)?;
            info!("wrote {}", system_path.display());
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
