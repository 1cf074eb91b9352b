// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate assert_cmd;
extern crate image;
extern crate ifsflame;
extern crate predicates;
extern crate tempfile;

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

use ifsflame::RenderConfig;

fn write_config(dir: &Path, transforms: &str) -> std::path::PathBuf {
    let image = dir.join("out.png");
    let text = format!(
        r#"{{
            "image_settings": {{ "width": 32, "height": 32, "path": {:?} }},
            "evaluation_settings": {{ "iterations": 200, "num_points": 20, "seed": 7, "threads": 1 }},
            "transforms": {}
        }}"#,
        image.to_string_lossy(),
        transforms
    );
    let path = dir.join("config.json");
    fs::write(&path, text).unwrap();
    path
}

const SIERPINSKI: &str = r#"{
    "AffineTransform": [
        { "matrix": [[0.5, 0.0], [0.0, 0.5]], "translation": [0.0, 0.0], "color": [1.0, 0.0, 0.0], "weight": 1.0 },
        { "matrix": [[0.5, 0.0], [0.0, 0.5]], "translation": [0.5, 0.0], "color": [0.0, 1.0, 0.0], "weight": 1.0 },
        { "matrix": [[0.5, 0.0], [0.0, 0.5]], "translation": [0.25, 0.5], "color": [0.0, 0.0, 1.0] }
    ]
}"#;

#[test]
fn renders_the_image_and_saves_the_system() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), SIERPINSKI);

    Command::cargo_bin("flame")
        .unwrap()
        .arg(&config)
        .assert()
        .success();

    let image = image::open(dir.path().join("out.png")).unwrap().to_rgb();
    assert_eq!(image.dimensions(), (32, 32));
    assert!(image.pixels().any(|p| p[0] > 0 || p[1] > 0 || p[2] > 0));

    let saved = RenderConfig::load(dir.path().join("out.json")).unwrap();
    let transforms = saved.transforms.unwrap();
    let affine = transforms["AffineTransform"].as_array().unwrap();
    assert_eq!(affine.len(), 3);
    assert!(affine.iter().all(|t| t["weight"].is_number()));
    assert_eq!(affine[0]["weight"].as_f64(), Some(1.0));
}

#[test]
fn no_system_skips_the_system_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), SIERPINSKI);

    Command::cargo_bin("flame")
        .unwrap()
        .arg(&config)
        .arg("--no-system")
        .arg("--seed")
        .arg("11")
        .assert()
        .success();

    assert!(dir.path().join("out.png").exists());
    assert!(!dir.path().join("out.json").exists());
}

#[test]
fn unknown_transforms_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), r#"{ "SpiralTransform": [ {} ] }"#);

    Command::cargo_bin("flame")
        .unwrap()
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown transform type"));
    assert!(!dir.path().join("out.png").exists());
}

#[test]
fn all_zero_weights_fail_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        r#"{ "Linear": [ { "matrix": [[0.5, 0.0], [0.0, 0.5]], "weight": 0.0 } ] }"#,
    );

    Command::cargo_bin("flame")
        .unwrap()
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("degenerate"));
    assert!(!dir.path().join("out.png").exists());
}

#[test]
fn missing_config_argument_fails() {
    Command::cargo_bin("flame").unwrap().assert().failure();
}

#[test]
fn missing_config_file_fails() {
    Command::cargo_bin("flame")
        .unwrap()
        .arg("/nonexistent/flame.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: i/o error"));
}
