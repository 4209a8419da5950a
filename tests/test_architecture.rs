//! Integration tests for building networks from architecture files

use std::io::Write;

use rust_convnet::architecture::{build_model, load_architecture};
use rust_convnet::error::CnnError;
use rust_convnet::optimizers::Hyperparameters;
use rust_convnet::tensor::{Shape, Tensor};
use rust_convnet::utils::SimpleRng;

fn write_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_full_pipeline_from_file() {
    let file = write_file(
        r#"{
            "layers": [
                { "layer_type": "convolution", "stride": 1, "kernel_size": 3, "kernel_count": 4 },
                { "layer_type": "relu" },
                { "layer_type": "pool", "stride": 2, "filter_size": 2 },
                { "layer_type": "dense", "output_units": 5 },
                { "layer_type": "softmax" }
            ]
        }"#,
    );

    let config = load_architecture(file.path()).unwrap();
    let mut rng = SimpleRng::new(42);
    let mut model = build_model(
        Shape::d3(12, 12, 1),
        &config,
        Hyperparameters::default(),
        &mut rng,
    )
    .unwrap();

    assert_eq!(model.len(), 5);
    let input = Tensor::new(Shape::d3(12, 12, 1)).unwrap();
    let out = model.predict(&input).unwrap();
    assert_eq!(out.shape(), Shape::d3(5, 1, 1));
    let sum: f64 = out.data().iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
}

#[test]
fn test_identical_seeds_build_identical_models() {
    let file = write_file(
        r#"{
            "layers": [
                { "layer_type": "dense", "output_units": 6 },
                { "layer_type": "dense", "output_units": 3 }
            ]
        }"#,
    );
    let config = load_architecture(file.path()).unwrap();

    let mut rng = SimpleRng::new(1234);
    let mut input = Tensor::new(Shape::d3(5, 5, 1)).unwrap();
    input.randomize(&mut rng, 1.0);

    let mut rng_a = SimpleRng::new(99);
    let mut model_a = build_model(
        Shape::d3(5, 5, 1),
        &config,
        Hyperparameters::default(),
        &mut rng_a,
    )
    .unwrap();
    let mut rng_b = SimpleRng::new(99);
    let mut model_b = build_model(
        Shape::d3(5, 5, 1),
        &config,
        Hyperparameters::default(),
        &mut rng_b,
    )
    .unwrap();

    assert_eq!(
        model_a.predict(&input).unwrap(),
        model_b.predict(&input).unwrap()
    );
}

#[test]
fn test_malformed_architecture_file_rejected() {
    let file = write_file(r#"{ "layers": [ { "stride": 1 } ] }"#);
    // `layer_type` is mandatory at the parse level.
    assert!(matches!(
        load_architecture(file.path()),
        Err(CnnError::Parse(_))
    ));
}

#[test]
fn test_layer_parameter_errors_surface_at_build() {
    let file = write_file(
        r#"{
            "layers": [
                { "layer_type": "pool", "stride": 3, "filter_size": 2 }
            ]
        }"#,
    );
    let config = load_architecture(file.path()).unwrap();
    let mut rng = SimpleRng::new(42);
    let err = build_model(
        Shape::d3(9, 9, 1),
        &config,
        Hyperparameters::default(),
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, CnnError::Configuration(_)));
}
