//! Network architecture described in JSON and built into layer stacks
//!
//! An architecture file lists layer descriptions in pipeline order. The
//! builder chains shapes automatically: each layer is constructed for
//! the shape the previous layer produces, so the file never repeats
//! intermediate dimensions.
//!
//! ```json
//! {
//!   "layers": [
//!     { "layer_type": "convolution", "stride": 1, "kernel_size": 5, "kernel_count": 8 },
//!     { "layer_type": "relu" },
//!     { "layer_type": "pool", "stride": 2, "filter_size": 2 },
//!     { "layer_type": "dense", "output_units": 10 },
//!     { "layer_type": "softmax" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CnnError, CnnResult};
use crate::layers::{
    ConvLayer, DenseLayer, DropoutLayer, Layer, PoolLayer, ReluLayer, SoftmaxLayer,
};
use crate::model::Model;
use crate::optimizers::Hyperparameters;
use crate::tensor::Shape;
use crate::utils::SimpleRng;

/// One layer description from an architecture file.
///
/// Only the fields the named layer type needs are consulted; a missing
/// required field is a configuration error at build time.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    pub layer_type: String,
    pub stride: Option<usize>,
    pub kernel_size: Option<usize>,
    pub kernel_count: Option<usize>,
    pub filter_size: Option<usize>,
    pub pad: Option<f64>,
    pub output_units: Option<usize>,
    pub p_activation: Option<f64>,
}

/// A full network architecture: the ordered layer list.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerConfig>,
}

fn require<T: Copy>(field: Option<T>, layer_type: &str, name: &str) -> CnnResult<T> {
    field.ok_or_else(|| {
        CnnError::Configuration(format!("{layer_type} layer needs the `{name}` field"))
    })
}

fn build_layer(
    config: &LayerConfig,
    in_shape: Shape,
    rng: &mut SimpleRng,
) -> CnnResult<Box<dyn Layer>> {
    let layer: Box<dyn Layer> = match config.layer_type.as_str() {
        "convolution" => Box::new(ConvLayer::new(
            require(config.stride, "convolution", "stride")?,
            require(config.kernel_size, "convolution", "kernel_size")?,
            require(config.kernel_count, "convolution", "kernel_count")?,
            config.pad.unwrap_or(0.0),
            in_shape,
            rng,
        )?),
        "pool" => Box::new(PoolLayer::new(
            require(config.stride, "pool", "stride")?,
            require(config.filter_size, "pool", "filter_size")?,
            config.pad.unwrap_or(0.0),
            in_shape,
        )?),
        "dense" => Box::new(DenseLayer::new(
            in_shape,
            require(config.output_units, "dense", "output_units")?,
            rng,
        )?),
        "relu" => Box::new(ReluLayer::new(in_shape)?),
        "softmax" => Box::new(SoftmaxLayer::new(in_shape)?),
        "dropout" => Box::new(DropoutLayer::new(
            in_shape,
            require(config.p_activation, "dropout", "p_activation")?,
            rng,
        )?),
        other => {
            return Err(CnnError::Configuration(format!(
                "unknown layer type `{other}`"
            )))
        }
    };
    Ok(layer)
}

/// Build the layer stack described by `config` for inputs of
/// `input_shape`, chaining shapes from layer to layer.
///
/// # Errors
///
/// Returns [`CnnError::Configuration`] for unknown layer types, missing
/// fields, an empty layer list, or layer parameters the layer itself
/// rejects.
pub fn build_layers(
    input_shape: Shape,
    config: &ArchitectureConfig,
    rng: &mut SimpleRng,
) -> CnnResult<Vec<Box<dyn Layer>>> {
    if config.layers.is_empty() {
        return Err(CnnError::Configuration(
            "architecture lists no layers".to_string(),
        ));
    }
    let mut layers = Vec::with_capacity(config.layers.len());
    let mut shape = input_shape;
    for layer_config in &config.layers {
        let layer = build_layer(layer_config, shape, rng)?;
        tracing::debug!(
            kind = layer.kind(),
            input = %shape,
            output = %layer.output().shape(),
            "built layer"
        );
        shape = layer.output().shape();
        layers.push(layer);
    }
    Ok(layers)
}

/// Build a complete [`Model`] from an architecture description.
pub fn build_model(
    input_shape: Shape,
    config: &ArchitectureConfig,
    hyper: Hyperparameters,
    rng: &mut SimpleRng,
) -> CnnResult<Model> {
    let mut model = Model::with_hyperparameters(hyper);
    for layer in build_layers(input_shape, config, rng)? {
        model.add_layer(layer)?;
    }
    Ok(model)
}

/// Load an [`ArchitectureConfig`] from a JSON file.
///
/// # Errors
///
/// Returns [`CnnError::Io`] if the file cannot be read and
/// [`CnnError::Parse`] for malformed JSON.
pub fn load_architecture<P: AsRef<Path>>(path: P) -> CnnResult<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
