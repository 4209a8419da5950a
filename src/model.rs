//! Network model: a layer pipeline plus the training loop glue
//!
//! A [`Model`] owns an ordered stack of boxed [`Layer`] trait objects and
//! drives the three training phases across them: forward activation,
//! reverse gradient propagation, and the weight update sweep.

use crate::error::{CnnError, CnnResult};
use crate::layers::Layer;
use crate::optimizers::Hyperparameters;
use crate::tensor::Tensor;

/// A feed-forward network assembled from boxed layers.
///
/// Layers are chained by construction order: each layer must accept the
/// shape the previous layer produces. [`Model::add_layer`] checks this at
/// insertion time so a bad pipeline fails before any training step.
///
/// # Example
///
/// ```
/// use rust_convnet::layers::{DenseLayer, SoftmaxLayer};
/// use rust_convnet::model::Model;
/// use rust_convnet::tensor::{Shape, Tensor};
/// use rust_convnet::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let mut model = Model::new();
/// model.add_layer(Box::new(DenseLayer::new(Shape::d3(4, 4, 1), 3, &mut rng).unwrap())).unwrap();
/// model.add_layer(Box::new(SoftmaxLayer::new(Shape::d3(3, 1, 1)).unwrap())).unwrap();
///
/// let input = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
/// let output = model.predict(&input).unwrap();
/// assert_eq!(output.shape(), Shape::d3(3, 1, 1));
/// ```
pub struct Model {
    layers: Vec<Box<dyn Layer>>,
    hyper: Hyperparameters,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field(
                "layers",
                &self.layers.iter().map(|l| l.kind()).collect::<Vec<_>>(),
            )
            .field("hyper", &self.hyper)
            .finish()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create an empty model with default hyperparameters.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            hyper: Hyperparameters::default(),
        }
    }

    /// Create an empty model with explicit hyperparameters.
    pub fn with_hyperparameters(hyper: Hyperparameters) -> Self {
        Self {
            layers: Vec::new(),
            hyper,
        }
    }

    /// The hyperparameters applied by [`Model::update`].
    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }

    /// Append a layer to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if the layer's input shape
    /// differs from the previous layer's output shape.
    pub fn add_layer(&mut self, layer: Box<dyn Layer>) -> CnnResult<()> {
        if let Some(last) = self.layers.last() {
            if last.output().shape() != layer.input().shape() {
                return Err(CnnError::ShapeMismatch {
                    op: "add_layer",
                    lhs: last.output().shape(),
                    rhs: layer.input().shape(),
                });
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    /// Number of layers in the pipeline.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Read access to the layer stack.
    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    fn require_layers(&self) -> CnnResult<()> {
        if self.layers.is_empty() {
            return Err(CnnError::Configuration(
                "model has no layers".to_string(),
            ));
        }
        Ok(())
    }

    /// Run `data` through the pipeline, leaving each layer's activation
    /// in its output buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] for an empty model and
    /// [`CnnError::ShapeMismatch`] if `data` does not fit the first
    /// layer.
    pub fn forward(&mut self, data: &Tensor<f64>) -> CnnResult<()> {
        self.require_layers()?;
        for idx in 0..self.layers.len() {
            if idx == 0 {
                self.layers[0].forward(data)?;
            } else {
                let (prev, rest) = self.layers.split_at_mut(idx);
                rest[0].forward(prev[idx - 1].output())?;
            }
            tracing::debug!(
                layer = idx,
                kind = self.layers[idx].kind(),
                "forward pass"
            );
        }
        Ok(())
    }

    /// Propagate an error tensor backward through the pipeline, filling
    /// every layer's gradients. Does not touch weights.
    pub fn backward(&mut self, error: &Tensor<f64>) -> CnnResult<()> {
        self.require_layers()?;
        for idx in (0..self.layers.len()).rev() {
            if idx == self.layers.len() - 1 {
                self.layers[idx].backward(error)?;
            } else {
                let (rest, next) = self.layers.split_at_mut(idx + 1);
                rest[idx].backward(next[0].input_gradient())?;
            }
            tracing::debug!(
                layer = idx,
                kind = self.layers[idx].kind(),
                "backward pass"
            );
        }
        Ok(())
    }

    /// Apply the weight-update rule to every layer, consuming the
    /// gradients left by [`Model::backward`].
    pub fn update(&mut self) {
        for layer in &mut self.layers {
            layer.update_weights(&self.hyper);
        }
    }

    /// Run one full training step on a single example and return the
    /// diagnostic error.
    ///
    /// The error tensor fed backward is `output - label`. The returned
    /// value is `100 * sum(|error_i|)` over the positions where
    /// `label_i > 0.5`, i.e. the hot positions of a one-hot label.
    pub fn train(&mut self, data: &Tensor<f64>, label: &Tensor<f64>) -> CnnResult<f64> {
        self.forward(data)?;
        let output = self.layers[self.layers.len() - 1].output();
        let error = output.sub(label)?;
        self.backward(&error)?;
        self.update();

        let mut err = 0.0;
        for (&e, &target) in error.data().iter().zip(label.data().iter()) {
            if target > 0.5 {
                err += e.abs();
            }
        }
        Ok(err * 100.0)
    }

    /// Run a forward pass and return a copy of the final activation.
    pub fn predict(&mut self, data: &Tensor<f64>) -> CnnResult<Tensor<f64>> {
        self.forward(data)?;
        Ok(self.layers[self.layers.len() - 1].output().clone())
    }

    /// Total bytes held by all layers' tensors.
    pub fn memory_size(&self) -> usize {
        self.layers.iter().map(|l| l.memory_size()).sum()
    }

    /// Multi-line report of the pipeline geometry: per-layer shapes,
    /// memory in kB and share of the total.
    pub fn geometry(&self) -> String {
        let total = self.memory_size();
        let mut report = String::new();
        if let Some(first) = self.layers.first() {
            report.push_str(&format!("IN   {}\n", first.input().shape()));
        }
        for (idx, layer) in self.layers.iter().enumerate() {
            let bytes = layer.memory_size();
            let percent = if total > 0 {
                bytes as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            report.push_str(&format!(
                "L{idx:<3} -> {} {:.1} kB ({percent:.1}%): {}\n",
                layer.output().shape(),
                bytes as f64 / 1024.0,
                layer.spec_str()
            ));
        }
        report.push_str(&format!(
            "Total: {:.1} kB across {} layers\n",
            total as f64 / 1024.0,
            self.layers.len()
        ));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{DenseLayer, ReluLayer, SoftmaxLayer};
    use crate::tensor::Shape;
    use crate::utils::SimpleRng;

    fn small_model(rng: &mut SimpleRng) -> Model {
        let mut model = Model::new();
        model
            .add_layer(Box::new(
                DenseLayer::new(Shape::d3(4, 4, 1), 4, rng).unwrap(),
            ))
            .unwrap();
        model
            .add_layer(Box::new(ReluLayer::new(Shape::d3(4, 1, 1)).unwrap()))
            .unwrap();
        model
            .add_layer(Box::new(SoftmaxLayer::new(Shape::d3(4, 1, 1)).unwrap()))
            .unwrap();
        model
    }

    #[test]
    fn test_add_layer_rejects_shape_break() {
        let mut rng = SimpleRng::new(42);
        let mut model = Model::new();
        model
            .add_layer(Box::new(
                DenseLayer::new(Shape::d3(4, 4, 1), 4, &mut rng).unwrap(),
            ))
            .unwrap();
        let bad = SoftmaxLayer::new(Shape::d3(5, 1, 1)).unwrap();
        assert!(matches!(
            model.add_layer(Box::new(bad)),
            Err(CnnError::ShapeMismatch { op: "add_layer", .. })
        ));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut model = Model::new();
        let input: Tensor<f64> = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
        assert!(matches!(
            model.forward(&input),
            Err(CnnError::Configuration(_))
        ));
    }

    #[test]
    fn test_predict_shape_and_distribution() {
        let mut rng = SimpleRng::new(42);
        let mut model = small_model(&mut rng);
        let mut input: Tensor<f64> = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
        input.randomize(&mut rng, 1.0);
        let out = model.predict(&input).unwrap();
        assert_eq!(out.shape(), Shape::d3(4, 1, 1));
        let sum: f64 = out.data().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_train_error_declines() {
        let mut rng = SimpleRng::new(42);
        let mut model = Model::new();
        model
            .add_layer(Box::new(
                DenseLayer::new(Shape::d3(4, 4, 1), 4, &mut rng).unwrap(),
            ))
            .unwrap();
        let mut input: Tensor<f64> = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
        input.randomize(&mut rng, 1.0);
        let mut label: Tensor<f64> = Tensor::new(Shape::d3(4, 1, 1)).unwrap();
        label.set(2, 0, 0, 0, 1.0);

        let first = model.train(&input, &label).unwrap();
        let mut last = first;
        for _ in 0..200 {
            last = model.train(&input, &label).unwrap();
        }
        assert!(last < first, "expected {last} < {first}");
    }

    #[test]
    fn test_train_error_counts_hot_positions_only() {
        let mut rng = SimpleRng::new(42);
        let mut input: Tensor<f64> = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
        input.randomize(&mut rng, 1.0);
        let mut label: Tensor<f64> = Tensor::new(Shape::d3(4, 1, 1)).unwrap();
        label.set(1, 0, 0, 0, 1.0);

        let mut probe = Model::with_hyperparameters(Hyperparameters {
            learning_rate: 0.0,
            momentum: 0.0,
            weight_decay: 0.0,
        });
        probe
            .add_layer(Box::new(
                DenseLayer::new(Shape::d3(4, 4, 1), 4, &mut SimpleRng::new(42)).unwrap(),
            ))
            .unwrap();
        let out = probe.predict(&input).unwrap();
        let expected = (out.get(1, 0, 0, 0) - 1.0).abs() * 100.0;
        let err = probe.train(&input, &label).unwrap();
        assert!((err - expected).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_report_mentions_every_layer() {
        let mut rng = SimpleRng::new(42);
        let model = small_model(&mut rng);
        let report = model.geometry();
        assert!(report.contains("IN"));
        assert!(report.contains("dense(units=4)"));
        assert!(report.contains("relu()"));
        assert!(report.contains("softmax()"));
        assert!(report.contains("Total"));
    }

    #[test]
    fn test_memory_size_sums_layers() {
        let mut rng = SimpleRng::new(42);
        let model = small_model(&mut rng);
        let by_hand: usize = model.layers().iter().map(|l| l.memory_size()).sum();
        assert_eq!(model.memory_size(), by_hand);
        assert!(model.memory_size() > 0);
    }
}
