//! Dense (fully connected) layer implementation
//!
//! Treats each batch element of the input as one flattened vector and
//! maps it through a weight matrix and a logistic-sigmoid activation:
//! `out[n] = sigmoid(sum_i in[i] * w[i][n])`.

use crate::error::{CnnError, CnnResult};
use crate::layers::{Layer, LayerBuffers};
use crate::optimizers::{Gradient, Hyperparameters};
use crate::tensor::{Shape, Tensor};
use crate::utils::SimpleRng;

/// Initial weights land in `[0, SIGMOID_POINT_NINE / fan_in)`;
/// `SIGMOID_POINT_NINE = logit(0.9)`, so a unit fed all-ones input starts
/// below the 0.9 activation level.
const SIGMOID_POINT_NINE: f64 = 2.19722;

/// Fully connected layer with a logistic-sigmoid activation.
///
/// The weight matrix has shape `(fan_in, output_units, 1, 1)` where
/// `fan_in = x*y*z` of the input shape. The layer caches the
/// pre-activation sums from the last forward pass because the backward
/// pass needs them for the sigmoid derivative, and keeps one [`Gradient`]
/// record per (output unit, batch element).
///
/// # Example
///
/// ```
/// use rust_convnet::layers::{DenseLayer, Layer};
/// use rust_convnet::tensor::Shape;
/// use rust_convnet::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(Shape::d3(4, 4, 2), 10, &mut rng).unwrap();
/// assert_eq!(layer.output().shape(), Shape::d3(10, 1, 1));
/// ```
pub struct DenseLayer {
    buffers: LayerBuffers,
    /// Pre-activation sums, shape `(output_units, 1, 1, batch)`.
    activator_input: Tensor<f64>,
    /// Weight matrix, shape `(fan_in, output_units, 1, 1)`.
    weights: Tensor<f64>,
    /// One gradient record per (output unit, batch element).
    gradients: Tensor<Gradient>,
}

impl DenseLayer {
    /// Create a dense layer mapping `in_shape` to `output_units` units.
    ///
    /// Weights are initialized to small pseudo-random values scaled
    /// inversely to the fan-in, drawn from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if `output_units` is zero or
    /// any input dimension is zero.
    pub fn new(in_shape: Shape, output_units: usize, rng: &mut SimpleRng) -> CnnResult<Self> {
        if output_units == 0 {
            return Err(CnnError::Configuration(
                "dense layer needs at least one output unit".to_string(),
            ));
        }
        let out_shape = Shape::new(output_units, 1, 1, in_shape.b);
        let buffers = LayerBuffers::new(in_shape, out_shape)?;

        let fan_in = in_shape.batch_stride();
        let mut weights = Tensor::new(Shape::d3(fan_in, output_units, 1))?;
        for n in 0..output_units {
            for i in 0..fan_in {
                let w = SIGMOID_POINT_NINE / fan_in as f64 * rng.next_f64();
                weights.set(i, n, 0, 0, w);
            }
        }

        Ok(Self {
            buffers,
            activator_input: Tensor::new(out_shape)?,
            weights,
            gradients: Tensor::new(out_shape)?,
        })
    }

    /// Flattened input size per batch element.
    pub fn input_count(&self) -> usize {
        self.buffers.in_shape().batch_stride()
    }

    /// Number of output units.
    pub fn output_units(&self) -> usize {
        self.buffers.out_shape().x
    }

    /// Number of trainable parameters.
    pub fn parameter_count(&self) -> usize {
        self.weights.element_count()
    }

    /// The weight matrix, `(fan_in, output_units, 1, 1)`.
    pub fn weights(&self) -> &Tensor<f64> {
        &self.weights
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn sigmoid_derivative(x: f64) -> f64 {
        let sig = Self::sigmoid(x);
        sig * (1.0 - sig)
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.copy_input(input)?;
        let fan_in = self.input_count();
        let units = self.output_units();

        for b in 0..input.shape().b {
            let in_slice = self.buffers.input.batch_slice(b);
            for n in 0..units {
                let mut sum = 0.0;
                for (i, value) in in_slice.iter().enumerate().take(fan_in) {
                    sum += value * self.weights.get(i, n, 0, 0);
                }
                self.activator_input.set(n, 0, 0, b, sum);
            }
        }
        for b in 0..self.buffers.out_shape().b {
            for n in 0..units {
                let sum = self.activator_input.get(n, 0, 0, b);
                self.buffers.output.set(n, 0, 0, b, Self::sigmoid(sum));
            }
        }
        Ok(())
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.check_output_gradient(grad_next)?;
        let fan_in = self.input_count();
        let units = self.output_units();

        self.buffers.grad_input.data_mut().fill(0.0);

        for b in 0..self.buffers.in_shape().b {
            for n in 0..units {
                let g = grad_next.get(n, 0, 0, b)
                    * Self::sigmoid_derivative(self.activator_input.get(n, 0, 0, b));
                self.gradients.get_mut(n, 0, 0, b).grad = g;
            }
            // Blame each input in proportion to its weight, summed over
            // every output unit it fed.
            for n in 0..units {
                let g = self.gradients.get(n, 0, 0, b).grad;
                let grad_slice = self.buffers.grad_input.batch_slice_mut(b);
                for (i, slot) in grad_slice.iter_mut().enumerate().take(fan_in) {
                    *slot += g * self.weights.get(i, n, 0, 0);
                }
            }
        }
        Ok(())
    }

    fn update_weights(&mut self, hyper: &Hyperparameters) {
        let fan_in = self.input_count();
        let units = self.output_units();
        for b in 0..self.buffers.in_shape().b {
            for n in 0..units {
                let grad = self.gradients.get(n, 0, 0, b);
                for i in 0..fan_in {
                    let multiplier = self.buffers.input.batch_slice(b)[i];
                    let w = self.weights.get(i, n, 0, 0);
                    self.weights.set(i, n, 0, 0, hyper.update_weight(w, &grad, multiplier));
                }
                hyper.update_gradient(self.gradients.get_mut(n, 0, 0, b));
            }
        }
    }

    fn input(&self) -> &Tensor<f64> {
        &self.buffers.input
    }

    fn output(&self) -> &Tensor<f64> {
        &self.buffers.output
    }

    fn input_gradient(&self) -> &Tensor<f64> {
        &self.buffers.grad_input
    }

    fn kind(&self) -> &'static str {
        "dense"
    }

    fn param_str(&self) -> String {
        format!("units={}", self.output_units())
    }

    fn memory_size(&self) -> usize {
        self.buffers.memory_size()
            + self.activator_input.memory_size()
            + self.weights.memory_size()
            + self.gradients.memory_size()
    }
}
