//! Layer trait definition for the training engine
//!
//! This module defines the core [`Layer`] trait that all layer types
//! implement, plus the [`LayerBuffers`] state every layer carries: the
//! last input it was activated on, the last computed output, and the
//! gradient with respect to its input from the last backward pass.

use crate::error::{CnnError, CnnResult};
use crate::optimizers::Hyperparameters;
use crate::tensor::{Shape, Tensor};

/// Core trait for network layers.
///
/// Every layer kind (dense, convolution, pooling, rectifier, softmax,
/// dropout) implements the same three-phase lifecycle:
///
/// 1. [`Layer::forward`] computes the activation for an input tensor and
///    stores it in the layer's output buffer.
/// 2. [`Layer::backward`] consumes the following layer's input-gradient
///    (or the model's error tensor) and fills this layer's input-gradient
///    buffer, accumulating parameter gradients along the way.
/// 3. [`Layer::update_weights`] applies the shared update rule to any
///    trainable parameters. A no-op for parameterless layers.
///
/// The layer set is closed and small, so trait objects over this trait
/// are the whole dispatch story; there is no open inheritance hierarchy.
pub trait Layer {
    /// Compute this layer's activation for `input`.
    ///
    /// The input is copied into the layer's state and the output buffer
    /// is overwritten in place.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if `input` does not have the
    /// shape the layer was constructed for.
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()>;

    /// Compute the gradient of the error with respect to this layer's
    /// input, given the gradient with respect to its output.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if `grad_next` does not match
    /// the layer's output shape.
    fn backward(&mut self, grad_next: &Tensor<f64>) -> CnnResult<()>;

    /// Apply the update rule to trainable parameters, consuming the
    /// gradients accumulated by [`Layer::backward`].
    fn update_weights(&mut self, hyper: &Hyperparameters);

    /// The input tensor from the most recent forward call.
    fn input(&self) -> &Tensor<f64>;

    /// The output tensor from the most recent forward call.
    fn output(&self) -> &Tensor<f64>;

    /// The input-gradient tensor from the most recent backward call.
    fn input_gradient(&self) -> &Tensor<f64>;

    /// Short layer-kind name for reports, e.g. `"convolution"`.
    fn kind(&self) -> &'static str;

    /// Human-readable construction parameters for reports.
    fn param_str(&self) -> String {
        String::new()
    }

    /// `kind(params)` string used by the model geometry report.
    fn spec_str(&self) -> String {
        format!("{}({})", self.kind(), self.param_str())
    }

    /// Bytes held by all tensors this layer owns, state and parameters.
    fn memory_size(&self) -> usize {
        self.input().memory_size() + self.output().memory_size() + self.input_gradient().memory_size()
    }
}

impl std::fmt::Debug for dyn Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.spec_str())
    }
}

/// The three state tensors every layer owns.
///
/// `input` and `grad_input` share the layer's input shape; `output` has
/// the layer's output shape. All three are allocated once at layer
/// construction and overwritten, never reallocated, by forward and
/// backward calls.
#[derive(Debug, Clone)]
pub struct LayerBuffers {
    pub input: Tensor<f64>,
    pub output: Tensor<f64>,
    pub grad_input: Tensor<f64>,
}

impl LayerBuffers {
    /// Allocate zeroed state for the given input and output shapes.
    pub fn new(in_shape: Shape, out_shape: Shape) -> CnnResult<Self> {
        Ok(Self {
            input: Tensor::new(in_shape)?,
            output: Tensor::new(out_shape)?,
            grad_input: Tensor::new(in_shape)?,
        })
    }

    /// Shape the layer accepts.
    pub fn in_shape(&self) -> Shape {
        self.input.shape()
    }

    /// Shape the layer produces.
    pub fn out_shape(&self) -> Shape {
        self.output.shape()
    }

    /// Record `input` as the layer's current input.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::ShapeMismatch`] if the shape differs from the
    /// configured input shape.
    pub fn copy_input(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        if input.shape() != self.input.shape() {
            return Err(CnnError::ShapeMismatch {
                op: "forward",
                lhs: self.input.shape(),
                rhs: input.shape(),
            });
        }
        self.input.data_mut().copy_from_slice(input.data());
        Ok(())
    }

    /// Validate an incoming output-gradient against the output shape.
    pub fn check_output_gradient(&self, grad_next: &Tensor<f64>) -> CnnResult<()> {
        if grad_next.shape() != self.output.shape() {
            return Err(CnnError::ShapeMismatch {
                op: "backward",
                lhs: self.output.shape(),
                rhs: grad_next.shape(),
            });
        }
        Ok(())
    }

    /// Bytes held by the three state tensors.
    pub fn memory_size(&self) -> usize {
        self.input.memory_size() + self.output.memory_size() + self.grad_input.memory_size()
    }
}
