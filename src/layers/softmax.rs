//! Softmax layer implementation
//!
//! Normalizes each batch element's whole volume into a probability
//! distribution: every output is in `(0, 1)` and each batch slice sums
//! to 1. Usually the final layer before comparing against a one-hot
//! label tensor.

use crate::error::CnnResult;
use crate::layers::{Layer, LayerBuffers};
use crate::optimizers::Hyperparameters;
use crate::tensor::{Shape, Tensor};

/// Shape-preserving softmax over each batch element.
pub struct SoftmaxLayer {
    buffers: LayerBuffers,
}

impl SoftmaxLayer {
    /// Create a softmax layer over tensors of the given shape.
    pub fn new(in_shape: Shape) -> CnnResult<Self> {
        Ok(Self {
            buffers: LayerBuffers::new(in_shape, in_shape)?,
        })
    }
}

impl Layer for SoftmaxLayer {
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.copy_input(input)?;
        for b in 0..input.shape().b {
            let in_slice = self.buffers.input.batch_slice(b);
            // Subtracting the running maximum keeps exp() in range
            // without changing the normalized result.
            let max = in_slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = in_slice.iter().map(|&v| (v - max).exp()).sum();
            let in_slice = in_slice.to_vec();
            let out_slice = self.buffers.output.batch_slice_mut(b);
            for (out, v) in out_slice.iter_mut().zip(in_slice) {
                *out = (v - max).exp() / sum;
            }
        }
        Ok(())
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.check_output_gradient(grad_next)?;
        let n = self.buffers.in_shape().batch_stride();
        for b in 0..self.buffers.in_shape().b {
            let out = self.buffers.output.batch_slice(b).to_vec();
            let gn = grad_next.batch_slice(b);
            let mut grads = vec![0.0; n];
            // Jacobian row i is out[i] * (delta_ij - out[j]); the
            // incoming gradient is applied per row, not per column.
            for (i, slot) in grads.iter_mut().enumerate() {
                let mut sum = 0.0;
                for (j, &oj) in out.iter().enumerate() {
                    let jac = if i == j {
                        out[i] * (1.0 - oj)
                    } else {
                        -out[i] * oj
                    };
                    sum += jac * gn[i];
                }
                *slot = sum;
            }
            self.buffers
                .grad_input
                .batch_slice_mut(b)
                .copy_from_slice(&grads);
        }
        Ok(())
    }

    fn update_weights(&mut self, _hyper: &Hyperparameters) {}

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
        "softmax"
    }
}
