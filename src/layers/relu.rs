//! Rectified linear unit layer

use crate::error::CnnResult;
use crate::layers::{Layer, LayerBuffers};
use crate::optimizers::Hyperparameters;
use crate::tensor::{Shape, Tensor};

/// Element-wise `max(0, x)` activation. Shape-preserving, no parameters.
pub struct ReluLayer {
    buffers: LayerBuffers,
}

impl ReluLayer {
    /// Create a rectifier over tensors of the given shape.
    pub fn new(in_shape: Shape) -> CnnResult<Self> {
        Ok(Self {
            buffers: LayerBuffers::new(in_shape, in_shape)?,
        })
    }
}

impl Layer for ReluLayer {
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.copy_input(input)?;
        for (out, &v) in self
            .buffers
            .output
            .data_mut()
            .iter_mut()
            .zip(input.data().iter())
        {
            *out = v.max(0.0);
        }
        Ok(())
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.check_output_gradient(grad_next)?;
        // The gate follows the sign of the input, so an input of exactly
        // zero passes the gradient through.
        for ((slot, &v), &g) in self
            .buffers
            .grad_input
            .data_mut()
            .iter_mut()
            .zip(self.buffers.input.data().iter())
            .zip(grad_next.data().iter())
        {
            *slot = if v < 0.0 { 0.0 } else { g };
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
        "relu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forward_clamps_negatives() {
        let mut layer = ReluLayer::new(Shape::d3(3, 1, 1)).unwrap();
        let mut input: Tensor<f64> = Tensor::new(Shape::d3(3, 1, 1)).unwrap();
        input.set(0, 0, 0, 0, -1.0);
        input.set(1, 0, 0, 0, 0.0);
        input.set(2, 0, 0, 0, 42.0);
        layer.forward(&input).unwrap();
        assert_relative_eq!(layer.output().get(0, 0, 0, 0), 0.0);
        assert_relative_eq!(layer.output().get(1, 0, 0, 0), 0.0);
        assert_relative_eq!(layer.output().get(2, 0, 0, 0), 42.0);
    }

    #[test]
    fn test_backward_gates_on_input_sign() {
        let mut layer = ReluLayer::new(Shape::d3(3, 1, 1)).unwrap();
        let mut input: Tensor<f64> = Tensor::new(Shape::d3(3, 1, 1)).unwrap();
        input.set(0, 0, 0, 0, -2.0);
        input.set(1, 0, 0, 0, 0.0);
        input.set(2, 0, 0, 0, 2.0);
        layer.forward(&input).unwrap();

        let mut grad: Tensor<f64> = Tensor::new(Shape::d3(3, 1, 1)).unwrap();
        grad.data_mut().fill(0.5);
        layer.backward(&grad).unwrap();

        assert_relative_eq!(layer.input_gradient().get(0, 0, 0, 0), 0.0);
        assert_relative_eq!(layer.input_gradient().get(1, 0, 0, 0), 0.5);
        assert_relative_eq!(layer.input_gradient().get(2, 0, 0, 0), 0.5);
    }

    #[test]
    fn test_shape_preserved() {
        let layer = ReluLayer::new(Shape::new(4, 3, 2, 5)).unwrap();
        assert_eq!(layer.output().shape(), Shape::new(4, 3, 2, 5));
    }
}
