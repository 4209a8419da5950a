//! Max-pooling layer implementation
//!
//! Downsamples each depth slice independently by taking the maximum of a
//! square window. Windows that hang past the input's edge read a constant
//! pad value in place of the missing data, so the output spatial size is
//! `ceil(input / stride)` on each axis, mirroring the convolution layer.

use crate::error::{CnnError, CnnResult};
use crate::layers::{Layer, LayerBuffers};
use crate::optimizers::Hyperparameters;
use crate::range::map_to_output;
use crate::tensor::{Shape, Tensor};

/// Parameterless max-pooling layer.
pub struct PoolLayer {
    buffers: LayerBuffers,
    stride: usize,
    filter_size: usize,
    pad: f64,
}

impl PoolLayer {
    /// Create a pooling layer.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if `stride` or `filter_size`
    /// is zero, or if `filter_size < stride` (undersized windows would
    /// skip input positions entirely).
    pub fn new(stride: usize, filter_size: usize, pad: f64, in_shape: Shape) -> CnnResult<Self> {
        if stride == 0 || filter_size == 0 {
            return Err(CnnError::Configuration(format!(
                "pooling stride ({stride}) and filter size ({filter_size}) must be positive"
            )));
        }
        if filter_size < stride {
            return Err(CnnError::Configuration(format!(
                "pooling filter size ({filter_size}) must be >= stride ({stride})"
            )));
        }
        let out_shape = Shape::new(
            in_shape.x.div_ceil(stride),
            in_shape.y.div_ceil(stride),
            in_shape.z,
            in_shape.b,
        );
        Ok(Self {
            buffers: LayerBuffers::new(in_shape, out_shape)?,
            stride,
            filter_size,
            pad,
        })
    }

    /// The configured stride.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The configured window size.
    pub fn filter_size(&self) -> usize {
        self.filter_size
    }
}

impl Layer for PoolLayer {
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.copy_input(input)?;
        let in_shape = self.buffers.in_shape();
        let out_shape = self.buffers.out_shape();

        for b in 0..out_shape.b {
            for z in 0..out_shape.z {
                for y in 0..out_shape.y {
                    for x in 0..out_shape.x {
                        let (base_x, base_y) = (x * self.stride, y * self.stride);
                        let mut max = f64::NEG_INFINITY;
                        for j in 0..self.filter_size {
                            for i in 0..self.filter_size {
                                let in_x = base_x + i;
                                let in_y = base_y + j;
                                let v = if in_x >= in_shape.x || in_y >= in_shape.y {
                                    self.pad
                                } else {
                                    self.buffers.input.get(in_x, in_y, z, b)
                                };
                                if v > max {
                                    max = v;
                                }
                            }
                        }
                        self.buffers.output.set(x, y, z, b, max);
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.check_output_gradient(grad_next)?;
        let in_shape = self.buffers.in_shape();
        let out_shape = self.buffers.out_shape();

        for b in 0..in_shape.b {
            for y in 0..in_shape.y {
                for x in 0..in_shape.x {
                    let range =
                        map_to_output(x, y, self.filter_size, self.stride, 1, out_shape);
                    for z in 0..in_shape.z {
                        let value = self.buffers.input.get(x, y, z, b);
                        let mut sum = 0.0;
                        // An input position receives the gradient from
                        // every covering window whose maximum it equals.
                        // Ties replicate the gradient to all holders.
                        for i in range.min_x..=range.max_x {
                            for j in range.min_y..=range.max_y {
                                if value == self.buffers.output.get(i, j, z, b) {
                                    sum += grad_next.get(i, j, z, b);
                                }
                            }
                        }
                        self.buffers.grad_input.set(x, y, z, b, sum);
                    }
                }
            }
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
        "pool"
    }

    fn param_str(&self) -> String {
        format!(
            "stride={}, filter_size={}, pad={}",
            self.stride, self.filter_size, self.pad
        )
    }
}
