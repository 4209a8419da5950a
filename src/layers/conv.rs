//! Convolution layer implementation
//!
//! Slides a bank of square kernels over the input with a configurable
//! stride, reading a constant pad value wherever a window hangs past the
//! input's edge. The output spatial size is `ceil(input / stride)` on
//! each axis, with one output depth slice per kernel.

use crate::error::{CnnError, CnnResult};
use crate::layers::{Layer, LayerBuffers};
use crate::optimizers::{Gradient, Hyperparameters};
use crate::range::map_to_output;
use crate::tensor::{Shape, Tensor};
use crate::utils::SimpleRng;

/// Convolution layer with learnable filters.
///
/// Each filter is a `(kernel_size, kernel_size, in_depth)` tensor with a
/// matching tensor of [`Gradient`] records. Filters are initialized to
/// small pseudo-random values scaled inversely to the filter volume.
///
/// # Example
///
/// ```
/// use rust_convnet::layers::{ConvLayer, Layer};
/// use rust_convnet::tensor::Shape;
/// use rust_convnet::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = ConvLayer::new(2, 3, 8, 0.0, Shape::d3(28, 28, 1), &mut rng).unwrap();
/// assert_eq!(layer.output().shape(), Shape::d3(14, 14, 8));
/// ```
pub struct ConvLayer {
    buffers: LayerBuffers,
    stride: usize,
    kernel_size: usize,
    pad: f64,
    filters: Vec<Tensor<f64>>,
    filter_grads: Vec<Tensor<Gradient>>,
}

impl ConvLayer {
    /// Create a convolution layer.
    ///
    /// # Arguments
    ///
    /// * `stride` - Step between successive window placements
    /// * `kernel_size` - Width and height of each square kernel
    /// * `kernel_count` - Number of filters, i.e. the output depth
    /// * `pad` - Value read in place of input data outside the bounds
    /// * `in_shape` - Shape of the tensors this layer will activate on
    /// * `rng` - Random number generator for filter initialization
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if `stride`, `kernel_size` or
    /// `kernel_count` is zero, or if `kernel_size < stride` (undersized
    /// kernels would leave input positions no window ever reads).
    pub fn new(
        stride: usize,
        kernel_size: usize,
        kernel_count: usize,
        pad: f64,
        in_shape: Shape,
        rng: &mut SimpleRng,
    ) -> CnnResult<Self> {
        if stride == 0 || kernel_size == 0 || kernel_count == 0 {
            return Err(CnnError::Configuration(format!(
                "convolution stride ({stride}), kernel size ({kernel_size}) and kernel count \
                 ({kernel_count}) must all be positive"
            )));
        }
        if kernel_size < stride {
            return Err(CnnError::Configuration(format!(
                "convolution kernel size ({kernel_size}) must be >= stride ({stride})"
            )));
        }

        let out_shape = Shape::new(
            in_shape.x.div_ceil(stride),
            in_shape.y.div_ceil(stride),
            kernel_count,
            in_shape.b,
        );
        let buffers = LayerBuffers::new(in_shape, out_shape)?;

        let filter_shape = Shape::d3(kernel_size, kernel_size, in_shape.z);
        let volume = (kernel_size * kernel_size * in_shape.z) as f64;
        let mut filters = Vec::with_capacity(kernel_count);
        let mut filter_grads = Vec::with_capacity(kernel_count);
        for _ in 0..kernel_count {
            let mut filter = Tensor::new(filter_shape)?;
            for value in filter.data_mut() {
                *value = rng.next_f64() / volume;
            }
            filters.push(filter);
            filter_grads.push(Tensor::new(filter_shape)?);
        }

        Ok(Self {
            buffers,
            stride,
            kernel_size,
            pad,
            filters,
            filter_grads,
        })
    }

    /// The configured stride.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The configured kernel size.
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Number of filters (output depth).
    pub fn kernel_count(&self) -> usize {
        self.filters.len()
    }

    /// Pad value substituted for out-of-bounds reads.
    pub fn pad(&self) -> f64 {
        self.pad
    }

    /// Number of trainable parameters across all filters.
    pub fn parameter_count(&self) -> usize {
        self.filters.iter().map(Tensor::element_count).sum()
    }

    /// The filter bank. Mutable so tests can pin exact weights.
    pub fn filters_mut(&mut self) -> &mut [Tensor<f64>] {
        &mut self.filters
    }

    /// The filter bank.
    pub fn filters(&self) -> &[Tensor<f64>] {
        &self.filters
    }

}

impl Layer for ConvLayer {
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.copy_input(input)?;
        let out_shape = self.buffers.out_shape();
        let in_depth = self.buffers.in_shape().z;

        for b in 0..out_shape.b {
            for (filter_idx, filter) in self.filters.iter().enumerate() {
                for y in 0..out_shape.y {
                    for x in 0..out_shape.x {
                        let (base_x, base_y) = (x * self.stride, y * self.stride);
                        let mut sum = 0.0;
                        for j in 0..self.kernel_size {
                            for i in 0..self.kernel_size {
                                for z in 0..in_depth {
                                    let in_x = base_x + i;
                                    let in_y = base_y + j;
                                    let in_shape = self.buffers.in_shape();
                                    let v = if in_x >= in_shape.x || in_y >= in_shape.y {
                                        self.pad
                                    } else {
                                        self.buffers.input.get(in_x, in_y, z, b)
                                    };
                                    sum += filter.get(i, j, z, 0) * v;
                                }
                            }
                        }
                        self.buffers.output.set(x, y, filter_idx, b, sum);
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

        // The filter gradients accumulate across the whole pass, so the
        // previous round's values must go first.
        for grads in &mut self.filter_grads {
            for g in grads.data_mut() {
                g.grad = 0.0;
            }
        }

        for b in 0..in_shape.b {
            for y in 0..in_shape.y {
                for x in 0..in_shape.x {
                    let range = map_to_output(
                        x,
                        y,
                        self.kernel_size,
                        self.stride,
                        self.filters.len(),
                        out_shape,
                    );
                    for z in 0..in_shape.z {
                        let input_value = self.buffers.input.get(x, y, z, b);
                        let mut sum_error = 0.0;
                        for i in range.min_x..=range.max_x {
                            let offset_x = x - i * self.stride;
                            for j in range.min_y..=range.max_y {
                                let offset_y = y - j * self.stride;
                                for k in range.min_z..=range.max_z {
                                    let g = grad_next.get(i, j, k, b);
                                    sum_error += self.filters[k].get(offset_x, offset_y, z, 0) * g;
                                    self.filter_grads[k].get_mut(offset_x, offset_y, z, 0).grad +=
                                        input_value * g;
                                }
                            }
                        }
                        self.buffers.grad_input.set(x, y, z, b, sum_error);
                    }
                }
            }
        }
        Ok(())
    }

    fn update_weights(&mut self, hyper: &Hyperparameters) {
        for (filter, grads) in self.filters.iter_mut().zip(self.filter_grads.iter_mut()) {
            for (w, grad) in filter.data_mut().iter_mut().zip(grads.data_mut().iter_mut()) {
                *w = hyper.update_weight(*w, grad, 1.0);
                hyper.update_gradient(grad);
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
        "convolution"
    }

    fn param_str(&self) -> String {
        format!(
            "stride={}, kernel_size={}, kernel_count={}, pad={}",
            self.stride,
            self.kernel_size,
            self.filters.len(),
            self.pad
        )
    }

    fn memory_size(&self) -> usize {
        self.buffers.memory_size()
            + self.filters.iter().map(Tensor::memory_size).sum::<usize>()
            + self.filter_grads.iter().map(Tensor::memory_size).sum::<usize>()
    }
}
