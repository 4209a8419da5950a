//! Dropout layer implementation
//!
//! Randomly silences individual activations during training. Each
//! forward pass draws a fresh Bernoulli mask: an element survives with
//! probability `p_activation` and is zeroed otherwise. The mask is
//! remembered so the backward pass silences the matching gradients.

use crate::error::{CnnError, CnnResult};
use crate::layers::{Layer, LayerBuffers};
use crate::optimizers::Hyperparameters;
use crate::tensor::{Shape, Tensor};
use crate::utils::SimpleRng;

/// Shape-preserving dropout layer with its own random stream.
pub struct DropoutLayer {
    buffers: LayerBuffers,
    p_activation: f64,
    hitmap: Tensor<bool>,
    rng: SimpleRng,
}

impl DropoutLayer {
    /// Create a dropout layer keeping each activation with probability
    /// `p_activation`.
    ///
    /// The layer clones `rng` so its mask stream is reproducible from
    /// the seed that built the network.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if `p_activation` is outside
    /// `[0, 1]` or not finite.
    pub fn new(in_shape: Shape, p_activation: f64, rng: &mut SimpleRng) -> CnnResult<Self> {
        if !p_activation.is_finite() || !(0.0..=1.0).contains(&p_activation) {
            return Err(CnnError::Configuration(format!(
                "dropout activation probability must be in [0, 1], got {p_activation}"
            )));
        }
        Ok(Self {
            buffers: LayerBuffers::new(in_shape, in_shape)?,
            p_activation,
            hitmap: Tensor::new(in_shape)?,
            rng: rng.clone(),
        })
    }

    /// Probability of keeping an activation.
    pub fn p_activation(&self) -> f64 {
        self.p_activation
    }

    /// The keep/drop mask from the last forward pass.
    pub fn hitmap(&self) -> &Tensor<bool> {
        &self.hitmap
    }
}

impl Layer for DropoutLayer {
    fn forward(&mut self, input: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.copy_input(input)?;
        for ((out, &v), hit) in self
            .buffers
            .output
            .data_mut()
            .iter_mut()
            .zip(input.data().iter())
            .zip(self.hitmap.data_mut().iter_mut())
        {
            let active = self.rng.next_f64() <= self.p_activation;
            *hit = active;
            *out = if active { v } else { 0.0 };
        }
        Ok(())
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> CnnResult<()> {
        self.buffers.check_output_gradient(grad_next)?;
        for ((slot, &g), &hit) in self
            .buffers
            .grad_input
            .data_mut()
            .iter_mut()
            .zip(grad_next.data().iter())
            .zip(self.hitmap.data().iter())
        {
            *slot = if hit { g } else { 0.0 };
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
        "dropout"
    }

    fn param_str(&self) -> String {
        format!("activation={}", self.p_activation)
    }

    fn memory_size(&self) -> usize {
        self.buffers.memory_size() + self.hitmap.memory_size()
    }
}
