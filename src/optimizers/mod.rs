//! Parameter-update rule shared by all trainable layers
//!
//! Every trainable scalar parameter carries a [`Gradient`] record: the
//! gradient computed by the current backward pass and the effective
//! gradient of the previous update round, which feeds the momentum term.
//! [`Hyperparameters`] applies the momentum/weight-decay gradient-descent
//! formula:
//!
//! `m = grad + oldgrad * momentum`
//! `w_new = w - lr * m * multiplier - lr * weight_decay * w`
//!
//! After a weight has been adjusted, [`Hyperparameters::update_gradient`]
//! stores `m` into `oldgrad` for the next round.

use std::io::{Read, Write};

use crate::error::{CnnError, CnnResult};
use crate::tensor::{TensorElement, EPSILON};

/// Default learning rate.
pub const LEARNING_RATE: f64 = 0.1;
/// Default momentum coefficient.
pub const MOMENTUM: f64 = 0.01;
/// Default weight-decay coefficient.
pub const WEIGHT_DECAY: f64 = 0.0001;

/// Current and previous gradient of one trainable parameter.
///
/// `grad` is overwritten by every backward pass; `oldgrad` holds the
/// previous round's effective gradient and is overwritten by every
/// weight-update pass after being consumed by the momentum term.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gradient {
    pub grad: f64,
    pub oldgrad: f64,
}

impl TensorElement for Gradient {
    fn approx_eq(&self, other: &Self) -> bool {
        (self.grad - other.grad).abs() < EPSILON && (self.oldgrad - other.oldgrad).abs() < EPSILON
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        self.grad.write_to(out)?;
        self.oldgrad.write_to(out)
    }

    fn read_from<R: Read>(input: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            grad: f64::read_from(input)?,
            oldgrad: f64::read_from(input)?,
        })
    }
}

/// Gradient-descent hyperparameters applied by every trainable layer.
///
/// # Example
///
/// ```
/// use rust_convnet::optimizers::{Gradient, Hyperparameters};
///
/// let hp = Hyperparameters::default();
/// let mut grad = Gradient { grad: 1.0, oldgrad: 0.0 };
/// let w = hp.update_weight(1.0, &grad, 1.0);
/// hp.update_gradient(&mut grad);
/// assert!(w < 1.0);
/// assert_eq!(grad.oldgrad, 1.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub momentum: f64,
    pub weight_decay: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: LEARNING_RATE,
            momentum: MOMENTUM,
            weight_decay: WEIGHT_DECAY,
        }
    }
}

impl Hyperparameters {
    /// Create a validated set of hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`CnnError::Configuration`] if any value is negative or
    /// not finite.
    pub fn new(learning_rate: f64, momentum: f64, weight_decay: f64) -> CnnResult<Self> {
        for (name, value) in [
            ("learning_rate", learning_rate),
            ("momentum", momentum),
            ("weight_decay", weight_decay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CnnError::Configuration(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(Self {
            learning_rate,
            momentum,
            weight_decay,
        })
    }

    /// Effective gradient including the momentum term.
    #[inline]
    fn effective(&self, grad: &Gradient) -> f64 {
        grad.grad + grad.oldgrad * self.momentum
    }

    /// Apply one gradient-descent step to `w` and return the new value.
    ///
    /// `multiplier` scales the gradient term (dense layers pass the input
    /// value that fed the weight; convolution passes 1 because its filter
    /// gradients already folded the inputs in).
    #[inline]
    pub fn update_weight(&self, w: f64, grad: &Gradient, multiplier: f64) -> f64 {
        let m = self.effective(grad);
        w - self.learning_rate * m * multiplier - self.learning_rate * self.weight_decay * w
    }

    /// Store the effective gradient into `oldgrad` for the next round.
    ///
    /// Must run after every weight consuming `grad` has been updated.
    #[inline]
    pub fn update_gradient(&self, grad: &mut Gradient) {
        grad.oldgrad = self.effective(grad);
    }
}
