//! Network layer implementations
//!
//! All layers implement the [`Layer`] trait and carry their forward and
//! backward state in [`LayerBuffers`]. Models chain them as boxed trait
//! objects.

mod r#trait;

pub mod conv;
pub mod dense;
pub mod dropout;
pub mod pool;
pub mod relu;
pub mod softmax;

pub use conv::ConvLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use pool::PoolLayer;
pub use r#trait::{Layer, LayerBuffers};
pub use relu::ReluLayer;
pub use softmax::SoftmaxLayer;
