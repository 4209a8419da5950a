//! # Rust ConvNet
//!
//! A small convolutional neural network training engine built on a 4D
//! tensor type and hand-written backpropagation.
//!
//! ## Features
//!
//! - **4D tensors**: width, height, depth and batch dimensions over a
//!   flat buffer, with element-wise arithmetic, matrix multiplication
//!   and a versioned binary codec
//! - **Layers**: dense, convolution, max-pooling, rectifier, softmax
//!   and dropout, all behind one [`layers::Layer`] trait
//! - **Training**: momentum and weight-decay gradient descent with a
//!   shared per-parameter update rule
//! - **Datasets**: uniform-shape example collections with seeded
//!   shuffling, batching and binary serialization
//! - **Configuration**: JSON hyperparameter and architecture files, the
//!   latter built into layer stacks with automatic shape chaining
//!
//! ## Quick start
//!
//! ```
//! use rust_convnet::layers::{DenseLayer, SoftmaxLayer};
//! use rust_convnet::model::Model;
//! use rust_convnet::tensor::{Shape, Tensor};
//! use rust_convnet::utils::SimpleRng;
//!
//! let mut rng = SimpleRng::new(42);
//! let mut model = Model::new();
//! model
//!     .add_layer(Box::new(DenseLayer::new(Shape::d3(4, 4, 1), 2, &mut rng).unwrap()))
//!     .unwrap();
//! model
//!     .add_layer(Box::new(SoftmaxLayer::new(Shape::d3(2, 1, 1)).unwrap()))
//!     .unwrap();
//!
//! let mut data = Tensor::new(Shape::d3(4, 4, 1)).unwrap();
//! data.randomize(&mut rng, 1.0);
//! let mut label = Tensor::new(Shape::d3(2, 1, 1)).unwrap();
//! label.set(0, 0, 0, 0, 1.0);
//!
//! let error = model.train(&data, &label).unwrap();
//! assert!(error >= 0.0);
//! ```

pub mod architecture;
pub mod config;
pub mod dataset;
pub mod error;
pub mod layers;
pub mod model;
pub mod optimizers;
pub mod range;
pub mod tensor;
pub mod utils;

pub use architecture::{build_layers, build_model, load_architecture, ArchitectureConfig};
pub use config::{load_config, TrainingConfig};
pub use dataset::{Dataset, TrainingExample};
pub use error::{CnnError, CnnResult};
pub use layers::Layer;
pub use model::Model;
pub use optimizers::{Gradient, Hyperparameters};
pub use tensor::{Shape, Tensor};
pub use utils::SimpleRng;
