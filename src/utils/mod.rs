//! Shared utilities for the training engine
//!
//! This module provides common utilities like random number generation
//! used across layers, models and tests.

pub mod rng;

pub use rng::SimpleRng;
