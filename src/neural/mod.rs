//! Neural function approximation for learning behaviors.
//!
//! A small dense network (one ReLU hidden layer, linear outputs) with
//! Xavier initialization and plain stochastic gradient descent.

mod network;

pub use network::{Layer, QNetwork};
