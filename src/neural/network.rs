//! Dense two-layer Q-network: ReLU hidden layer, linear outputs.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;

/// A single fully connected layer
#[derive(Clone, Debug)]
pub struct Layer {
    /// `inputs × outputs`
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

impl Layer {
    /// Xavier-scaled uniform weights, zero biases
    pub fn xavier<R: Rng + ?Sized>(n_in: usize, n_out: usize, rng: &mut R) -> Self {
        let scale = (2.0 / (n_in + n_out) as f32).sqrt();
        let weights = Array2::from_shape_fn((n_in, n_out), |_| rng.gen_range(-1.0..1.0) * scale);

        Self {
            weights,
            biases: Array1::zeros(n_out),
        }
    }

    #[inline]
    fn affine(&self, input: &Array1<f32>) -> Array1<f32> {
        input.dot(&self.weights) + &self.biases
    }

    fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite()) && self.biases.iter().all(|b| b.is_finite())
    }
}

/// Intermediate values of one forward pass, kept for backpropagation
struct Activations {
    hidden: Array1<f32>,
    output: Array1<f32>,
}

/// Feed-forward estimator of action values
#[derive(Clone, Debug)]
pub struct QNetwork {
    pub hidden: Layer,
    pub output: Layer,
}

impl QNetwork {
    /// Fresh network with Xavier initialization
    pub fn new<R: Rng + ?Sized>(n_inputs: usize, n_hidden: usize, n_outputs: usize, rng: &mut R) -> Self {
        Self {
            hidden: Layer::xavier(n_inputs, n_hidden, rng),
            output: Layer::xavier(n_hidden, n_outputs, rng),
        }
    }

    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.hidden.weights.nrows()
    }

    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.output.biases.len()
    }

    fn activate(&self, inputs: &[f32]) -> (Array1<f32>, Activations) {
        debug_assert_eq!(inputs.len(), self.n_inputs());

        let input = Array1::from_vec(inputs.to_vec());
        let hidden = self.hidden.affine(&input).mapv(|x| x.max(0.0));
        let output = self.output.affine(&hidden);

        (input, Activations { hidden, output })
    }

    /// Q-value estimate for every action
    pub fn forward(&self, inputs: &[f32]) -> Vec<f32> {
        self.activate(inputs).1.output.to_vec()
    }

    /// One gradient-descent step on squared error towards `target`.
    ///
    /// Outputs whose target equals the current prediction contribute no
    /// gradient, so callers hold untouched actions at their prediction.
    pub fn train(&mut self, inputs: &[f32], target: &[f32], learning_rate: f32) {
        debug_assert_eq!(target.len(), self.n_outputs());

        let (input, act) = self.activate(inputs);
        let target = Array1::from_vec(target.to_vec());

        let output_grad = &act.output - &target;
        let relu_mask = act.hidden.mapv(|h| if h > 0.0 { 1.0 } else { 0.0 });
        let hidden_grad = self.output.weights.dot(&output_grad) * relu_mask;

        let output_weight_grad = outer(&act.hidden, &output_grad);
        let hidden_weight_grad = outer(&input, &hidden_grad);

        self.output.weights.scaled_add(-learning_rate, &output_weight_grad);
        self.output.biases.scaled_add(-learning_rate, &output_grad);
        self.hidden.weights.scaled_add(-learning_rate, &hidden_weight_grad);
        self.hidden.biases.scaled_add(-learning_rate, &hidden_grad);
    }

    /// Total number of parameters (weights + biases)
    pub fn parameter_count(&self) -> usize {
        [&self.hidden, &self.output]
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Check if network is valid (no NaN/Inf)
    pub fn is_valid(&self) -> bool {
        self.hidden.is_finite() && self.output.is_finite()
    }
}

fn outer(a: &Array1<f32>, b: &Array1<f32>) -> Array2<f32> {
    let column = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    column.dot(&row)
}
