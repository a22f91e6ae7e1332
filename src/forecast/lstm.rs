//! Single-layer LSTM forecaster over a three-month window
//!
//! Cell layout follows the common fused-gate form with gates ordered
//! input, forget, candidate, output:
//!
//! ```text
//! z  = W x + U h + b
//! i  = σ(z_i)   f = σ(z_f)   g = relu(z_g)   o = σ(z_o)
//! c' = f ⊙ c + i ⊙ g
//! h' = o ⊙ relu(c')
//! ŷ  = v · h_T + b_out
//! ```
//!
//! Training is full backpropagation through time over the window with Adam
//! on mean squared error. The series is min-max scaled first and forecasts
//! are inverse-scaled back to currency.

use super::error::{ForecastError, ForecastResult};
use super::scaler::MinMaxScaler;
use super::window::RollingWindow;
use crate::config::ForecastingConfig;
use ndarray::{linalg::general_mat_mul, s, Array, Array1, Array2, Axis, Dimension, Zip};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Months of history fed to the network per prediction
pub const LSTM_WINDOW: usize = 3;

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

/// LSTM training hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LstmParams {
    pub units: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for LstmParams {
    fn default() -> Self {
        Self {
            units: 50,
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

impl From<&ForecastingConfig> for LstmParams {
    fn from(config: &ForecastingConfig) -> Self {
        Self {
            units: config.lstm_units,
            epochs: config.lstm_epochs,
            batch_size: config.lstm_batch_size,
            learning_rate: config.lstm_learning_rate,
            seed: config.seed,
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn sigmoid_grad(s: f64) -> f64 {
    s * (1.0 - s)
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn relu_grad(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Weight set; also used for gradients and Adam moments
#[derive(Debug, Clone)]
struct Parameters {
    /// Input weights, `4 * units` (scalar input)
    kernel: Array1<f64>,
    /// Recurrent weights, `4 * units × units`
    recurrent: Array2<f64>,
    bias: Array1<f64>,
    /// Output projection
    dense: Array1<f64>,
    dense_bias: Array1<f64>,
}

impl Parameters {
    fn zeros(units: usize) -> Self {
        Self {
            kernel: Array1::zeros(4 * units),
            recurrent: Array2::zeros((4 * units, units)),
            bias: Array1::zeros(4 * units),
            dense: Array1::zeros(units),
            dense_bias: Array1::zeros(1),
        }
    }

    /// Glorot-uniform weights, zero bias with the forget gate biased to one
    fn initialise(units: usize, rng: &mut StdRng) -> Self {
        let mut glorot = |len: usize, fan_in: usize, fan_out: usize| {
            let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
            (0..len)
                .map(|_| rng.gen_range(-limit..limit))
                .collect::<Vec<f64>>()
        };

        let kernel = Array1::from(glorot(4 * units, 1, 4 * units));
        let recurrent = Array2::from_shape_vec(
            (4 * units, units),
            glorot(4 * units * units, units, 4 * units),
        )
        .unwrap_or_else(|_| Array2::zeros((4 * units, units)));
        let dense = Array1::from(glorot(units, units, 1));

        let mut bias = Array1::zeros(4 * units);
        bias.slice_mut(s![units..2 * units]).fill(1.0);

        Self {
            kernel,
            recurrent,
            bias,
            dense,
            dense_bias: Array1::zeros(1),
        }
    }
}

/// Activations kept from the forward pass for backpropagation
struct StepCache {
    x: f64,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    input: Array1<f64>,
    forget: Array1<f64>,
    candidate_pre: Array1<f64>,
    candidate: Array1<f64>,
    output: Array1<f64>,
    cell: Array1<f64>,
}

#[derive(Debug, Clone)]
struct LstmNetwork {
    units: usize,
    params: Parameters,
}

impl LstmNetwork {
    fn new(units: usize, rng: &mut StdRng) -> Self {
        Self {
            units,
            params: Parameters::initialise(units, rng),
        }
    }

    fn forward(&self, window: &[f64]) -> (f64, Vec<StepCache>, Array1<f64>) {
        let u = self.units;
        let p = &self.params;
        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);
        let mut caches = Vec::with_capacity(window.len());

        for &x in window {
            let z = &p.kernel * x + p.recurrent.dot(&h) + &p.bias;
            let input = z.slice(s![0..u]).mapv(sigmoid);
            let forget = z.slice(s![u..2 * u]).mapv(sigmoid);
            let candidate_pre = z.slice(s![2 * u..3 * u]).to_owned();
            let candidate = candidate_pre.mapv(relu);
            let output = z.slice(s![3 * u..4 * u]).mapv(sigmoid);

            let cell = &forget * &c + &input * &candidate;
            let hidden = &output * &cell.mapv(relu);

            caches.push(StepCache {
                x,
                h_prev: h,
                c_prev: c,
                input,
                forget,
                candidate_pre,
                candidate,
                output,
                cell: cell.clone(),
            });
            h = hidden;
            c = cell;
        }

        let y = p.dense.dot(&h) + p.dense_bias[0];
        (y, caches, h)
    }

    fn predict(&self, window: &[f64]) -> f64 {
        self.forward(window).0
    }

    /// Add `scale * d(squared error)/d(params)` into `grads`; returns the squared error
    fn accumulate_gradients(
        &self,
        window: &[f64],
        target: f64,
        grads: &mut Parameters,
        scale: f64,
    ) -> f64 {
        let u = self.units;
        let p = &self.params;
        let (y, caches, h_last) = self.forward(window);
        let error = y - target;
        let dy = 2.0 * error * scale;

        grads.dense.scaled_add(dy, &h_last);
        grads.dense_bias[0] += dy;

        let mut dh = &p.dense * dy;
        let mut dc_next = Array1::<f64>::zeros(u);

        for step in caches.iter().rev() {
            let relu_cell = step.cell.mapv(relu);
            let d_output = &dh * &relu_cell * &step.output.mapv(sigmoid_grad);
            let dc = &dc_next + &(&dh * &step.output * &step.cell.mapv(relu_grad));
            let d_forget = &dc * &step.c_prev * &step.forget.mapv(sigmoid_grad);
            let d_input = &dc * &step.candidate * &step.input.mapv(sigmoid_grad);
            let d_candidate = &dc * &step.input * &step.candidate_pre.mapv(relu_grad);

            let mut dz = Array1::<f64>::zeros(4 * u);
            dz.slice_mut(s![0..u]).assign(&d_input);
            dz.slice_mut(s![u..2 * u]).assign(&d_forget);
            dz.slice_mut(s![2 * u..3 * u]).assign(&d_candidate);
            dz.slice_mut(s![3 * u..4 * u]).assign(&d_output);

            grads.kernel.scaled_add(step.x, &dz);
            grads.bias += &dz;
            general_mat_mul(
                1.0,
                &dz.view().insert_axis(Axis(1)),
                &step.h_prev.view().insert_axis(Axis(0)),
                1.0,
                &mut grads.recurrent,
            );

            dh = p.recurrent.t().dot(&dz);
            dc_next = &dc * &step.forget;
        }

        error * error
    }
}

/// Adam optimiser state
struct Adam {
    learning_rate: f64,
    step: i32,
    first: Parameters,
    second: Parameters,
}

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    first: &mut Array<f64, D>,
    second: &mut Array<f64, D>,
    step_size: f64,
) {
    Zip::from(param)
        .and(grad)
        .and(first)
        .and(second)
        .for_each(|w, &g, m, v| {
            *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
            *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
            *w -= step_size * *m / (v.sqrt() + ADAM_EPSILON);
        });
}

impl Adam {
    fn new(learning_rate: f64, units: usize) -> Self {
        Self {
            learning_rate,
            step: 0,
            first: Parameters::zeros(units),
            second: Parameters::zeros(units),
        }
    }

    fn apply(&mut self, params: &mut Parameters, grads: &Parameters) {
        self.step += 1;
        let step_size = self.learning_rate * (1.0 - ADAM_BETA2.powi(self.step)).sqrt()
            / (1.0 - ADAM_BETA1.powi(self.step));

        adam_update(
            &mut params.kernel,
            &grads.kernel,
            &mut self.first.kernel,
            &mut self.second.kernel,
            step_size,
        );
        adam_update(
            &mut params.recurrent,
            &grads.recurrent,
            &mut self.first.recurrent,
            &mut self.second.recurrent,
            step_size,
        );
        adam_update(
            &mut params.bias,
            &grads.bias,
            &mut self.first.bias,
            &mut self.second.bias,
            step_size,
        );
        adam_update(
            &mut params.dense,
            &grads.dense,
            &mut self.first.dense,
            &mut self.second.dense,
            step_size,
        );
        adam_update(
            &mut params.dense_bias,
            &grads.dense_bias,
            &mut self.first.dense_bias,
            &mut self.second.dense_bias,
            step_size,
        );
    }
}

/// Fitted LSTM with the scaler and the last observed window
#[derive(Debug, Clone)]
pub struct LstmForecaster {
    network: LstmNetwork,
    scaler: MinMaxScaler,
    last_window: RollingWindow<LSTM_WINDOW>,
    final_loss: f64,
}

impl LstmForecaster {
    pub fn fit(series: &[f64], params: LstmParams) -> ForecastResult<Self> {
        let required = LSTM_WINDOW + 1;
        if series.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                available: series.len(),
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Model(
                "series contains non-finite values".to_string(),
            ));
        }
        if params.units == 0 || params.batch_size == 0 {
            return Err(ForecastError::Model(
                "units and batch size must be positive".to_string(),
            ));
        }

        let scaler = MinMaxScaler::fit(series);
        let scaled: Vec<f64> = series.iter().map(|&v| scaler.transform(v)).collect();
        let samples: Vec<(&[f64], f64)> = scaled
            .windows(LSTM_WINDOW + 1)
            .map(|w| (&w[..LSTM_WINDOW], w[LSTM_WINDOW]))
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut network = LstmNetwork::new(params.units, &mut rng);
        let mut optimiser = Adam::new(params.learning_rate, params.units);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut final_loss = f64::NAN;

        for epoch in 0..params.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(params.batch_size) {
                let mut grads = Parameters::zeros(params.units);
                let scale = 1.0 / batch.len() as f64;
                for &idx in batch {
                    let (window, target) = samples[idx];
                    epoch_loss += network.accumulate_gradients(window, target, &mut grads, scale);
                }
                optimiser.apply(&mut network.params, &grads);
            }

            final_loss = epoch_loss / samples.len() as f64;
            if !final_loss.is_finite() {
                return Err(ForecastError::Model(format!(
                    "LSTM training diverged at epoch {}",
                    epoch + 1
                )));
            }
            debug!(epoch = epoch + 1, loss = final_loss, "LSTM epoch");
        }

        let last_window = RollingWindow::from_tail(&scaled).ok_or_else(|| {
            ForecastError::Model("series shorter than the LSTM window".to_string())
        })?;

        Ok(Self {
            network,
            scaler,
            last_window,
            final_loss,
        })
    }

    /// Roll the window forward `steps` months, feeding each prediction back in
    pub fn forecast(&self, steps: usize) -> ForecastResult<Vec<f64>> {
        let mut window = self.last_window;
        let mut out = Vec::with_capacity(steps);

        for step in 0..steps {
            let next = self.network.predict(window.as_slice());
            if !next.is_finite() {
                return Err(ForecastError::Model(format!(
                    "non-finite LSTM output at step {}",
                    step + 1
                )));
            }
            out.push(self.scaler.inverse(next));
            window.push(next);
        }
        Ok(out)
    }

    /// Mean squared error over the last training epoch, in scaled units
    pub fn final_loss(&self) -> f64 {
        self.final_loss
    }
}
