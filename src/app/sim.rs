//! Toy online-learning loop
//!
//! Fits a linear model to a hidden target with mini-batch gradient steps, all
//! routed through the damper. Cost shocks can be injected on a fixed period to
//! exercise the spike path.

use crate::damper::{IterationState, SignalDamper, StatsSnapshot};
use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

const BATCH_SIZE: usize = 8;
const LABEL_NOISE: f64 = 0.01;
/// Target multiplier on shock iterations
const SHOCK_GAIN: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub iterations: usize,
    pub weights: usize,
    pub lr: f64,
    pub seed: u64,
    /// 0 disables shocks
    pub spike_every: usize,
    /// 0 disables progress logging
    pub log_every: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            iterations: 2000,
            weights: 128,
            lr: 0.05,
            seed: 42,
            spike_every: 250,
            log_every: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub iterations: usize,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub best_cost: f64,
    pub shocks_injected: usize,
    /// Iterations whose returned state flagged oscillation
    pub oscillating_iterations: usize,
    /// Distance from the starting weights to the hidden target
    pub initial_weight_error: f64,
    /// Distance from the learned weights to the hidden target
    pub weight_error: f64,
    pub stats: StatsSnapshot,
}

/// Run the loop to completion with a caller-owned damper
pub fn run(damper: &mut SignalDamper, params: &SimulationParams) -> Result<SimulationReport> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let n = params.weights;

    let target: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let mut weights = vec![0.0; n];
    let initial_weight_error = distance(&weights, &target);
    let mut grads = vec![0.0; n];
    let mut x = vec![0.0; n];

    let mut integral = 0.0;
    let mut prev_cost: Option<f64> = None;
    let mut initial_cost = f64::NAN;
    let mut final_cost = f64::NAN;
    let mut best_cost = f64::INFINITY;
    let mut shocks = 0;
    let mut oscillating = 0;

    for iter in 1..=params.iterations {
        let shock = params.spike_every > 0 && iter % params.spike_every == 0;
        if shock {
            shocks += 1;
        }

        grads.iter_mut().for_each(|g| *g = 0.0);
        let mut cost = 0.0;
        let mut err_sum = 0.0;
        let mut pred_sum = 0.0;

        for _ in 0..BATCH_SIZE {
            x.iter_mut().for_each(|v| *v = rng.gen_range(-1.0..1.0));
            let mut y = dot(&target, &x) + rng.gen_range(-LABEL_NOISE..LABEL_NOISE);
            if shock {
                y *= SHOCK_GAIN;
            }
            let pred = dot(&weights, &x);
            let err = pred - y;

            cost += 0.5 * err * err;
            err_sum += err;
            pred_sum += pred;
            for (g, xi) in grads.iter_mut().zip(&x) {
                *g += err * xi;
            }
        }

        let batch = BATCH_SIZE as f64;
        cost /= batch;
        grads.iter_mut().for_each(|g| *g /= batch);
        let mean_err = err_sum / batch;
        integral += mean_err;

        let state = damper.protect(IterationState {
            cost: Some(cost),
            prev_cost,
            gradient: Some(mean_err),
            error: Some(mean_err),
            integral: Some(integral),
            aggregate: Some(pred_sum / batch),
            ..IterationState::default()
        });
        if let Some(limited) = state.integral {
            integral = limited;
        }
        if state.oscillation_detected {
            oscillating += 1;
        }

        damper.clip_gradient_l2(&mut grads);
        damper.protect_weight_update(&mut weights, &grads, params.lr)?;

        if iter == 1 {
            initial_cost = cost;
        }
        if !shock {
            best_cost = best_cost.min(cost);
        }
        final_cost = cost;
        prev_cost = Some(cost);

        if params.log_every > 0 && iter % params.log_every == 0 {
            tracing::info!(
                iteration = iter,
                cost,
                lr_scale = damper.lr_scale(),
                in_spike = damper.in_spike(),
                "training progress"
            );
        }
    }

    let weight_error = distance(&weights, &target);

    Ok(SimulationReport {
        iterations: params.iterations,
        initial_cost,
        final_cost,
        best_cost,
        shocks_injected: shocks,
        oscillating_iterations: oscillating,
        initial_weight_error,
        weight_error,
        stats: damper.stats(),
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}
