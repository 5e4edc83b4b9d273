//! Two-dimensional projections of the distinct team vectors.

use std::cmp::Ordering;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProjectionError;

pub type Point2 = [f64; 2];

/// Vectors in, one 2D point per vector out, same order.
pub trait Projector {
    fn name(&self) -> &'static str;

    fn project(&self, vectors: &[Vec<f64>]) -> Result<Vec<Point2>, ProjectionError>;
}

fn check_shape(vectors: &[Vec<f64>]) -> Result<usize, ProjectionError> {
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    for (index, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(ProjectionError::Ragged {
                index,
                expected: dim,
                found: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(ProjectionError::NonFinite { index });
        }
    }
    Ok(dim)
}

/// Principal component analysis onto the top two components.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pca;

impl Projector for Pca {
    fn name(&self) -> &'static str {
        "pca"
    }

    fn project(&self, vectors: &[Vec<f64>]) -> Result<Vec<Point2>, ProjectionError> {
        let dim = check_shape(vectors)?;
        let n = vectors.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        if dim == 0 || n == 1 {
            return Ok(vec![[0.0, 0.0]; n]);
        }

        let mut m = DMatrix::<f64>::from_fn(n, dim, |i, j| vectors[i][j]);
        for j in 0..dim {
            let mean = m.column(j).mean();
            for i in 0..n {
                m[(i, j)] -= mean;
            }
        }

        let svd = m.svd(true, false);
        let u = svd.u.ok_or(ProjectionError::Decomposition("svd"))?;
        let s = &svd.singular_values;

        let mut order: Vec<usize> = (0..s.len()).collect();
        order.sort_by(|a, b| s[*b].partial_cmp(&s[*a]).unwrap_or(Ordering::Equal));
        let tol = s.iter().copied().fold(0.0_f64, f64::max) * 1e-12;

        let mut out = vec![[0.0, 0.0]; n];
        for (component, &k) in order.iter().take(2).enumerate() {
            if s[k] <= tol {
                continue;
            }
            // Sign convention: largest-magnitude score per component is positive.
            let pivot = (0..n)
                .max_by(|a, b| {
                    u[(*a, k)]
                        .abs()
                        .partial_cmp(&u[(*b, k)].abs())
                        .unwrap_or(Ordering::Equal)
                })
                .unwrap_or(0);
            let sign = if u[(pivot, k)] < 0.0 { -1.0 } else { 1.0 };
            for (i, point) in out.iter_mut().enumerate() {
                point[component] = sign * u[(i, k)] * s[k];
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TsneInit {
    /// Scaled PCA coordinates. Fully deterministic.
    Pca,
    Random { seed: u64 },
}

pub const DEFAULT_PERPLEXITY_CAP: f64 = 10.0;
pub const DEFAULT_TSNE_MAX_ITER: usize = 10_000;

const EARLY_EXAGGERATION: f64 = 12.0;
const EXPLORATION_ITERS: usize = 250;
const MIN_GRAD_NORM: f64 = 1e-7;
const MAX_ITERS_WITHOUT_PROGRESS: usize = 300;
const PROGRESS_CHECK_EVERY: usize = 50;
const MIN_GAIN: f64 = 0.01;
const PERPLEXITY_TOL: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 100;
const MACHINE_EPSILON: f64 = f64::EPSILON;

/// Exact t-SNE. Perplexity follows the batch size so small batches stay valid.
#[derive(Debug, Clone, Copy)]
pub struct Tsne {
    pub perplexity_cap: f64,
    pub max_iter: usize,
    pub init: TsneInit,
}

impl Default for Tsne {
    fn default() -> Self {
        Self {
            perplexity_cap: DEFAULT_PERPLEXITY_CAP,
            max_iter: DEFAULT_TSNE_MAX_ITER,
            init: TsneInit::Pca,
        }
    }
}

/// `min(n - 1, cap)`.
pub fn effective_perplexity(n: usize, cap: f64) -> f64 {
    (n.saturating_sub(1) as f64).min(cap)
}

impl Projector for Tsne {
    fn name(&self) -> &'static str {
        "tsne"
    }

    fn project(&self, vectors: &[Vec<f64>]) -> Result<Vec<Point2>, ProjectionError> {
        check_shape(vectors)?;
        let n = vectors.len();
        if n < 2 {
            return Ok(vec![[0.0, 0.0]; n]);
        }

        let perplexity = effective_perplexity(n, self.perplexity_cap);
        let distances = squared_distances(vectors);
        let p = joint_probabilities(&distances, n, perplexity);
        let y = self.initial_embedding(vectors)?;
        Ok(self.optimise(&p, y, n))
    }
}

impl Tsne {
    fn initial_embedding(&self, vectors: &[Vec<f64>]) -> Result<Vec<Point2>, ProjectionError> {
        let n = vectors.len();
        if let TsneInit::Pca = self.init {
            let pca = Pca.project(vectors)?;
            let mean = pca.iter().map(|p| p[0]).sum::<f64>() / n as f64;
            let var = pca.iter().map(|p| (p[0] - mean).powi(2)).sum::<f64>() / n as f64;
            let std = var.sqrt();
            if std > 0.0 {
                return Ok(pca
                    .into_iter()
                    .map(|p| [p[0] / std * 1e-4, p[1] / std * 1e-4])
                    .collect());
            }
        }
        let seed = match self.init {
            TsneInit::Random { seed } => seed,
            TsneInit::Pca => 0,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        Ok((0..n)
            .map(|_| {
                [
                    (rng.r#gen::<f64>() - 0.5) * 1e-4,
                    (rng.r#gen::<f64>() - 0.5) * 1e-4,
                ]
            })
            .collect())
    }

    fn optimise(&self, p: &[f64], mut y: Vec<Point2>, n: usize) -> Vec<Point2> {
        let learning_rate = (n as f64 / EARLY_EXAGGERATION / 4.0).max(50.0);
        let mut update = vec![[0.0; 2]; n];
        let mut gains = vec![[1.0_f64; 2]; n];
        let mut grad = vec![[0.0; 2]; n];
        let mut num = vec![0.0; n * n];
        let mut best_error = f64::INFINITY;
        let mut best_iter = 0usize;

        for iter in 0..self.max_iter {
            let exploring = iter < EXPLORATION_ITERS;
            let exaggeration = if exploring { EARLY_EXAGGERATION } else { 1.0 };
            let momentum = if exploring { 0.5 } else { 0.8 };

            let mut sum_q = 0.0;
            for i in 0..n {
                num[i * n + i] = 0.0;
                for j in (i + 1)..n {
                    let dx = y[i][0] - y[j][0];
                    let dy = y[i][1] - y[j][1];
                    let w = 1.0 / (1.0 + dx * dx + dy * dy);
                    num[i * n + j] = w;
                    num[j * n + i] = w;
                    sum_q += 2.0 * w;
                }
            }
            let sum_q = sum_q.max(MACHINE_EPSILON);

            let mut grad_norm_sq = 0.0;
            for i in 0..n {
                let mut g = [0.0; 2];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let w = num[i * n + j];
                    let q = (w / sum_q).max(MACHINE_EPSILON);
                    let coeff = (exaggeration * p[i * n + j] - q) * w;
                    g[0] += coeff * (y[i][0] - y[j][0]);
                    g[1] += coeff * (y[i][1] - y[j][1]);
                }
                grad[i] = [4.0 * g[0], 4.0 * g[1]];
                grad_norm_sq += grad[i][0] * grad[i][0] + grad[i][1] * grad[i][1];
            }

            for i in 0..n {
                for d in 0..2 {
                    let same_direction = (grad[i][d] > 0.0) == (update[i][d] > 0.0);
                    let gain = if same_direction {
                        gains[i][d] * 0.8
                    } else {
                        gains[i][d] + 0.2
                    };
                    gains[i][d] = gain.max(MIN_GAIN);
                    update[i][d] =
                        momentum * update[i][d] - learning_rate * gains[i][d] * grad[i][d];
                    y[i][d] += update[i][d];
                }
            }

            if grad_norm_sq.sqrt() < MIN_GRAD_NORM {
                break;
            }
            if !exploring && (iter + 1) % PROGRESS_CHECK_EVERY == 0 {
                let error = kl_divergence(p, &num, sum_q, n);
                if error < best_error {
                    best_error = error;
                    best_iter = iter;
                } else if iter - best_iter > MAX_ITERS_WITHOUT_PROGRESS {
                    break;
                }
            }
        }
        y
    }
}

fn squared_distances(vectors: &[Vec<f64>]) -> Vec<f64> {
    let n = vectors.len();
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = vectors[i]
                .iter()
                .zip(&vectors[j])
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            out[i * n + j] = d;
            out[j * n + i] = d;
        }
    }
    out
}

/// Symmetrised Gaussian affinities, each row calibrated to `perplexity`.
fn joint_probabilities(distances: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let target_entropy = perplexity.ln();
    let mut conditional = vec![0.0; n * n];

    for i in 0..n {
        let row = &distances[i * n..(i + 1) * n];
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..PERPLEXITY_STEPS {
            let mut sum_p = 0.0;
            for j in 0..n {
                let pj = if i == j { 0.0 } else { (-row[j] * beta).exp() };
                conditional[i * n + j] = pj;
                sum_p += pj;
            }
            if sum_p == 0.0 {
                sum_p = MACHINE_EPSILON;
            }
            let mut weighted = 0.0;
            for j in 0..n {
                conditional[i * n + j] /= sum_p;
                weighted += row[j] * conditional[i * n + j];
            }
            let entropy = sum_p.ln() + beta * weighted;
            let diff = entropy - target_entropy;
            if diff.abs() <= PERPLEXITY_TOL {
                break;
            }
            if diff > 0.0 {
                beta_min = beta;
                beta = if beta_max.is_infinite() {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }
    }

    let denom = 2.0 * n as f64;
    let mut joint = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let pij = (conditional[i * n + j] + conditional[j * n + i]) / denom;
                joint[i * n + j] = pij.max(MACHINE_EPSILON);
            }
        }
    }
    joint
}

fn kl_divergence(p: &[f64], num: &[f64], sum_q: f64, n: usize) -> f64 {
    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let pij = p[i * n + j];
            let q = (num[i * n + j] / sum_q).max(MACHINE_EPSILON);
            kl += pij * (pij / q).ln();
        }
    }
    kl
}
