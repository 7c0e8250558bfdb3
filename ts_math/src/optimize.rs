//! Bounded Nelder-Mead simplex minimisation

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of a Nelder-Mead run
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point
    pub optimal_value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the simplex met the tolerance before the iteration cap
    pub converged: bool,
}

/// Nelder-Mead settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Iteration cap
    pub max_iter: usize,
    /// Convergence tolerance, relative to the best objective value
    pub tolerance: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
    /// Initial simplex step
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            tolerance: 1e-9,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Minimise `objective` starting from `initial`.
///
/// Points are clamped into `bounds` when given. Convergence is declared when
/// the spread of objective values across the simplex falls below
/// `tolerance * (1 + |best|)` or the simplex collapses.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: Vec::new(),
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    // NaN compares as worse than everything
    let eval = |point: &[f64]| {
        let v = objective(point);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    let start = apply_bounds(initial, bounds);
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let step = if start[i].abs() > 1e-10 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        let mut vertex = apply_bounds(&vertex, bounds);
        if vertex[i] == start[i] {
            // Pinned against an upper bound, step inwards instead
            vertex[i] -= 2.0 * step;
            vertex = apply_bounds(&vertex, bounds);
        }
        simplex.push(vertex);
    }

    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = values[worst] - values[best];
        if spread.is_finite() && spread <= config.tolerance * (1.0 + values[best].abs()) {
            converged = true;
            break;
        }

        let centroid = centroid_excluding(&simplex, worst);
        let max_dist = simplex
            .iter()
            .map(|v| euclidean_distance(v, &centroid))
            .fold(0.0, f64::max);
        if max_dist < 1e-12 {
            converged = values[best].is_finite();
            break;
        }

        let reflected = apply_bounds(&towards(&centroid, &simplex[worst], -config.alpha), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < values[best] {
            let expanded = apply_bounds(&towards(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[worst] {
            let outside = apply_bounds(&towards(&centroid, &reflected, config.rho), bounds);
            let value = eval(&outside);
            (outside, value)
        } else {
            let inside = apply_bounds(&towards(&centroid, &simplex[worst], config.rho), bounds);
            let value = eval(&inside);
            (inside, value)
        };

        if contracted_value < values[worst].min(reflected_value) {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i == best {
                continue;
            }
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(simplex[i].iter())
                .map(|(b, x)| b + config.sigma * (x - b))
                .collect();
            simplex[i] = apply_bounds(&shrunk, bounds);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
    }
}

fn centroid_excluding(simplex: &[Vec<f64>], exclude: usize) -> Vec<f64> {
    let dim = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; dim];
    for (i, vertex) in simplex.iter().enumerate() {
        if i == exclude {
            continue;
        }
        for (c, x) in centroid.iter_mut().zip(vertex.iter()) {
            *c += x;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `centroid + factor * (point - centroid)`
fn towards(centroid: &[f64], point: &[f64], factor: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(point.iter())
        .map(|(c, p)| c + factor * (p - c))
        .collect()
}

fn apply_bounds(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .enumerate()
            .map(|(i, &x)| match b.get(i) {
                Some(&(lo, hi)) => x.clamp(lo, hi),
                None => x,
            })
            .collect(),
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quadratic_bowl() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
            &[0.0, 0.0],
            None,
            &NelderMeadConfig::default(),
        );

        assert!(result.converged);
        assert_relative_eq!(result.optimal_point[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.optimal_point[1], 3.0, epsilon = 1e-3);
    }

    #[test]
    fn rosenbrock_valley() {
        let config = NelderMeadConfig {
            tolerance: 1e-14,
            ..Default::default()
        };
        let result = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[-1.0, 1.5],
            None,
            &config,
        );

        assert_relative_eq!(result.optimal_point[0], 1.0, epsilon = 1e-2);
        assert_relative_eq!(result.optimal_point[1], 1.0, epsilon = 2e-2);
    }

    #[test]
    fn respects_bounds() {
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[1.0],
            Some(&[(0.0, 3.0)][..]),
            &NelderMeadConfig::default(),
        );
        assert_relative_eq!(result.optimal_point[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn start_on_upper_bound() {
        let result = nelder_mead(
            |x| (x[0] - 0.2).powi(2),
            &[0.99],
            Some(&[(-0.99, 0.99)][..]),
            &NelderMeadConfig::default(),
        );
        assert_relative_eq!(result.optimal_point[0], 0.2, epsilon = 1e-3);
    }

    #[test]
    fn iteration_cap_reports_no_convergence() {
        let config = NelderMeadConfig {
            max_iter: 3,
            tolerance: 1e-15,
            ..Default::default()
        };
        let result = nelder_mead(
            |x| x.iter().map(|v| (v - 7.0).powi(2)).sum(),
            &[0.0, 0.0, 0.0],
            None,
            &config,
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn empty_problem() {
        let result = nelder_mead(|_| 0.0, &[], None, &NelderMeadConfig::default());
        assert!(!result.converged);
        assert!(result.optimal_value.is_nan());
    }
}
