//! Least-squares fitting

use crate::{MathError, Result};

/// Fit `y = intercept + slope * x` by ordinary least squares.
///
/// Returns `(slope, intercept)`.
pub fn simple_linear_regression(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    if x.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(MathError::InsufficientData(
            "Need at least 2 points for a regression".to_string(),
        ));
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        numerator += (xi - x_mean) * (yi - y_mean);
        denominator += (xi - x_mean) * (xi - x_mean);
    }

    if denominator.abs() < 1e-12 * (1.0 + x_mean.abs()) {
        return Err(MathError::CalculationError(
            "Cannot calculate slope: x values are too similar".to_string(),
        ));
    }

    let slope = numerator / denominator;
    Ok((slope, y_mean - slope * x_mean))
}

/// Penalised least squares: minimise `‖y - Xβ‖² + Σ penalties[j] β_j²`.
///
/// `design` is row-major (one row per observation). A zero penalty leaves
/// the coefficient unregularised.
pub fn ridge_regression(design: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if design.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            y.len()
        )));
    }
    let k = design.first().map(|row| row.len()).unwrap_or(0);
    if k == 0 {
        return Err(MathError::InvalidInput("Design matrix has no columns".to_string()));
    }
    if penalties.len() != k {
        return Err(MathError::InvalidInput(format!(
            "Expected {} penalties, got {}",
            k,
            penalties.len()
        )));
    }
    if design.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "Design matrix rows have different lengths".to_string(),
        ));
    }

    let mut gram = vec![vec![0.0; k]; k];
    let mut rhs = vec![0.0; k];
    for (row, &target) in design.iter().zip(y.iter()) {
        for i in 0..k {
            rhs[i] += row[i] * target;
            for j in i..k {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            gram[i][j] = gram[j][i];
        }
        gram[i][i] += penalties[i];
    }

    solve_linear_system(gram, rhs)
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} system",
            n, n
        )));
    }

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        if a[pivot][col].abs() < 1e-12 * scale || !a[pivot][col].is_finite() {
            return Err(MathError::SingularSystem(format!(
                "pivot in column {} is zero",
                col
            )));
        }

        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn simple_regression_recovers_line() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 4.0 - 0.5 * v).collect();
        let (slope, intercept) = simple_linear_regression(&x, &y).unwrap();
        assert_relative_eq!(slope, -0.5, epsilon = 1e-12);
        assert_relative_eq!(intercept, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn simple_regression_rejects_constant_x() {
        let result = simple_linear_regression(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(MathError::CalculationError(_))));
    }

    #[test]
    fn solve_small_system() {
        let a = vec![
            vec![2.0, 1.0, -1.0],
            vec![-3.0, -1.0, 2.0],
            vec![-2.0, 1.0, 2.0],
        ];
        let b = vec![8.0, -11.0, -3.0];
        let x = solve_linear_system(a, b).unwrap();
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 3.0, epsilon = 1e-10);
        assert_relative_eq!(x[2], -1.0, epsilon = 1e-10);
    }

    #[test]
    fn singular_system_is_reported() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let result = solve_linear_system(a, vec![1.0, 2.0]);
        assert!(matches!(result, Err(MathError::SingularSystem(_))));
    }

    #[test]
    fn ridge_without_penalty_is_ols() {
        let design: Vec<Vec<f64>> = (0..10).map(|t| vec![1.0, t as f64]).collect();
        let y: Vec<f64> = (0..10).map(|t| 3.0 + 2.0 * t as f64).collect();
        let beta = ridge_regression(&design, &y, &[0.0, 0.0]).unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(beta[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn ridge_penalty_shrinks_coefficient() {
        let design: Vec<Vec<f64>> = (0..10).map(|t| vec![1.0, t as f64]).collect();
        let y: Vec<f64> = (0..10).map(|t| 3.0 + 2.0 * t as f64).collect();
        let beta = ridge_regression(&design, &y, &[0.0, 1000.0]).unwrap();
        assert!(beta[1] < 2.0 && beta[1] > 0.0);
    }
}
