//! Differencing and lag-polynomial algebra
//!
//! Polynomials in the backshift operator `B` are stored as coefficient
//! vectors where index `k` holds the coefficient of `B^k`. Index 0 is
//! always 1 for the operators built here.

/// Apply `d` rounds of first differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `d` rounds of seasonal differencing at lag `period`.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Multiply two lag polynomials.
pub fn multiply_polynomials(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut product = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            product[i + j] += x * y;
        }
    }
    product
}

/// Build `1 + sign * Σ c_i B^(i * stride)` for i = 1..=len.
///
/// An AR operator `1 - φ1 B - φ2 B²` is `lag_polynomial(&[φ1, φ2], -1.0, 1)`;
/// a seasonal MA operator `1 + Θ1 B¹²` is `lag_polynomial(&[Θ1], 1.0, 12)`.
pub fn lag_polynomial(coefficients: &[f64], sign: f64, stride: usize) -> Vec<f64> {
    let stride = stride.max(1);
    let mut poly = vec![0.0; coefficients.len() * stride + 1];
    poly[0] = 1.0;
    for (i, &c) in coefficients.iter().enumerate() {
        poly[(i + 1) * stride] = sign * c;
    }
    poly
}

/// The combined operator `(1 - B)^d (1 - B^period)^seasonal_d`.
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply_polynomials(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let seasonal = lag_polynomial(&[1.0], -1.0, period);
        for _ in 0..seasonal_d {
            poly = multiply_polynomials(&poly, &seasonal);
        }
    }
    poly
}

/// Apply a lag polynomial to a series: `w_t = Σ_k poly[k] · y_{t-k}`.
///
/// The output starts at the first index where every lag is available, so it
/// is `poly.len() - 1` observations shorter than the input.
pub fn apply_polynomial(series: &[f64], poly: &[f64]) -> Vec<f64> {
    let order = poly.len().saturating_sub(1);
    if poly.is_empty() || series.len() <= order {
        return Vec::new();
    }

    (order..series.len())
        .map(|t| {
            poly.iter()
                .enumerate()
                .map(|(k, &c)| c * series[t - k])
                .sum()
        })
        .collect()
}

/// Undo a differencing polynomial for values past the end of `history`.
///
/// Each new level is `y_t = w_t - Σ_{k≥1} poly[k] · y_{t-k}`, so the
/// returned vector has one entry per element of `differenced`.
pub fn integrate(history: &[f64], differenced: &[f64], poly: &[f64]) -> Vec<f64> {
    let mut extended = history.to_vec();
    let mut levels = Vec::with_capacity(differenced.len());

    for &w in differenced {
        let t = extended.len();
        let mut value = w;
        for (k, &c) in poly.iter().enumerate().skip(1) {
            if t >= k {
                value -= c * extended[t - k];
            }
        }
        extended.push(value);
        levels.push(value);
    }

    levels
}
