//! Least-squares helpers shared by the trend and autoregressive models

/// Pivot magnitude below which a system is treated as singular
const SINGULAR_EPS: f64 = 1e-12;

/// Ordinary least squares line through `(x, y)`; returns `(intercept, slope)`
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(xi, yi)| xi * yi).sum();
    let sum_x2: f64 = x.iter().map(|xi| xi * xi).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < 1e-10 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((intercept, slope))
}

/// Solves `a * x = b` by Gaussian elimination with partial pivoting
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < SINGULAR_EPS {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

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

    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Least squares with an L2 penalty `ridge` on every coefficient but the first.
///
/// `rows` are design-matrix rows; the first column is expected to be the intercept.
pub fn least_squares(rows: &[Vec<f64>], targets: &[f64], ridge: f64) -> Option<Vec<f64>> {
    let width = rows.first()?.len();
    if rows.len() != targets.len() || rows.len() < width {
        return None;
    }

    let mut xtx = vec![vec![0.0; width]; width];
    let mut xty = vec![0.0; width];
    for (row, &target) in rows.iter().zip(targets) {
        for i in 0..width {
            xty[i] += row[i] * target;
            for j in 0..width {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, diag) in xtx.iter_mut().enumerate().skip(1) {
        diag[i] += ridge;
    }

    solve(xtx, xty)
}

/// Polynomial fit of the given degree; coefficients in ascending power order
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    if x.len() != y.len() {
        return None;
    }
    let rows: Vec<Vec<f64>> = x
        .iter()
        .map(|&xi| (0..=degree).map(|p| xi.powi(p as i32)).collect())
        .collect();
    least_squares(&rows, y, 0.0)
}

/// Evaluates ascending-order polynomial coefficients at `x` (Horner)
pub fn poly_eval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Coefficient of determination clamped to [0, 1].
///
/// A constant target fitted exactly scores 1; a constant target fitted with
/// residual error scores 0.
pub fn r_squared(actual: &[f64], fitted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != fitted.len() {
        return 0.0;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(fitted)
        .map(|(y, f)| (y - f).powi(2))
        .sum();

    let scale = mean.abs().max(1.0).powi(2) * actual.len() as f64;
    if ss_tot <= 1e-12 * scale {
        return if ss_res <= 1e-12 * scale { 1.0 } else { 0.0 };
    }

    let value = 1.0 - ss_res / ss_tot;
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_fit_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let (intercept, slope) = linear_fit(&x, &y).unwrap();
        assert!((intercept - 1.0).abs() < 1e-12);
        assert!((slope - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_constant_is_exact() {
        let x: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let y = vec![100.0; 30];
        assert_eq!(linear_fit(&x, &y), Some((100.0, 0.0)));
    }

    #[test]
    fn test_linear_fit_degenerate_x() {
        assert!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_solve_requires_pivoting() {
        let a = vec![vec![0.0, 1.0], vec![1.0, 1.0]];
        let b = vec![2.0, 3.0];
        let x = solve(a, b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(solve(a, vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_polyfit_recovers_quadratic() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let y: Vec<f64> = x.iter().map(|t| 2.0 - 3.0 * t + 4.0 * t * t).collect();
        let coefficients = polyfit(&x, &y, 2).unwrap();
        assert!((coefficients[0] - 2.0).abs() < 1e-8);
        assert!((coefficients[1] + 3.0).abs() < 1e-8);
        assert!((coefficients[2] - 4.0).abs() < 1e-8);
        assert!((poly_eval(&coefficients, 2.0) - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_ridge_makes_zero_design_solvable() {
        let rows = vec![vec![1.0, 0.0]; 5];
        let targets = vec![0.0; 5];
        assert!(least_squares(&rows, &targets, 0.0).is_none());
        let beta = least_squares(&rows, &targets, 1e-6).unwrap();
        assert_eq!(beta, vec![0.0, 0.0]);
    }

    #[test]
    fn test_r_squared() {
        assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(r_squared(&[5.0; 4], &[5.0; 4]), 1.0);
        assert_eq!(r_squared(&[5.0; 4], &[6.0; 4]), 0.0);
        assert_eq!(r_squared(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), 0.0);
    }
}
