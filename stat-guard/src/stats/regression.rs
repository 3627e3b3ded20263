//! Collinearity diagnostics.

use super::descriptive::pearson;

/// Pivot magnitude below which a matrix is treated as singular.
const SINGULAR_EPSILON: f64 = 1e-10;

/// Pearson correlation matrix of equally long columns.
///
/// Returns `None` if any column is constant or shorter than two values.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let k = columns.len();
    let mut matrix = vec![vec![0.0; k]; k];
    for i in 0..k {
        matrix[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&columns[i], &columns[j])?;
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    Some(matrix)
}

/// Inverts a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Returns `None` for a singular matrix.
pub fn invert(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut left: Vec<Vec<f64>> = matrix.to_vec();
    let mut right: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for column in 0..n {
        let pivot_row = (column..n).max_by(|a, b| {
            left[*a][column]
                .abs()
                .total_cmp(&left[*b][column].abs())
        })?;
        if left[pivot_row][column].abs() < SINGULAR_EPSILON {
            return None;
        }
        left.swap(column, pivot_row);
        right.swap(column, pivot_row);

        let pivot = left[column][column];
        for j in 0..n {
            left[column][j] /= pivot;
            right[column][j] /= pivot;
        }

        for row in 0..n {
            if row == column {
                continue;
            }
            let factor = left[row][column];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                left[row][j] -= factor * left[column][j];
                right[row][j] -= factor * right[column][j];
            }
        }
    }
    Some(right)
}

/// Variance inflation factor of each column against all the others.
///
/// Computed as the diagonal of the inverse correlation matrix. A singular
/// correlation matrix (perfect collinearity) yields infinite factors for
/// every column. Returns `None` for fewer than two columns or when a column
/// is constant.
pub fn variance_inflation_factors(columns: &[Vec<f64>]) -> Option<Vec<f64>> {
    if columns.len() < 2 {
        return None;
    }
    let correlations = correlation_matrix(columns)?;
    match invert(&correlations) {
        Some(inverse) => Some((0..columns.len()).map(|i| inverse[i][i].max(1.0)).collect()),
        None => Some(vec![f64::INFINITY; columns.len()]),
    }
}
