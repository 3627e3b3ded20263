//! Descriptive statistics over slices of finite values.

use serde::Serialize;
use std::cmp::Ordering;

/// Returns a sorted copy of `values`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator); `None` below two values.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Linearly interpolated quantile of already sorted values.
///
/// Matches the default ("linear") definition used by most dataframe
/// libraries: position `q * (n - 1)`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Quantile of unsorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

/// Median of unsorted values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Central moments m2, m3, m4 with population (n) denominators.
fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let mean = mean(values)?;
    let n = values.len() as f64;
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    });
    Some((m2 / n, m3 / n, m4 / n))
}

/// Biased (Fisher-Pearson) sample skewness.
///
/// `None` for fewer than three values or zero variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let (m2, m3, _) = central_moments(values)?;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    Some(m3 / m2.powf(1.5))
}

/// Biased excess kurtosis (normal distribution = 0).
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    if values.len() < 4 {
        return None;
    }
    let (m2, _, m4) = central_moments(values)?;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    Some(m4 / (m2 * m2) - 3.0)
}

/// Number of distinct values, treating equal floats as one value.
pub fn unique_count(values: &[f64]) -> usize {
    let sorted = sorted(values);
    let mut count = 0;
    let mut previous: Option<f64> = None;
    for value in sorted {
        if previous.is_none_or(|p| p.total_cmp(&value) != Ordering::Equal) {
            count += 1;
        }
        previous = Some(value);
    }
    count
}

/// Pearson correlation of paired values.
///
/// `None` when fewer than two pairs or either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Cohen's d between two samples using `sqrt((v1 + v2) / 2)` as pooled sd.
///
/// `None` if either sample has fewer than two values or the pooled sd is 0.
pub fn cohens_d(a: &[f64], b: &[f64]) -> Option<f64> {
    let pooled = ((variance(a)? + variance(b)?) / 2.0).sqrt();
    if pooled <= 0.0 {
        return None;
    }
    Some((mean(a)? - mean(b)?).abs() / pooled)
}

/// Conventional label for an absolute effect size.
pub fn interpret_effect_size(d: f64) -> &'static str {
    match d.abs() {
        d if d < 0.2 => "negligible",
        d if d < 0.5 => "small",
        d if d < 0.8 => "medium",
        _ => "large",
    }
}

/// Summary statistics of a numeric sample.
///
/// Shape statistics are only computed from eight values upwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skewness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurtosis: Option<f64>,
}

/// Minimum sample size for skewness and kurtosis in summaries.
pub const MIN_SHAPE_SAMPLE: usize = 8;

/// Summarises `values`.
pub fn describe(values: &[f64]) -> Summary {
    let sorted = sorted(values);
    let shape = sorted.len() >= MIN_SHAPE_SAMPLE;
    Summary {
        count: sorted.len(),
        mean: mean(&sorted),
        std: std_dev(&sorted),
        min: sorted.first().copied(),
        q25: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
        skewness: if shape { skewness(&sorted) } else { None },
        kurtosis: if shape { excess_kurtosis(&sorted) } else { None },
    }
}
