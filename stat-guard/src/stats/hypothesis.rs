//! Hypothesis tests and power analysis.

use super::descriptive::{mean, median, sorted, variance};
use super::distributions::{
    f_sf, kolmogorov_sf, normal_cdf, normal_ppf, normal_sf, student_t_two_sided,
};
use serde::Serialize;
use std::f64::consts::PI;

/// Statistic and p-value of a test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestResult {
    /// Returns true if `p_value < alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Largest sample the Shapiro-Wilk approximation is valid for.
pub const SHAPIRO_MAX_N: usize = 5000;

fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk normality test (Royston's approximation).
///
/// Valid for 3 to 5000 values; returns `None` outside that range or for a
/// sample with zero range.
pub fn shapiro_wilk(values: &[f64]) -> Option<TestResult> {
    let n = values.len();
    if !(3..=SHAPIRO_MAX_N).contains(&n) {
        return None;
    }
    let x = sorted(values);
    let range = x[n - 1] - x[0];
    if range <= 0.0 {
        return None;
    }

    let coefficients = shapiro_coefficients(n);
    let mean = mean(&x)?;
    let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = coefficients.iter().zip(&x).map(|(a, v)| a * v).sum();
    let w = (numerator * numerator / ss).min(1.0);

    Some(TestResult {
        statistic: w,
        p_value: shapiro_p_value(w, n),
    })
}

fn shapiro_coefficients(n: usize) -> Vec<f64> {
    const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
    const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];

    if n == 3 {
        let a = 0.5_f64.sqrt();
        return vec![-a, 0.0, a];
    }

    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal_ppf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let m_sq: f64 = m.iter().map(|v| v * v).sum();
    let u = 1.0 / nf.sqrt();

    let mut a = vec![0.0; n];
    let a_n = m[n - 1] / m_sq.sqrt() + poly(&C1, u);
    if n > 5 {
        let a_n1 = m[n - 2] / m_sq.sqrt() + poly(&C2, u);
        let phi = (m_sq - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2));
        for i in 2..n - 2 {
            a[i] = m[i] / phi.sqrt();
        }
        a[n - 2] = a_n1;
        a[1] = -a_n1;
    } else {
        let phi = (m_sq - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2));
        for i in 1..n - 1 {
            a[i] = m[i] / phi.sqrt();
        }
    }
    a[n - 1] = a_n;
    a[0] = -a_n;
    a
}

fn shapiro_p_value(w: f64, n: usize) -> f64 {
    if w >= 1.0 {
        return 1.0;
    }
    let nf = n as f64;

    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - 0.75_f64.sqrt().asin());
        return p.clamp(0.0, 1.0);
    }

    let z = if n <= 11 {
        let gamma = poly(&[-2.273, 0.459], nf);
        let m = poly(&[0.544, -0.399_78, 0.025_054, -6.714e-4], nf);
        let s = poly(&[1.3822, -0.778_57, 0.062_767, -0.002_032_2], nf).exp();
        let log_term = (1.0 - w).ln();
        if log_term >= gamma {
            return 0.0;
        }
        let y = -(gamma - log_term).ln();
        (y - m) / s
    } else {
        let ln_n = nf.ln();
        let m = poly(&[-1.5861, -0.310_82, -0.083_751, 0.003_891_5], ln_n);
        let s = poly(&[-0.4803, -0.082_676, 0.003_030_2], ln_n).exp();
        ((1.0 - w).ln() - m) / s
    };
    normal_sf(z).clamp(0.0, 1.0)
}

/// Levene's test for equal variances, centred on group medians
/// (Brown-Forsythe variant).
///
/// Needs at least two groups, each with at least two values. Returns `None`
/// when the deviations have no within-group spread.
pub fn levene(groups: &[&[f64]]) -> Option<TestResult> {
    let k = groups.len();
    if k < 2 || groups.iter().any(|g| g.len() < 2) {
        return None;
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|group| {
            let center = median(group).unwrap_or_default();
            group.iter().map(|v| (v - center).abs()).collect()
        })
        .collect();

    let total: usize = deviations.iter().map(Vec::len).sum();
    let group_means: Vec<f64> = deviations.iter().filter_map(|d| mean(d)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.iter().map(|z| (z - m).powi(2)).sum::<f64>())
        .sum();
    if within <= 0.0 {
        return None;
    }

    let df1 = (k - 1) as f64;
    let df2 = (total - k) as f64;
    let statistic = (df2 / df1) * between / within;
    Some(TestResult {
        statistic,
        p_value: f_sf(statistic, df1, df2),
    })
}

/// Two-sample Student t-test with pooled variance.
pub fn t_test(a: &[f64], b: &[f64]) -> Option<TestResult> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * variance(a)? + (n2 - 1.0) * variance(b)?) / df;
    if pooled <= 0.0 {
        return None;
    }
    let statistic = (mean(a)? - mean(b)?) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    Some(TestResult {
        statistic,
        p_value: student_t_two_sided(statistic, df),
    })
}

/// Two-sample Kolmogorov-Smirnov test with the asymptotic p-value.
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Option<TestResult> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let a = sorted(a);
    let b = sorted(b);
    let (n1, n2) = (a.len(), b.len());

    // Walk both sorted samples, evaluating the CDF gap after each distinct value.
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = a[i].min(b[j]);
        while i < n1 && a[i] <= x {
            i += 1;
        }
        while j < n2 && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 as f64 - j as f64 / n2 as f64).abs());
    }

    let en = (n1 as f64 * n2 as f64 / (n1 + n2) as f64).sqrt();
    Some(TestResult {
        statistic: d,
        p_value: kolmogorov_sf((en + 0.12 + 0.11 / en) * d),
    })
}

/// Power of a two-sided, two-sample test of a standardised effect.
///
/// Uses the normal approximation with `n2 = n1 * ratio`.
pub fn two_sample_power(effect_size: f64, n1: f64, ratio: f64, alpha: f64) -> f64 {
    let n2 = n1 * ratio;
    if n1 <= 0.0 || n2 <= 0.0 {
        return 0.0;
    }
    let noncentrality = effect_size.abs() * (n1 * n2 / (n1 + n2)).sqrt();
    let critical = normal_ppf(1.0 - alpha / 2.0);
    (normal_cdf(noncentrality - critical) + normal_cdf(-noncentrality - critical)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_shapiro_wilk_reference() {
        // Classic textbook sample with one large value: W = 0.789, p = 0.0067.
        let values = [
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let result = shapiro_wilk(&values).unwrap();
        assert!(close(result.statistic, 0.789, 1e-3), "{result:?}");
        assert!(close(result.p_value, 0.0067, 5e-4), "{result:?}");
    }

    #[test]
    fn test_shapiro_wilk_uniform_grid_looks_normal_enough() {
        let values: Vec<f64> = (0..50_i32).map(f64::from).collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.statistic > 0.9);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_shapiro_wilk_rejects_exponential_shape() {
        let values: Vec<f64> = (1..=200_i32).map(|i| (f64::from(i) / 201.0).ln().abs().powi(3)).collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.p_value < 0.001, "{result:?}");
    }

    #[test]
    fn test_shapiro_wilk_limits() {
        assert!(shapiro_wilk(&[1.0, 2.0]).is_none());
        assert!(shapiro_wilk(&[3.0; 10]).is_none());
        let three = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!(close(three.statistic, 1.0, 1e-9));
    }

    #[test]
    fn test_levene() {
        let equal = [1.0, 2.0, 3.0, 4.0, 5.0];
        let shifted = [11.0, 12.0, 13.0, 14.0, 15.0];
        let result = levene(&[&equal, &shifted]).unwrap();
        assert!(close(result.statistic, 0.0, 1e-12));
        assert!(close(result.p_value, 1.0, 1e-9));

        let wide = [-40.0, -20.0, 0.0, 20.0, 40.0, -35.0, 35.0, 10.0];
        let narrow = [-1.0, -0.5, 0.0, 0.5, 1.0, -0.2, 0.2, 0.7];
        let result = levene(&[&wide, &narrow]).unwrap();
        assert!(result.p_value < 0.01, "{result:?}");

        assert!(levene(&[&equal]).is_none());
    }

    #[test]
    fn test_t_test() {
        // scipy.stats.ttest_ind([1, 2, 3, 4], [3, 4, 5, 6]): t = -2.1909, p = 0.0710
        let result = t_test(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]).unwrap();
        assert!(close(result.statistic, -2.1909, 1e-4));
        assert!(close(result.p_value, 0.0710, 1e-3));
        assert!(t_test(&[1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_ks_two_sample() {
        let a: Vec<f64> = (0..100_i32).map(f64::from).collect();
        let same = ks_two_sample(&a, &a).unwrap();
        assert_eq!(same.statistic, 0.0);
        assert_eq!(same.p_value, 1.0);

        let shifted: Vec<f64> = (50..150_i32).map(f64::from).collect();
        let result = ks_two_sample(&a, &shifted).unwrap();
        assert!(close(result.statistic, 0.5, 1e-12));
        assert!(result.p_value < 1e-6);
    }

    #[test]
    fn test_power() {
        // d = 0.5 with 64 per group gives roughly 80% power at alpha 0.05.
        let power = two_sample_power(0.5, 64.0, 1.0, 0.05);
        assert!(close(power, 0.80, 0.02), "{power}");
        assert!(two_sample_power(0.2, 10.0, 1.0, 0.05) < 0.2);
        assert_eq!(two_sample_power(0.5, 0.0, 1.0, 0.05), 0.0);
    }
}
