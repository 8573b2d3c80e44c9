//! Descriptive statistics over integer, floating-point and duration sequences
//!
//! Every function is total: empty input yields a zero-valued result.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::Duration;
use common::rollups::{
    DurationPercentiles, DurationStatistics, FloatStatistics, IntStatistics, OutlierDetection,
    OutlierMethod, Percentiles, TrendAnalysis, TrendDirection,
};

const PERCENTILE_POINTS: [f64; 7] = [0.10, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99];

/// Slope magnitude a trend must exceed to be labelled
const TREND_SLOPE_THRESHOLD: f64 = 0.1;
/// Minimum |r| for a labelled trend
const TREND_CONFIDENCE_THRESHOLD: f64 = 0.5;

pub fn int_stats(values: &[i64]) -> IntStatistics {
    if values.is_empty() {
        return IntStatistics::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let as_float: Vec<f64> = sorted.iter().map(|&v| v as f64).collect();

    let count = values.len();
    let sum: i64 = values.iter().sum();
    let mean = sum as f64 / count as f64;
    let min = sorted[0];
    let max = sorted[count - 1];
    let variance = population_variance(&as_float, mean);

    IntStatistics {
        count,
        sum,
        mean,
        median: median(&as_float),
        mode: mode_by(values, |v| *v),
        min,
        max,
        range: max - min,
        variance,
        std_dev: variance.sqrt(),
        percentiles: percentile_set(&as_float),
    }
}

pub fn float_stats(values: &[f64]) -> FloatStatistics {
    if values.is_empty() {
        return FloatStatistics::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let min = sorted[0];
    let max = sorted[count - 1];
    let variance = population_variance(values, mean);
    let std_dev = variance.sqrt();

    FloatStatistics {
        count,
        sum,
        mean,
        median: median(&sorted),
        mode: mode_by(values, |v| v.to_bits()),
        min,
        max,
        range: max - min,
        variance,
        std_dev,
        skewness: skewness(values, mean, std_dev),
        kurtosis: kurtosis(values, mean, std_dev),
        percentiles: percentile_set(&sorted),
    }
}

/// Duration statistics, computed at millisecond resolution
pub fn duration_stats(values: &[Duration]) -> DurationStatistics {
    if values.is_empty() {
        return DurationStatistics::default();
    }

    let millis: Vec<i64> = values.iter().map(|d| d.num_milliseconds()).collect();
    let mut sorted = millis.clone();
    sorted.sort_unstable();
    let as_float: Vec<f64> = sorted.iter().map(|&v| v as f64).collect();

    let count = values.len();
    let sum: i64 = millis.iter().sum();
    let mean_ms = sum as f64 / count as f64;
    let min = sorted[0];
    let max = sorted[count - 1];

    let secs: Vec<f64> = millis.iter().map(|&ms| ms as f64 / 1000.0).collect();
    let variance_secs2 = population_variance(&secs, mean_ms / 1000.0);

    let p = percentile_set(&as_float);
    let ms = |v: f64| Duration::milliseconds(v.round() as i64);

    DurationStatistics {
        count,
        sum: Duration::milliseconds(sum),
        mean: ms(mean_ms),
        median: ms(median(&as_float)),
        mode: Duration::milliseconds(mode_by(&millis, |v| *v)),
        min: Duration::milliseconds(min),
        max: Duration::milliseconds(max),
        range: Duration::milliseconds(max - min),
        variance_secs2,
        std_dev: ms(variance_secs2.sqrt() * 1000.0),
        percentiles: DurationPercentiles {
            p10: ms(p.p10),
            p25: ms(p.p25),
            p50: ms(p.p50),
            p75: ms(p.p75),
            p90: ms(p.p90),
            p95: ms(p.p95),
            p99: ms(p.p99),
        },
    }
}

/// Interpolated percentile of an ascending sequence; `p` in [0, 1]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let index = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = index.floor() as usize;
            let upper = index.ceil() as usize;
            if lower == upper {
                return sorted[lower];
            }
            let weight = index - lower as f64;
            sorted[lower] * (1.0 - weight) + sorted[upper] * weight
        }
    }
}

fn percentile_set(sorted: &[f64]) -> Percentiles {
    let [p10, p25, p50, p75, p90, p95, p99] = PERCENTILE_POINTS.map(|p| percentile(sorted, p));
    Percentiles {
        p10,
        p25,
        p50,
        p75,
        p90,
        p95,
        p99,
    }
}

/// Median of an ascending sequence
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Most frequent value; ties go to the value seen first
fn mode_by<T: Copy, K: Eq + Hash>(values: &[T], key: impl Fn(&T) -> K) -> T {
    let counts = values.iter().fold(HashMap::new(), |mut acc, v| {
        *acc.entry(key(v)).or_insert(0usize) += 1;
        acc
    });
    let best = counts.values().copied().max().unwrap_or(0);
    values
        .iter()
        .find(|v| counts.get(&key(v)).copied() == Some(best))
        .copied()
        .unwrap_or(values[0])
}

fn population_variance(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn skewness(values: &[f64], mean: f64, std_dev: f64) -> f64 {
    if values.len() < 3 || std_dev == 0.0 {
        return 0.0;
    }
    values
        .iter()
        .map(|v| ((v - mean) / std_dev).powi(3))
        .sum::<f64>()
        / values.len() as f64
}

fn kurtosis(values: &[f64], mean: f64, std_dev: f64) -> f64 {
    if values.len() < 4 || std_dev == 0.0 {
        return 0.0;
    }
    let fourth = values
        .iter()
        .map(|v| ((v - mean) / std_dev).powi(4))
        .sum::<f64>()
        / values.len() as f64;
    fourth - 3.0
}

/// Tukey fences at Q1 - 1.5 IQR and Q3 + 1.5 IQR. Needs at least 4 values.
pub fn detect_outliers_iqr(values: &[f64]) -> OutlierDetection {
    let mut result = OutlierDetection {
        method: OutlierMethod::Iqr,
        threshold: 1.5,
        lower_bound: 0.0,
        upper_bound: 0.0,
        outliers: Vec::new(),
        outlier_indices: Vec::new(),
    };
    if values.len() < 4 {
        return result;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;
    result.lower_bound = q1 - 1.5 * iqr;
    result.upper_bound = q3 + 1.5 * iqr;

    collect_outside(values, &mut result);
    result
}

/// Values whose |z| exceeds `threshold`. Needs at least 2 values and non-zero spread.
pub fn detect_outliers_zscore(values: &[f64], threshold: f64) -> OutlierDetection {
    let mut result = OutlierDetection {
        method: OutlierMethod::ZScore,
        threshold,
        lower_bound: 0.0,
        upper_bound: 0.0,
        outliers: Vec::new(),
        outlier_indices: Vec::new(),
    };
    if values.len() < 2 {
        return result;
    }

    let stats = float_stats(values);
    result.lower_bound = stats.mean - threshold * stats.std_dev;
    result.upper_bound = stats.mean + threshold * stats.std_dev;
    if stats.std_dev == 0.0 {
        return result;
    }

    collect_outside(values, &mut result);
    result
}

fn collect_outside(values: &[f64], result: &mut OutlierDetection) {
    for (i, &v) in values.iter().enumerate() {
        if v < result.lower_bound || v > result.upper_bound {
            result.outliers.push(v);
            result.outlier_indices.push(i);
        }
    }
}

/// Ordinary least squares against the index 0..n-1
pub fn analyze_trend(series: &[f64]) -> TrendAnalysis {
    let n = series.len();
    if n < 2 {
        return TrendAnalysis::default();
    }

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = series.iter().sum::<f64>() / nf;

    let (sxy, sxx, syy) = series.iter().enumerate().fold(
        (0.0, 0.0, 0.0),
        |(sxy, sxx, syy), (i, &y)| {
            let dx = i as f64 - x_mean;
            let dy = y - y_mean;
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        },
    );

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let denom = (sxx * syy).sqrt();
    let correlation_coeff = if denom == 0.0 { 0.0 } else { sxy / denom };
    let confidence = correlation_coeff.abs();

    let trend = if slope.abs() > TREND_SLOPE_THRESHOLD && confidence > TREND_CONFIDENCE_THRESHOLD
    {
        if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        slope,
        intercept,
        correlation_coeff,
        trend,
        confidence,
    }
}
