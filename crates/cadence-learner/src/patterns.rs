//! Histogram maths for activity patterns and hourly outcome predictions.

use std::collections::VecDeque;

use crate::types::OptimalHour;

pub const HOURS: usize = 24;
pub const DAYS: usize = 7;

/// `bucket = bucket × decay + new × adaptation`, for every bucket.
pub fn decay_update(buckets: &mut [f64], new_counts: &[u32], decay: f64, adaptation: f64) {
    for (bucket, new) in buckets.iter_mut().zip(new_counts) {
        *bucket = *bucket * decay + *new as f64 * adaptation;
    }
}

/// Population variance of the histogram after dividing by its mean.
/// `None` for an empty (all-zero) histogram.
pub fn normalized_variance(buckets: &[f64]) -> Option<f64> {
    if buckets.is_empty() {
        return None;
    }
    let n = buckets.len() as f64;
    let mean = buckets.iter().sum::<f64>() / n;
    if mean <= f64::EPSILON {
        return None;
    }
    let var = buckets
        .iter()
        .map(|b| {
            let d = b / mean - 1.0;
            d * d
        })
        .sum::<f64>()
        / n;
    Some(var)
}

/// `1 / (1 + combined variance)` over the hourly and daily histograms.
/// 0 until both histograms hold data.
pub fn pattern_confidence(hourly: &[f64], daily: &[f64]) -> f64 {
    match (normalized_variance(hourly), normalized_variance(daily)) {
        (Some(h), Some(d)) => 1.0 / (1.0 + (h + d) / 2.0),
        _ => 0.0,
    }
}

/// Bucket indexes above the mean, largest first.
pub fn peaks(buckets: &[f64]) -> Vec<u32> {
    if buckets.is_empty() {
        return Vec::new();
    }
    let mean = buckets.iter().sum::<f64>() / buckets.len() as f64;
    let mut idx: Vec<usize> = (0..buckets.len()).filter(|i| buckets[*i] > mean).collect();
    idx.sort_by(|a, b| buckets[*b].total_cmp(&buckets[*a]));
    idx.into_iter().map(|i| i as u32).collect()
}

/// Success/failure samples bucketed by hour of day, each bucket capped.
#[derive(Debug, Clone)]
pub struct HourlyOutcomes {
    hours: Vec<VecDeque<bool>>,
    cap: usize,
}

impl HourlyOutcomes {
    pub fn new(cap: usize) -> Self {
        Self {
            hours: vec![VecDeque::new(); HOURS],
            cap: cap.max(1),
        }
    }

    pub fn from_samples(samples: Vec<Vec<bool>>, cap: usize) -> Self {
        let mut out = Self::new(cap);
        for (hour, samples) in samples.into_iter().take(HOURS).enumerate() {
            for s in samples {
                out.record(hour, s);
            }
        }
        out
    }

    pub fn record(&mut self, hour: usize, success: bool) {
        let bucket = &mut self.hours[hour % HOURS];
        bucket.push_back(success);
        while bucket.len() > self.cap {
            bucket.pop_front();
        }
    }

    pub fn samples(&self) -> Vec<Vec<bool>> {
        self.hours.iter().map(|h| h.iter().copied().collect()).collect()
    }

    pub fn total(&self) -> usize {
        self.hours.iter().map(VecDeque::len).sum()
    }

    /// Success rate and sample count per hour; `None` for empty hours.
    pub fn rates(&self) -> Vec<Option<(f64, usize)>> {
        self.hours
            .iter()
            .map(|h| {
                if h.is_empty() {
                    None
                } else {
                    let ok = h.iter().filter(|s| **s).count() as f64;
                    Some((ok / h.len() as f64, h.len()))
                }
            })
            .collect()
    }

    /// Hours whose rate exceeds `ratio ×` the average over hours with data,
    /// keeping only those whose confidence reaches `threshold`.
    pub fn optimal_hours(&self, ratio: f64, full_samples: usize, threshold: f64) -> Vec<OptimalHour> {
        let rates = self.rates();
        let observed: Vec<f64> = rates.iter().flatten().map(|(r, _)| *r).collect();
        if observed.is_empty() {
            return Vec::new();
        }
        let average = observed.iter().sum::<f64>() / observed.len() as f64;
        let full = full_samples.max(1) as f64;

        let mut hours: Vec<OptimalHour> = rates
            .into_iter()
            .enumerate()
            .filter_map(|(hour, rate)| {
                let (success_rate, samples) = rate?;
                if success_rate <= average * ratio {
                    return None;
                }
                let confidence = success_rate * (samples as f64 / full).min(1.0);
                (confidence >= threshold).then_some(OptimalHour {
                    hour: hour as u32,
                    success_rate,
                    samples,
                    confidence,
                })
            })
            .collect();
        hours.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        hours
    }
}
