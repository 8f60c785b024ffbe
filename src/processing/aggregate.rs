use crate::config::AggregationConfig;

/// Heart-rate figures computed over the interval buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateSummary {
    pub bpm: f64,
    pub mean_ibi_ms: f64,
    pub rmssd_ms: f64,
    /// Number of intervals that passed the validity window.
    pub beats: usize,
}

/// Drops intervals outside the physiological window, and intervals that jump
/// more than `ibi_delta_max_ms` from the last accepted one.
pub fn valid_intervals<I>(intervals: I, config: &AggregationConfig) -> Vec<u32>
where
    I: IntoIterator<Item = u32>,
{
    let mut accepted: Vec<u32> = Vec::new();
    for ibi in intervals {
        if ibi < config.ibi_valid_min_ms || ibi > config.ibi_valid_max_ms {
            continue;
        }
        if let Some(&previous) = accepted.last() {
            if ibi.abs_diff(previous) > config.ibi_delta_max_ms {
                continue;
            }
        }
        accepted.push(ibi);
    }
    accepted
}

/// Root mean square of successive differences, 0 with fewer than two intervals.
pub fn rmssd(intervals: &[u32]) -> f64 {
    if intervals.len() < 2 {
        return 0.0;
    }
    let sum_of_squares: f64 = intervals
        .windows(2)
        .map(|pair| (pair[1] as f64 - pair[0] as f64).powi(2))
        .sum();
    (sum_of_squares / (intervals.len() - 1) as f64).sqrt()
}

/// Summarises the intervals, or `None` when none of them is valid.
pub fn summarize<I>(intervals: I, config: &AggregationConfig) -> Option<HeartRateSummary>
where
    I: IntoIterator<Item = u32>,
{
    let valid = valid_intervals(intervals, config);
    if valid.is_empty() {
        return None;
    }

    let mean_ibi_ms = valid.iter().map(|&ibi| ibi as f64).sum::<f64>() / valid.len() as f64;

    Some(HeartRateSummary {
        bpm: 60_000.0 / mean_ibi_ms,
        mean_ibi_ms,
        rmssd_ms: rmssd(&valid),
        beats: valid.len(),
    })
}
