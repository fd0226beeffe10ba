use crate::{
    metrics::hrv::{hrv_summary, HrvSummary},
    signal::{IbiSeries, Peaks},
};
use serde::{Deserialize, Serialize};

/// Parameters for the mean-threshold peak picker.
#[derive(Debug, Clone, Copy)]
pub struct PpgDetectorConfig {
    /// Minimum sample-index separation between accepted peaks.
    pub min_distance: usize,
    /// Samples required before estimation is attempted at all.
    pub min_samples: usize,
}

impl Default for PpgDetectorConfig {
    fn default() -> Self {
        Self {
            min_distance: 20,
            min_samples: 10,
        }
    }
}

/// Heart-rate and HRV figures for one analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsReport {
    pub bpm: f64,
    pub peak_count: usize,
    pub hrv: HrvSummary,
}

/// Outcome of a vitals estimation pass. Estimation never fails hard: every
/// shortfall resolves to [`VitalsOutcome::Insufficient`] with a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VitalsOutcome {
    Ready(VitalsReport),
    Insufficient { reason: String },
}

impl VitalsOutcome {
    fn insufficient(reason: &str) -> Self {
        Self::Insufficient {
            reason: reason.to_string(),
        }
    }

    pub fn report(&self) -> Option<&VitalsReport> {
        match self {
            Self::Ready(report) => Some(report),
            Self::Insufficient { .. } => None,
        }
    }
}

/// Local maxima whose value reaches the arithmetic mean of the current window
/// and which sit at least `min_distance` samples after the previously
/// accepted peak.
///
/// The threshold is recomputed from the window passed in, so a freshly
/// cleared or rotated buffer re-adapts as new samples arrive. No smoothing or
/// debouncing happens here; noisy input can produce false or missed peaks.
pub fn detect_peaks(ppg: &[f64], cfg: &PpgDetectorConfig) -> Peaks {
    if ppg.len() < 3 {
        return Peaks::from_indices(Vec::new());
    }
    let threshold = ppg.iter().sum::<f64>() / ppg.len() as f64;
    let mut indices = Vec::new();
    let mut last_accepted: Option<usize> = None;
    for i in 1..ppg.len() - 1 {
        if ppg[i] < threshold {
            continue;
        }
        if !(ppg[i] > ppg[i - 1] && ppg[i] >= ppg[i + 1]) {
            continue;
        }
        if let Some(last) = last_accepted {
            if i - last < cfg.min_distance {
                continue;
            }
        }
        indices.push(i);
        last_accepted = Some(i);
    }
    Peaks::from_indices(indices)
}

/// Estimate heart rate and HRV from one window of (time, PPG) pairs.
///
/// `times` and `ppg` must be the parallel sequences of a [`crate::signal::SampleBuffer`]
/// snapshot; mismatched lengths are treated as insufficient data rather than
/// an error.
pub fn analyze(times: &[f64], ppg: &[f64], cfg: &PpgDetectorConfig) -> VitalsOutcome {
    if times.len() != ppg.len() {
        return VitalsOutcome::insufficient("time and PPG sequences differ in length");
    }
    if ppg.len() < cfg.min_samples {
        return VitalsOutcome::insufficient("not enough samples");
    }
    let peaks = detect_peaks(ppg, cfg);
    if peaks.len() < 2 {
        return VitalsOutcome::insufficient("not enough peaks");
    }
    let peak_times = peaks.times(times);
    let ibi = IbiSeries::from_peak_times(&peak_times);
    let mean_ibi = match ibi.mean() {
        Some(mean) if mean > 0.0 => mean,
        _ => return VitalsOutcome::insufficient("degenerate inter-beat intervals"),
    };
    VitalsOutcome::Ready(VitalsReport {
        bpm: 60.0 / mean_ibi,
        peak_count: peaks.len(),
        hrv: hrv_summary(&ibi),
    })
}
