use crate::signal::IbiSeries;
use serde::{Deserialize, Serialize};

/// Time-domain HRV summary over one window of inter-beat intervals.
///
/// All figures are in milliseconds. SDNN is the population standard
/// deviation of the intervals; RMSSD is the root-mean-square of successive
/// interval differences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HrvSummary {
    pub n: usize,
    pub mean_ibi_ms: f64,
    pub sdnn_ms: f64,
    pub rmssd_ms: f64,
}

pub fn hrv_summary(ibi: &IbiSeries) -> HrvSummary {
    let n = ibi.ibi.len();
    let intervals_ms: Vec<f64> = ibi.ibi.iter().map(|s| s * 1000.0).collect();
    let mean_ibi_ms = if n > 0 {
        intervals_ms.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn_ms = if n > 0 {
        let var = intervals_ms
            .iter()
            .map(|x| (x - mean_ibi_ms).powi(2))
            .sum::<f64>()
            / n as f64;
        var.sqrt()
    } else {
        0.0
    };
    let rmssd_ms = if n > 1 {
        let sq_diffs = intervals_ms
            .windows(2)
            .map(|w| (w[1] - w[0]).powi(2))
            .sum::<f64>();
        (sq_diffs / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    HrvSummary {
        n,
        mean_ibi_ms,
        sdnn_ms,
        rmssd_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_train_has_zero_variability() {
        let ibi = IbiSeries {
            ibi: vec![0.8; 12],
        };
        let summary = hrv_summary(&ibi);
        assert_eq!(summary.n, 12);
        assert!((summary.mean_ibi_ms - 800.0).abs() < 1e-9);
        assert_eq!(summary.sdnn_ms, 0.0);
        assert_eq!(summary.rmssd_ms, 0.0);
    }

    #[test]
    fn sdnn_is_the_population_deviation() {
        let ibi = IbiSeries {
            ibi: vec![0.7, 0.9],
        };
        let summary = hrv_summary(&ibi);
        // mean 800 ms, deviations +/-100 ms, population sd = 100 ms
        assert!((summary.sdnn_ms - 100.0).abs() < 1e-9);
        assert!((summary.rmssd_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn empty_series_stays_at_zero() {
        let summary = hrv_summary(&IbiSeries { ibi: Vec::new() });
        assert_eq!(summary.n, 0);
        assert_eq!(summary.mean_ibi_ms, 0.0);
        assert_eq!(summary.sdnn_ms, 0.0);
        assert_eq!(summary.rmssd_ms, 0.0);
    }

    #[test]
    fn alternating_intervals() {
        let ibi = IbiSeries {
            ibi: vec![0.8, 0.9, 0.8, 0.9],
        };
        let summary = hrv_summary(&ibi);
        assert!((summary.mean_ibi_ms - 850.0).abs() < 1e-9);
        assert!((summary.sdnn_ms - 50.0).abs() < 1e-9);
        assert!((summary.rmssd_ms - 100.0).abs() < 1e-9);
    }
}
