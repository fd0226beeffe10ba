use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One decoded reading from the bracelet: seconds since the session started,
/// the raw PPG level, and skin temperature when the firmware reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub ppg: f64,
    pub temp: Option<f64>,
}

/// Fixed-capacity rolling window over the most recent samples.
///
/// Time, PPG, and temperature are kept as three parallel sequences sharing one
/// capacity; pushing into a full buffer drops the oldest sample from all
/// three, so the sequences never diverge in length.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    times: VecDeque<f64>,
    ppg: VecDeque<f64>,
    temps: VecDeque<Option<f64>>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            times: VecDeque::with_capacity(capacity),
            ppg: VecDeque::with_capacity(capacity),
            temps: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ppg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ppg.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ppg.len() == self.capacity
    }

    pub fn push(&mut self, sample: Sample) {
        if self.is_full() {
            self.times.pop_front();
            self.ppg.pop_front();
            self.temps.pop_front();
        }
        self.times.push_back(sample.t);
        self.ppg.push_back(sample.ppg);
        self.temps.push_back(sample.temp);
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.ppg.clear();
        self.temps.clear();
    }

    /// Contiguous copy of the retained timestamps, oldest first.
    pub fn times(&self) -> Vec<f64> {
        self.times.iter().copied().collect()
    }

    /// Contiguous copy of the retained PPG levels, oldest first.
    pub fn ppg(&self) -> Vec<f64> {
        self.ppg.iter().copied().collect()
    }

    /// Temperature readings that were actually present, oldest first.
    pub fn temperatures(&self) -> Vec<f64> {
        self.temps.iter().filter_map(|t| *t).collect()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.times
            .iter()
            .zip(self.ppg.iter())
            .zip(self.temps.iter())
            .map(|((&t, &ppg), &temp)| Sample { t, ppg, temp })
            .collect()
    }

    pub fn last(&self) -> Option<Sample> {
        let t = *self.times.back()?;
        let ppg = *self.ppg.back()?;
        let temp = *self.temps.back()?;
        Some(Sample { t, ppg, temp })
    }
}

/// Indices into a PPG window where a beat was detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peaks {
    pub indices: Vec<usize>,
}

impl Peaks {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Map peak indices to their timestamps. Indices past the end of `times`
    /// are skipped rather than panicking.
    pub fn times(&self, times: &[f64]) -> Vec<f64> {
        self.indices
            .iter()
            .filter_map(|&i| times.get(i).copied())
            .collect()
    }
}

/// Inter-beat intervals in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IbiSeries {
    pub ibi: Vec<f64>,
}

impl IbiSeries {
    /// Successive differences of beat timestamps.
    pub fn from_peak_times(peak_times: &[f64]) -> Self {
        let ibi = peak_times.windows(2).map(|w| w[1] - w[0]).collect();
        Self { ibi }
    }

    pub fn len(&self) -> usize {
        self.ibi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ibi.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.ibi.is_empty() {
            return None;
        }
        Some(self.ibi.iter().sum::<f64>() / self.ibi.len() as f64)
    }
}
