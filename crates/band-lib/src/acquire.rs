use crate::io::wire;
use crate::signal::{Sample, SampleBuffer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::time::{Duration, Instant};

/// What a line source produced on one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePoll {
    /// A complete line, terminator stripped.
    Line(String),
    /// Nothing buffered yet; the caller should sleep and poll again.
    Idle,
    /// The source is exhausted and will not produce more lines.
    Closed,
}

/// A line-oriented sample source. The serial port is one implementation; any
/// `BufRead` is another, which keeps the read loop testable without hardware.
pub trait LineSource {
    fn poll_line(&mut self) -> Result<SourcePoll>;
}

/// Replays lines from any buffered reader, e.g. a file or an in-memory
/// cursor. Reports `Closed` at end of input.
pub struct ReaderSource<R: BufRead> {
    inner: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn poll_line(&mut self) -> Result<SourcePoll> {
        let mut line = String::new();
        let n = self.inner.read_line(&mut line)?;
        if n == 0 {
            return Ok(SourcePoll::Closed);
        }
        Ok(SourcePoll::Line(line.trim_end().to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecorderConfig {
    /// Rolling window size shared by the time/PPG/temperature sequences.
    pub capacity: usize,
    /// Sleep between polls when the source has nothing buffered.
    pub poll_interval: Duration,
    /// Total read duration; `None` reads until the source closes or the
    /// process is interrupted.
    pub duration: Option<Duration>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capacity: 200,
            poll_interval: Duration::from_millis(10),
            duration: None,
        }
    }
}

/// Counters for one completed read session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionStats {
    pub accepted: u64,
    pub discarded: u64,
}

/// Warm-up means captured before a measurement session, as reported by the
/// bracelet while the wearer is at rest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Calibration {
    pub mean_ppg: f64,
    pub mean_temp: Option<f64>,
}

impl Calibration {
    pub fn from_buffer(buffer: &SampleBuffer) -> Option<Self> {
        if buffer.is_empty() {
            return None;
        }
        let ppg = buffer.ppg();
        let mean_ppg = ppg.iter().sum::<f64>() / ppg.len() as f64;
        let temps = buffer.temperatures();
        let mean_temp = crate::metrics::temp::mean_temperature(&temps);
        Some(Self { mean_ppg, mean_temp })
    }
}

/// Single-threaded, poll-driven sample collector.
///
/// One control flow blocks on a fixed delay between polls; the buffer is
/// owned exclusively by this recorder and is not meant to be shared across
/// threads. Timestamps are wall-clock deltas from the moment `run` is
/// called, so they are non-decreasing across one session.
pub struct Recorder {
    buffer: SampleBuffer,
    config: RecorderConfig,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            buffer: SampleBuffer::with_capacity(config.capacity),
            config,
        }
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> SampleBuffer {
        self.buffer
    }

    /// Drain the source until it closes or the configured duration elapses.
    ///
    /// Malformed lines are logged and skipped; they leave the buffer
    /// untouched and never end the session.
    pub fn run(&mut self, source: &mut dyn LineSource) -> Result<SessionStats> {
        let started = Instant::now();
        let mut stats = SessionStats {
            accepted: 0,
            discarded: 0,
        };
        loop {
            if let Some(duration) = self.config.duration {
                if started.elapsed() >= duration {
                    break;
                }
            }
            match source.poll_line()? {
                SourcePoll::Line(line) => match wire::parse_line(&line) {
                    Ok(reading) => {
                        self.buffer.push(Sample {
                            t: started.elapsed().as_secs_f64(),
                            ppg: reading.ppg,
                            temp: reading.temp,
                        });
                        stats.accepted += 1;
                    }
                    Err(err) => {
                        log::warn!("discarding line {line:?}: {err}");
                        stats.discarded += 1;
                    }
                },
                SourcePoll::Idle => std::thread::sleep(self.config.poll_interval),
                SourcePoll::Closed => break,
            }
        }
        Ok(stats)
    }

    /// Bounded warm-up read that yields resting-state means for later
    /// comparison. Returns `None` when the source produced nothing.
    pub fn calibrate(&mut self, source: &mut dyn LineSource) -> Result<Option<Calibration>> {
        self.run(source)?;
        let calibration = Calibration::from_buffer(&self.buffer);
        self.buffer.clear();
        Ok(calibration)
    }
}
