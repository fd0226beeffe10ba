use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;

use crate::signal::{Sample, SampleBuffer};

/// Write the retained window to CSV: header `Time,PPG` or
/// `Time,PPG,Temperature`, time to 3 decimal places, temperature to 2, PPG
/// as received. `discard_leading` drops warm-up rows from the front, the way
/// the firmware's first readings are discarded before persisting.
pub fn write_samples(path: &Path, buffer: &SampleBuffer, discard_leading: usize) -> Result<()> {
    let samples = buffer.samples();
    let start = discard_leading.min(samples.len());
    let retained = &samples[start..];
    let with_temperature = retained.iter().any(|s| s.temp.is_some());

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    if with_temperature {
        writer.write_record(["Time", "PPG", "Temperature"])?;
    } else {
        writer.write_record(["Time", "PPG"])?;
    }
    for sample in retained {
        let time = format!("{:.3}", sample.t);
        let ppg = sample.ppg.to_string();
        if with_temperature {
            let temp = sample
                .temp
                .map(|t| format!("{t:.2}"))
                .unwrap_or_default();
            writer.write_record([time, ppg, temp])?;
        } else {
            writer.write_record([time, ppg])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a sample CSV back into memory. Column order is not assumed; headers
/// are matched case-insensitively.
pub fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers().context("reading header")?.clone();
    let time_idx = locate_column(&headers, "Time")?;
    let ppg_idx = locate_column(&headers, "PPG")?;
    let temp_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("Temperature"));

    let mut samples = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        let t: f64 = field(&record, time_idx, row, "Time")?;
        let ppg: f64 = field(&record, ppg_idx, row, "PPG")?;
        let temp = match temp_idx.and_then(|idx| record.get(idx)) {
            Some(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse()
                    .with_context(|| format!("parsing Temperature in row {}", row + 1))?,
            ),
            _ => None,
        };
        samples.push(Sample { t, ppg, temp });
    }
    Ok(samples)
}

fn locate_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .with_context(|| format!("missing {name} column"))
}

fn field(record: &csv::StringRecord, idx: usize, row: usize, name: &str) -> Result<f64> {
    record
        .get(idx)
        .with_context(|| format!("missing {name} in row {}", row + 1))?
        .trim()
        .parse()
        .with_context(|| format!("parsing {name} in row {}", row + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn buffer_with_temps(n: usize) -> SampleBuffer {
        let mut buf = SampleBuffer::with_capacity(n);
        for i in 0..n {
            buf.push(Sample {
                t: i as f64 * 0.0214,
                ppg: 500.0 + (i as f64) * 1.5,
                temp: Some(36.0 + i as f64 * 0.013),
            });
        }
        buf
    }

    #[test]
    fn round_trip_preserves_count_and_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vitals.csv");
        let buf = buffer_with_temps(25);
        write_samples(&path, &buf, 0).unwrap();
        let samples = read_samples(&path).unwrap();
        assert_eq!(samples.len(), 25);
        for (read, original) in samples.iter().zip(buf.samples()) {
            assert!((read.t - original.t).abs() <= 5e-4);
            assert_eq!(read.ppg, original.ppg);
            let temp = read.temp.unwrap();
            assert!((temp - original.temp.unwrap()).abs() <= 5e-3);
        }
    }

    #[test]
    fn ppg_only_file_has_two_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ppg.csv");
        let mut buf = SampleBuffer::with_capacity(4);
        for i in 0..4 {
            buf.push(Sample {
                t: i as f64,
                ppg: 600.0,
                temp: None,
            });
        }
        write_samples(&path, &buf, 0).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Time,PPG\n"));
        let samples = read_samples(&path).unwrap();
        assert!(samples.iter().all(|s| s.temp.is_none()));
    }

    #[test]
    fn discard_leading_drops_warm_up_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trimmed.csv");
        let buf = buffer_with_temps(12);
        write_samples(&path, &buf, 5).unwrap();
        let samples = read_samples(&path).unwrap();
        assert_eq!(samples.len(), 7);
        assert!((samples[0].t - 5.0 * 0.0214).abs() <= 5e-4);
    }

    #[test]
    fn discard_larger_than_buffer_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let buf = buffer_with_temps(3);
        write_samples(&path, &buf, 10).unwrap();
        assert!(read_samples(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_ppg_column_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Time,Pulse\n0.0,1.0\n").unwrap();
        assert!(read_samples(&path).is_err());
    }
}
