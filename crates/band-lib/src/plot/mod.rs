use serde::{Deserialize, Serialize};

use crate::metrics::temp::moving_average;
use crate::signal::SampleBuffer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Backend-neutral figure description; the CLI renders it with plotters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<LineSeries>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: LineSeries) {
        self.series.push(series);
    }
}

/// Keep at most `max_points` by bucketed subsampling; rendering backends do
/// not need every raw point of a long session.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// PPG trace over session time.
pub fn figure_from_ppg(buffer: &SampleBuffer, max_points: usize) -> Figure {
    let points: Vec<[f64; 2]> = buffer
        .times()
        .iter()
        .zip(buffer.ppg().iter())
        .map(|(&t, &v)| [t, v])
        .collect();
    let mut fig = Figure::new(Some("PPG signal".into()));
    fig.x.label = Some("Time (s)".into());
    fig.y.label = Some("PPG value".into());
    fig.add_series(LineSeries {
        name: "PPG".into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            color: Color(0x1F6FEB),
        },
    });
    fig
}

/// Raw temperature trace with a moving-average overlay, matching the
/// bracelet's slow thermal response.
pub fn figure_from_temperature(buffer: &SampleBuffer, window: usize, max_points: usize) -> Figure {
    let times = buffer.times();
    let temps = buffer.temperatures();
    let raw: Vec<[f64; 2]> = times
        .iter()
        .zip(temps.iter())
        .map(|(&t, &v)| [t, v])
        .collect();
    let mut fig = Figure::new(Some("Temperature".into()));
    fig.x.label = Some("Time (s)".into());
    fig.y.label = Some("Temperature (°C)".into());
    fig.add_series(LineSeries {
        name: "Raw".into(),
        points: decimate_points(&raw, max_points),
        style: Style {
            width: 1.0,
            color: Color(0xD73A49),
        },
    });
    let smoothed = moving_average(&temps, window);
    // Align smoothed values with the end of their averaging window.
    let offset = temps.len().saturating_sub(smoothed.len());
    let smoothed_points: Vec<[f64; 2]> = smoothed
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| times.get(i + offset).map(|&t| [t, v]))
        .collect();
    fig.add_series(LineSeries {
        name: "Moving average".into(),
        points: decimate_points(&smoothed_points, max_points),
        style: Style {
            width: 2.0,
            color: Color(0x2DA44E),
        },
    });
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Sample;

    fn filled_buffer(n: usize) -> SampleBuffer {
        let mut buf = SampleBuffer::with_capacity(n);
        for i in 0..n {
            buf.push(Sample {
                t: i as f64 * 0.02,
                ppg: 500.0 + i as f64,
                temp: Some(36.0 + i as f64 * 0.01),
            });
        }
        buf
    }

    #[test]
    fn decimation_caps_point_count() {
        let points: Vec<[f64; 2]> = (0..5000).map(|i| [i as f64, 0.0]).collect();
        let decimated = decimate_points(&points, 1024);
        assert!(decimated.len() <= 1024);
        assert_eq!(decimated[0], [0.0, 0.0]);
    }

    #[test]
    fn ppg_figure_has_one_series() {
        let fig = figure_from_ppg(&filled_buffer(100), 1024);
        assert_eq!(fig.series.len(), 1);
        assert_eq!(fig.series[0].points.len(), 100);
    }

    #[test]
    fn temperature_figure_overlays_moving_average() {
        let fig = figure_from_temperature(&filled_buffer(100), 10, 1024);
        assert_eq!(fig.series.len(), 2);
        assert_eq!(fig.series[0].points.len(), 100);
        assert_eq!(fig.series[1].points.len(), 91);
    }
}
