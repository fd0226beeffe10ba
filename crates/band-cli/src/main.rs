use anyhow::{bail, Result};
use band_lib::{
    acquire::{Calibration, Recorder, RecorderConfig, SessionStats},
    detectors::ppg::{analyze, detect_peaks, PpgDetectorConfig, VitalsOutcome},
    io::{
        csv as csv_io,
        serial::{open_link, send_led_command, LinkConfig, SerialLineSource},
        wire::LedColor,
    },
    metrics::temp::mean_temperature,
    plot::{figure_from_ppg, figure_from_temperature, Figure},
    signal::SampleBuffer,
};
use band_sim::{read_cohort_spec, write_cohort};
use clap::{Parser, Subcommand, ValueEnum};
use plotters::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "band",
    version,
    about = "Triage bracelet tools: acquire, analyze, and simulate vitals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorArg {
    Red,
    Yellow,
    Green,
    Off,
}

impl From<ColorArg> for LedColor {
    fn from(value: ColorArg) -> Self {
        match value {
            ColorArg::Red => LedColor::Red,
            ColorArg::Yellow => LedColor::Yellow,
            ColorArg::Green => LedColor::Green,
            ColorArg::Off => LedColor::Off,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TraceKind {
    Ppg,
    Temperature,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire samples from the bracelet and report vitals
    Read {
        #[arg(long)]
        port: String,
        #[arg(long, default_value_t = 9600)]
        baud: u32,
        /// Read duration in seconds; omit to read until interrupted
        #[arg(long)]
        duration: Option<f64>,
        #[arg(long, default_value_t = 200)]
        buffer_size: usize,
        /// Warm-up seconds used to capture resting-state means before the session
        #[arg(long, default_value_t = 0.0)]
        calibrate: f64,
        /// Rows to drop from the front when saving
        #[arg(long, default_value_t = 0)]
        discard_leading: usize,
        /// Save retained samples as CSV
        #[arg(long)]
        out: Option<PathBuf>,
        /// Render the PPG trace as PNG
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Estimate heart rate and HRV from a sample CSV
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 20)]
        min_distance: usize,
    },
    /// Print detected peak indices for a sample CSV
    FindPeaks {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 20)]
        min_distance: usize,
    },
    /// Send an indicator color to the bracelet LED
    Led {
        #[arg(long)]
        port: String,
        #[arg(long, default_value_t = 9600)]
        baud: u32,
        #[arg(long)]
        color: ColorArg,
    },
    /// Generate a simulated patient cohort from a TOML spec
    Simulate {
        #[arg(long)]
        spec: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 30.0)]
        duration: f64,
        #[arg(long, default_value_t = 50.0)]
        fs: f64,
    },
    /// Render a sample CSV to PNG
    Plot {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value = "ppg")]
        kind: TraceKind,
        /// Moving-average window for the temperature overlay
        #[arg(long, default_value_t = 10)]
        window: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Read {
            port,
            baud,
            duration,
            buffer_size,
            calibrate,
            discard_leading,
            out,
            plot,
        } => cmd_read(
            &LinkConfig::new(port, baud),
            duration,
            buffer_size,
            calibrate,
            discard_leading,
            out.as_deref(),
            plot.as_deref(),
        )?,
        Commands::Analyze {
            input,
            min_distance,
        } => cmd_analyze(&input, min_distance)?,
        Commands::FindPeaks {
            input,
            min_distance,
        } => cmd_find_peaks(&input, min_distance)?,
        Commands::Led { port, baud, color } => {
            cmd_led(&LinkConfig::new(port, baud), color.into())?
        }
        Commands::Simulate {
            spec,
            out,
            duration,
            fs,
        } => cmd_simulate(&spec, &out, duration, fs)?,
        Commands::Plot {
            input,
            out,
            kind,
            window,
        } => cmd_plot(&input, &out, kind, window)?,
    }
    Ok(())
}

#[derive(Serialize)]
struct ReadOutput {
    stats: SessionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration: Option<Calibration>,
    #[serde(flatten)]
    vitals: VitalsOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean_temp_c: Option<f64>,
}

fn cmd_read(
    link: &LinkConfig,
    duration: Option<f64>,
    buffer_size: usize,
    calibrate: f64,
    discard_leading: usize,
    out: Option<&Path>,
    plot: Option<&Path>,
) -> Result<()> {
    let port = open_link(link)?;
    let mut source = SerialLineSource::new(port)?;

    let calibration = if calibrate > 0.0 {
        let mut warmup = Recorder::new(RecorderConfig {
            capacity: buffer_size,
            duration: Some(Duration::from_secs_f64(calibrate)),
            ..RecorderConfig::default()
        });
        warmup.calibrate(&mut source)?
    } else {
        None
    };

    let mut recorder = Recorder::new(RecorderConfig {
        capacity: buffer_size,
        duration: duration.map(Duration::from_secs_f64),
        ..RecorderConfig::default()
    });
    let stats = recorder.run(&mut source)?;
    let buffer = recorder.buffer();

    if let Some(path) = out {
        csv_io::write_samples(path, buffer, discard_leading)?;
    }
    if let Some(path) = plot {
        draw_figure(path, &figure_from_ppg(buffer, 1024))?;
    }

    let vitals = analyze(
        &buffer.times(),
        &buffer.ppg(),
        &PpgDetectorConfig::default(),
    );
    let output = ReadOutput {
        stats,
        calibration,
        vitals,
        mean_temp_c: mean_temperature(&buffer.temperatures()),
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

#[derive(Serialize)]
struct AnalyzeOutput {
    #[serde(flatten)]
    vitals: VitalsOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean_temp_c: Option<f64>,
}

fn load_buffer(input: &Path) -> Result<SampleBuffer> {
    let samples = csv_io::read_samples(input)?;
    let mut buffer = SampleBuffer::with_capacity(samples.len().max(1));
    for sample in samples {
        buffer.push(sample);
    }
    Ok(buffer)
}

fn cmd_analyze(input: &Path, min_distance: usize) -> Result<()> {
    let buffer = load_buffer(input)?;
    let cfg = PpgDetectorConfig {
        min_distance,
        ..PpgDetectorConfig::default()
    };
    let vitals = analyze(&buffer.times(), &buffer.ppg(), &cfg);
    let output = AnalyzeOutput {
        vitals,
        mean_temp_c: mean_temperature(&buffer.temperatures()),
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_find_peaks(input: &Path, min_distance: usize) -> Result<()> {
    let buffer = load_buffer(input)?;
    let cfg = PpgDetectorConfig {
        min_distance,
        ..PpgDetectorConfig::default()
    };
    let peaks = detect_peaks(&buffer.ppg(), &cfg);
    println!("{}", serde_json::to_string(&peaks)?);
    Ok(())
}

fn cmd_led(link: &LinkConfig, color: LedColor) -> Result<()> {
    let mut port = open_link(link)?;
    let response = send_led_command(port.as_mut(), color)?;
    match response {
        Some(line) => println!("{line}"),
        None => log::info!("no response from device"),
    }
    Ok(())
}

fn cmd_simulate(spec_path: &Path, out: &Path, duration: f64, fs: f64) -> Result<()> {
    let spec = read_cohort_spec(spec_path)?;
    let manifest = write_cohort(out, &spec, duration, fs)?;
    println!("{}", serde_json::to_string(&manifest)?);
    Ok(())
}

fn cmd_plot(input: &Path, out: &Path, kind: TraceKind, window: usize) -> Result<()> {
    let buffer = load_buffer(input)?;
    let fig = match kind {
        TraceKind::Ppg => figure_from_ppg(&buffer, 1024),
        TraceKind::Temperature => {
            if buffer.temperatures().is_empty() {
                bail!("{} has no temperature column", input.display());
            }
            figure_from_temperature(&buffer, window, 1024)
        }
    };
    draw_figure(out, &fig)?;
    Ok(())
}

fn draw_figure(path: &Path, fig: &Figure) -> Result<()> {
    let points: Vec<[f64; 2]> = fig
        .series
        .iter()
        .flat_map(|series| series.points.iter().copied())
        .collect();
    if points.is_empty() {
        bail!("nothing to plot");
    }
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for [x, y] in &points {
        x_min = x_min.min(*x);
        x_max = x_max.max(*x);
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }
    if x_min == x_max {
        x_max = x_min + 1.0;
    }
    if y_min == y_max {
        y_max = y_min + 1.0;
    }

    let root = BitMapBackend::new(path, (900, 480)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Trace".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(32)
        .y_label_area_size(48)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        let color = RGBColor(
            ((series.style.color.0 >> 16) & 0xFF) as u8,
            ((series.style.color.0 >> 8) & 0xFF) as u8,
            (series.style.color.0 & 0xFF) as u8,
        );
        chart
            .draw_series(LineSeries::new(
                series.points.iter().map(|p| (p[0], p[1])),
                &color,
            ))?
            .label(series.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
    }
    if fig.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}
