use anyhow::{Context, Result};
use band_lib::io::csv::write_samples;
use band_lib::io::wire::LedColor;
use band_lib::signal::{Sample, SampleBuffer};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Display-only severity label attached to a simulated patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageColor {
    Red,
    Yellow,
    Green,
}

impl TriageColor {
    /// The bracelet LED command that mirrors this label.
    pub fn led(self) -> LedColor {
        match self {
            Self::Red => LedColor::Red,
            Self::Yellow => LedColor::Yellow,
            Self::Green => LedColor::Green,
        }
    }
}

/// A demo cohort loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct CohortSpec {
    pub name: String,
    #[serde(default)]
    pub seed: Option<u64>,
    pub patients: Vec<PatientSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSpec {
    pub name: String,
    pub age: u32,
    pub triage: TriageColor,
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    #[serde(default = "default_noise")]
    pub noise: f64,
    #[serde(default = "default_temp_c")]
    pub temp_c: f64,
}

fn default_bpm() -> f64 {
    72.0
}

fn default_noise() -> f64 {
    0.05
}

fn default_temp_c() -> f64 {
    36.6
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PatientRecord {
    pub name: String,
    pub age: u32,
    pub triage: TriageColor,
    pub file: String,
    pub samples: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CohortManifest {
    pub name: String,
    pub seed: u64,
    pub duration_s: f64,
    pub fs: f64,
    pub patients: Vec<PatientRecord>,
}

pub fn read_cohort_spec(path: &Path) -> Result<CohortSpec> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read cohort spec {}", path.display()))?;
    let spec: CohortSpec = toml::from_str(&contents)
        .with_context(|| format!("parsing cohort spec {}", path.display()))?;
    Ok(spec)
}

/// Synthesize one patient's vitals trace.
///
/// PPG is a baseline plus one pulse bump per beat, with per-beat interval
/// jitter and additive noise scaled by the patient's noise level; skin
/// temperature drifts slowly around the configured baseline. Deterministic
/// for a given rng state.
pub fn simulate_vitals(
    patient: &PatientSpec,
    duration_s: f64,
    fs: f64,
    rng: &mut StdRng,
) -> SampleBuffer {
    let n = (duration_s * fs).ceil() as usize;
    let mut buffer = SampleBuffer::with_capacity(n.max(1));
    let mean_ibi = 60.0 / patient.bpm.max(20.0);

    let mut beats = Vec::new();
    let mut t = 0.3;
    while t < duration_s + 1.0 {
        beats.push(t);
        let jitter = 1.0 + patient.noise * rng.gen_range(-0.5..=0.5);
        t += mean_ibi * jitter;
    }

    let amplitude = 120.0;
    for i in 0..n {
        let time = i as f64 / fs;
        let mut ppg = 512.0;
        for &beat in &beats {
            let width = 0.08;
            ppg += amplitude * (-0.5 * ((time - beat) / width).powi(2)).exp();
        }
        ppg += amplitude * patient.noise * rng.gen_range(-1.0..=1.0);
        let temp = patient.temp_c
            + 0.15 * (0.05 * std::f64::consts::TAU * time).sin()
            + 0.02 * rng.gen_range(-1.0..=1.0);
        buffer.push(Sample {
            t: time,
            ppg,
            temp: Some(temp),
        });
    }
    buffer
}

/// Generate one CSV per patient under `dir` plus a `cohort.json` manifest.
pub fn write_cohort(
    dir: &Path,
    spec: &CohortSpec,
    duration_s: f64,
    fs: f64,
) -> Result<CohortManifest> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let seed = spec.seed.unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut patients = Vec::new();
    for patient in &spec.patients {
        let buffer = simulate_vitals(patient, duration_s, fs, &mut rng);
        let file = format!("{}.csv", slug(&patient.name));
        write_samples(&dir.join(&file), &buffer, 0)?;
        patients.push(PatientRecord {
            name: patient.name.clone(),
            age: patient.age,
            triage: patient.triage,
            file,
            samples: buffer.len(),
        });
    }
    let manifest = CohortManifest {
        name: spec.name.clone(),
        seed,
        duration_s,
        fs,
        patients,
    };
    write_manifest(&dir.join("cohort.json"), &manifest)?;
    Ok(manifest)
}

pub fn write_manifest(path: &Path, manifest: &CohortManifest) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("creating manifest {}", path.display()))?;
    serde_json::to_writer_pretty(file, manifest)?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<CohortManifest> {
    let file =
        fs::File::open(path).with_context(|| format!("opening manifest {}", path.display()))?;
    let manifest = serde_json::from_reader::<_, CohortManifest>(file)
        .with_context(|| format!("parsing manifest {}", path.display()))?;
    Ok(manifest)
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use band_lib::detectors::ppg::{analyze, PpgDetectorConfig, VitalsOutcome};
    use tempfile::tempdir;

    fn patient(bpm: f64, noise: f64) -> PatientSpec {
        PatientSpec {
            name: "Test Patient".into(),
            age: 40,
            triage: TriageColor::Green,
            bpm,
            noise,
            temp_c: 36.6,
        }
    }

    #[test]
    fn seeded_simulation_is_reproducible() {
        let spec = patient(70.0, 0.05);
        let a = simulate_vitals(&spec, 10.0, 50.0, &mut StdRng::seed_from_u64(11));
        let b = simulate_vitals(&spec, 10.0, 50.0, &mut StdRng::seed_from_u64(11));
        assert_eq!(a.ppg(), b.ppg());
        assert_eq!(a.temperatures(), b.temperatures());
    }

    #[test]
    fn simulated_rate_is_recoverable() {
        let spec = patient(75.0, 0.01);
        let buffer = simulate_vitals(&spec, 20.0, 50.0, &mut StdRng::seed_from_u64(3));
        let outcome = analyze(
            &buffer.times(),
            &buffer.ppg(),
            &PpgDetectorConfig::default(),
        );
        match outcome {
            VitalsOutcome::Ready(report) => {
                assert!(
                    (report.bpm - 75.0).abs() < 6.0,
                    "expected ~75 BPM, got {}",
                    report.bpm
                );
            }
            VitalsOutcome::Insufficient { reason } => panic!("no estimate: {reason}"),
        }
    }

    #[test]
    fn cohort_bundle_round_trips() {
        let dir = tempdir().unwrap();
        let spec = CohortSpec {
            name: "demo-ward".into(),
            seed: Some(7),
            patients: vec![
                PatientSpec {
                    name: "John Doe".into(),
                    age: 45,
                    triage: TriageColor::Green,
                    bpm: 72.0,
                    noise: 0.05,
                    temp_c: 36.6,
                },
                PatientSpec {
                    name: "Jane Smith".into(),
                    age: 52,
                    triage: TriageColor::Red,
                    bpm: 110.0,
                    noise: 0.1,
                    temp_c: 38.1,
                },
            ],
        };
        let manifest = write_cohort(dir.path(), &spec, 5.0, 50.0).unwrap();
        assert_eq!(manifest.patients.len(), 2);
        assert!(dir.path().join("john-doe.csv").exists());
        assert!(dir.path().join("jane-smith.csv").exists());

        let reloaded = read_manifest(&dir.path().join("cohort.json")).unwrap();
        assert_eq!(reloaded.name, "demo-ward");
        assert_eq!(reloaded.patients[1].triage, TriageColor::Red);
        assert_eq!(reloaded.patients[0].samples, 250);
    }

    #[test]
    fn cohort_spec_parses_from_toml() {
        let text = r#"
            name = "demo"
            seed = 9
            [[patients]]
            name = "Alice Johnson"
            age = 38
            triage = "yellow"
        "#;
        let spec: CohortSpec = toml::from_str(text).unwrap();
        assert_eq!(spec.patients.len(), 1);
        assert_eq!(spec.patients[0].triage, TriageColor::Yellow);
        assert_eq!(spec.patients[0].bpm, 72.0);
    }

    #[test]
    fn triage_colors_map_to_led_commands() {
        assert_eq!(TriageColor::Red.led(), LedColor::Red);
        assert_eq!(TriageColor::Yellow.led(), LedColor::Yellow);
        assert_eq!(TriageColor::Green.led(), LedColor::Green);
    }

    #[test]
    fn slug_flattens_names() {
        assert_eq!(slug("John Doe"), "john-doe");
        assert_eq!(slug("  Alice   Johnson "), "alice-johnson");
    }
}
