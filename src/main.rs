use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use cmb_explorer::data::ParamField;
use cmb_explorer::logging;
use cmb_explorer::processing::{CycleOutcome, UpdateController};
use cmb_explorer::rendering::CsvRenderer;
use cmb_explorer::settings::Settings;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineKind {
    Analytic,
    Class,
}

impl EngineKind {
    fn as_str(self) -> &'static str {
        match self {
            EngineKind::Analytic => "analytic",
            EngineKind::Class => "class",
        }
    }
}

/// Compute one lensed CMB TT spectrum and write it as CSV.
///
/// Parameters not given on the command line come from the settings file.
#[derive(Debug, Parser)]
#[command(name = "cmb", version, about)]
struct Args {
    /// Reduced Hubble constant
    #[arg(long = "hubble", allow_negative_numbers = true)]
    hubble: Option<f64>,

    /// Physical baryon density omega_b
    #[arg(long, allow_negative_numbers = true)]
    omega_b: Option<f64>,

    /// Physical cold dark matter density omega_cdm
    #[arg(long, allow_negative_numbers = true)]
    omega_cdm: Option<f64>,

    /// Scalar spectral index
    #[arg(long, allow_negative_numbers = true)]
    n_s: Option<f64>,

    /// Primordial amplitude times 1e9
    #[arg(long = "a-s-1e9", allow_negative_numbers = true)]
    a_s_1e9: Option<f64>,

    /// Solver backend
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Path to the CLASS executable, used with `--engine class`
    #[arg(long, env = "CMB_CLASS_BIN")]
    class_bin: Option<PathBuf>,

    /// CSV destination, `-` for stdout
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Settings file
    #[arg(long, default_value = Settings::FILE_NAME)]
    settings: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init_logging(logging::DEFAULT_LEVEL) {
        eprintln!("{e:#}");
    }

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// One cycle end to end. `Ok(false)` means the engine failed and the
/// message has already been printed.
fn run(args: Args) -> Result<bool> {
    let mut settings = if args.settings.exists() {
        Settings::load(&args.settings)?
    } else {
        Settings::default()
    };
    if let Some(kind) = args.engine {
        settings.backend = kind.as_str().to_string();
    }
    if let Some(bin) = &args.class_bin {
        settings.class_executable = bin.display().to_string();
    }

    let mut values = settings.slider_values();
    let overrides = [
        (ParamField::H, args.hubble),
        (ParamField::OmegaB, args.omega_b),
        (ParamField::OmegaCdm, args.omega_cdm),
        (ParamField::NS, args.n_s),
        (ParamField::AS1e9, args.a_s_1e9),
    ];
    for (field, value) in overrides {
        if let Some(v) = value {
            values.set(field, v);
        }
    }

    let backend = settings.backend();
    info!(engine = backend.name(), ?values, "computing spectrum");
    let mut controller = UpdateController::new(backend, CsvRenderer::new(Vec::new()));
    let outcome = controller.on_parameters_changed(&values);
    let (_, renderer) = controller.into_parts();
    let csv = renderer.into_inner()?;

    match outcome {
        CycleOutcome::Rendered { points, first_peak } => {
            write_output(&args.output, &csv)?;
            info!(points, "spectrum written");
            match first_peak {
                Some(p) => eprintln!("First acoustic peak: ell = {}, D_ell = {:.1} uK^2", p.ell, p.d_ell),
                None => warn!("no acoustic peak found in the plotted range"),
            }
            Ok(true)
        }
        CycleOutcome::Failed { message } => {
            eprintln!("{message}");
            Ok(false)
        }
    }
}

/// The destination is only opened once there is a spectrum to put in it.
fn write_output(output: &str, csv: &[u8]) -> Result<()> {
    let mut out: Box<dyn Write> = if output == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let file = File::create(output)
            .with_context(|| format!("Failed to create output file: {}", output))?;
        Box::new(BufWriter::new(file))
    };
    out.write_all(csv).context("Failed to write output")?;
    out.flush().context("Failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_negative_values() {
        let args = Args::try_parse_from([
            "cmb", "--hubble", "0.7", "--omega-cdm", "-0.1", "--engine", "class", "-o", "out.csv",
        ])
        .unwrap();
        assert_eq!(args.hubble, Some(0.7));
        assert_eq!(args.omega_cdm, Some(-0.1));
        assert!(matches!(args.engine, Some(EngineKind::Class)));
        assert_eq!(args.output, "out.csv");
        assert_eq!(args.settings, PathBuf::from(Settings::FILE_NAME));
    }

    #[test]
    fn rejects_unknown_engine() {
        assert!(Args::try_parse_from(["cmb", "--engine", "camb"]).is_err());
    }

    #[test]
    fn failed_cycle_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let args = Args::try_parse_from([
            "cmb",
            "--omega-b",
            "-1",
            "--engine",
            "analytic",
            "--settings",
            dir.path().join("none.ini").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(!run(args).unwrap());
        assert!(!output.exists(), "failed run left {} behind", output.display());
    }

    #[test]
    fn failed_cycle_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        std::fs::write(&output, "ell,d_ell_uk2\n2,1.0\n").unwrap();
        let args = Args::try_parse_from([
            "cmb",
            "--n-s",
            "1e6",
            "--settings",
            dir.path().join("none.ini").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(!run(args).unwrap());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "ell,d_ell_uk2\n2,1.0\n");
    }

    #[test]
    fn default_cycle_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        let args = Args::try_parse_from([
            "cmb",
            "--settings",
            dir.path().join("none.ini").to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();
        assert!(run(args).unwrap());

        let text = std::fs::read_to_string(&output).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("ell,d_ell_uk2"));
        assert!(lines.next().unwrap().starts_with("2,"));
        assert_eq!(text.lines().count(), 1 + 2499);
    }
}
