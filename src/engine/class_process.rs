//! Adapter for an external CLASS executable.
//!
//! Each engine owns a private scratch directory. `compute` writes the
//! configuration as `params.ini`, runs the solver there and parses the
//! `*cl_lensed.dat` table it leaves behind. `struct_cleanup` deletes the
//! generated tables, `empty` removes the directory itself.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, warn};

use super::{EngineConfig, EngineError, SpectrumEngine};
use crate::data::RawSpectrum;

/// CMB temperature CLASS assumes unless told otherwise (K)
pub const T_CMB: f64 = 2.7255;

const INI_NAME: &str = "params.ini";
const ROOT_PREFIX: &str = "cmb_";
const LENSED_SUFFIX: &str = "cl_lensed.dat";

#[derive(Debug)]
pub struct ClassProcessEngine {
    program: PathBuf,
    leading_args: Vec<String>,
    workdir: Option<TempDir>,
    config: Option<EngineConfig>,
    wants_lensed: bool,
    /// (ℓ, C_ℓ^TT in K²) rows for ℓ >= 2
    table: Option<Vec<(usize, f64)>>,
}

impl ClassProcessEngine {
    pub fn new(executable: PathBuf) -> Result<Self, EngineError> {
        Self::with_command(executable, Vec::new())
    }

    /// Run `program leading_args.. params.ini`, e.g. an interpreter plus script.
    pub fn with_command(program: PathBuf, leading_args: Vec<String>) -> Result<Self, EngineError> {
        let workdir = tempfile::Builder::new().prefix("cmb-class-").tempdir()?;
        debug!(dir = %workdir.path().display(), "CLASS scratch directory created");
        Ok(Self {
            program,
            leading_args,
            workdir: Some(workdir),
            config: None,
            wants_lensed: false,
            table: None,
        })
    }

    pub fn workdir_path(&self) -> Option<&Path> {
        self.workdir.as_ref().map(TempDir::path)
    }

    fn write_ini(&self, dir: &Path, config: &EngineConfig) -> Result<PathBuf, EngineError> {
        let mut s = String::new();
        for (key, value) in config.iter() {
            s.push_str(&format!("{key} = {value}\n"));
        }
        s.push_str(&format!("root = {}/{ROOT_PREFIX}\n", dir.display()));
        let path = dir.join(INI_NAME);
        fs::write(&path, s)?;
        Ok(path)
    }

    fn run_solver(&self, dir: &Path, ini: &Path) -> Result<(), EngineError> {
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(ini)
            .current_dir(dir)
            .output()
            .map_err(|e| {
                EngineError::Process(format!("could not start {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let text = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(EngineError::Process(format!(
                "{} ({})",
                tail_lines(&text, 4),
                output.status
            )));
        }
        Ok(())
    }

    fn find_lensed_table(dir: &Path) -> Result<PathBuf, EngineError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_lensed = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(LENSED_SUFFIX));
            if is_lensed {
                return Ok(path);
            }
        }
        Err(EngineError::OutputParse {
            path: dir.to_path_buf(),
            message: "solver wrote no lensed Cl table".to_string(),
        })
    }
}

impl SpectrumEngine for ClassProcessEngine {
    fn configure(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        self.wants_lensed = config.wants_lensed_cl()?;
        self.config = Some(config.clone());
        Ok(())
    }

    fn compute(&mut self) -> Result<(), EngineError> {
        let config = self.config.as_ref().ok_or(EngineError::NotConfigured)?;
        let dir = self
            .workdir_path()
            .ok_or_else(|| EngineError::Process("scratch directory already released".into()))?
            .to_path_buf();

        let ini = self.write_ini(&dir, config)?;
        self.run_solver(&dir, &ini)?;

        if !self.wants_lensed {
            self.table = Some(Vec::new());
            return Ok(());
        }
        let path = Self::find_lensed_table(&dir)?;
        let text = fs::read_to_string(&path)?;
        let table = parse_lensed_table(&text, &path)?;
        debug!(rows = table.len(), path = %path.display(), "CLASS lensed table read");
        self.table = Some(table);
        Ok(())
    }

    fn lensed_cl(&self, l_max: usize) -> Result<RawSpectrum, EngineError> {
        let table = self.table.as_ref().ok_or(EngineError::NotComputed)?;
        if !self.wants_lensed {
            return Err(EngineError::LensingNotRequested);
        }
        let available = table.last().map(|&(ell, _)| ell).unwrap_or(0);
        if l_max > available {
            return Err(EngineError::LmaxTooHigh {
                requested: l_max,
                available,
            });
        }

        let mut tt = vec![0.0; l_max + 1];
        for &(ell, cl) in table.iter().take_while(|(ell, _)| *ell <= l_max) {
            tt[ell] = cl;
        }
        Ok(RawSpectrum::new((0..=l_max).collect(), tt))
    }

    fn struct_cleanup(&mut self) {
        self.table = None;
        let Some(dir) = self.workdir_path() else {
            return;
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "could not remove solver output");
                }
            }
        }
    }

    fn empty(&mut self) {
        self.config = None;
        self.wants_lensed = false;
        if let Some(dir) = self.workdir.take() {
            if let Err(e) = dir.close() {
                warn!(error = %e, "could not remove CLASS scratch directory");
            }
        }
    }
}

/// Parse a CLASS `cl_lensed.dat` table.
///
/// Columns are ℓ then dimensionless ℓ(ℓ+1)C_ℓ/2π (TT first). Rows come back
/// as C_ℓ^TT in K², ascending in ℓ, starting at ℓ = 2.
pub fn parse_lensed_table(text: &str, path: &Path) -> Result<Vec<(usize, f64)>, EngineError> {
    let bad = |line_no: usize, message: &str| EngineError::OutputParse {
        path: path.to_path_buf(),
        message: format!("line {}: {message}", line_no + 1),
    };

    let mut rows: Vec<(usize, f64)> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut cols = line.split_whitespace();
        let ell: f64 = cols
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| bad(line_no, "missing multipole"))?;
        let d_tt: f64 = cols
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| bad(line_no, "missing TT column"))?;
        if ell < 0.0 || ell.fract() != 0.0 {
            return Err(bad(line_no, "multipole is not a non-negative integer"));
        }
        let ell = ell as usize;
        if ell < 2 {
            continue;
        }
        if rows.last().is_some_and(|&(prev, _)| prev >= ell) {
            return Err(bad(line_no, "multipoles are not ascending"));
        }
        let l = ell as f64;
        rows.push((ell, d_tt * 2.0 * PI / (l * (l + 1.0)) * T_CMB * T_CMB));
    }

    if rows.is_empty() {
        return Err(EngineError::OutputParse {
            path: path.to_path_buf(),
            message: "table has no rows".to_string(),
        });
    }
    Ok(rows)
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}
