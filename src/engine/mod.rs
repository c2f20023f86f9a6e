//! Spectrum engine boundary.
//!
//! An engine is a stateful solver: configure it, compute, read the lensed
//! spectra back, then release it in two phases (`struct_cleanup` then
//! `empty`). [`EngineHandle`] owns one engine for the length of a recompute
//! cycle and performs that release from `Drop`, so every exit path
//! (early return, error, unwinding panic) frees the solver state.

pub mod analytic;
pub mod class_process;

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::data::{ParameterSet, RawSpectrum};

pub use analytic::AnalyticEngine;
pub use class_process::ClassProcessEngine;

// ─── Config keys ───────────────────────────────────────────────────────────────

pub const KEY_OUTPUT: &str = "output";
pub const KEY_LENSING: &str = "lensing";
pub const KEY_H: &str = "h";
pub const KEY_OMEGA_B: &str = "omega_b";
pub const KEY_OMEGA_CDM: &str = "omega_cdm";
pub const KEY_N_S: &str = "n_s";
pub const KEY_A_S: &str = "A_s";

/// Temperature, polarization and lensing-potential spectra.
pub const REQUESTED_OUTPUT: &str = "tCl,pCl,lCl";

/// Engine errors. Everything here is recoverable at the controller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing input parameter '{0}'")]
    MissingParameter(String),

    #[error("could not read input parameter '{key}' = '{value}'")]
    InvalidParameter { key: String, value: String },

    #[error("did not read input parameter '{0}'")]
    UnknownParameter(String),

    #[error("engine is not configured")]
    NotConfigured,

    #[error("spectra have not been computed")]
    NotComputed,

    #[error("non-physical parameter: {0}")]
    NonPhysical(String),

    #[error("lensed spectra were not requested (need lensing = yes and lCl in output)")]
    LensingNotRequested,

    #[error("l_max = {requested} is above the computed maximum {available}")]
    LmaxTooHigh { requested: usize, available: usize },

    #[error("solver process failed: {0}")]
    Process(String),

    #[error("could not parse solver output {path}: {message}")]
    OutputParse { path: PathBuf, message: String },

    #[error("engine i/o error: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Engine configuration ──────────────────────────────────────────────────────

/// Key/value input for an engine, values kept as the text a solver reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    entries: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed output request with lensing on, plus the five cosmological inputs.
    pub fn for_parameters(params: &ParameterSet) -> Self {
        let mut cfg = Self::new();
        cfg.set(KEY_OUTPUT, REQUESTED_OUTPUT);
        cfg.set(KEY_LENSING, "yes");
        cfg.set(KEY_H, params.h());
        cfg.set(KEY_OMEGA_B, params.omega_b());
        cfg.set(KEY_OMEGA_CDM, params.omega_cdm());
        cfg.set(KEY_N_S, params.n_s());
        cfg.set(KEY_A_S, params.a_s());
        cfg
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, EngineError> {
        let raw = self
            .get(key)
            .ok_or_else(|| EngineError::MissingParameter(key.to_string()))?;
        raw.trim().parse().map_err(|_| EngineError::InvalidParameter {
            key: key.to_string(),
            value: raw.to_string(),
        })
    }

    /// `yes`/`no` style flag; absent reads as `false`.
    pub fn get_flag(&self, key: &str) -> Result<bool, EngineError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(false),
            Some(v) if matches!(v.as_str(), "yes" | "y" | "true") => Ok(true),
            Some(v) if matches!(v.as_str(), "no" | "n" | "false") => Ok(false),
            Some(v) => Err(EngineError::InvalidParameter {
                key: key.to_string(),
                value: v,
            }),
        }
    }

    /// Entries of the comma separated `output` list.
    pub fn outputs(&self) -> Vec<&str> {
        self.get(KEY_OUTPUT)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn wants_lensed_cl(&self) -> Result<bool, EngineError> {
        let outputs = self.outputs();
        Ok(self.get_flag(KEY_LENSING)?
            && outputs.contains(&"lCl")
            && outputs.contains(&"tCl"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Engine traits ─────────────────────────────────────────────────────────────

pub trait SpectrumEngine {
    /// Store the input; fails on missing, unknown or unreadable keys.
    fn configure(&mut self, config: &EngineConfig) -> Result<(), EngineError>;

    /// Run the expensive solve. Fails for non-physical parameter combinations.
    fn compute(&mut self) -> Result<(), EngineError>;

    /// Lensed TT spectrum for ℓ = 0..=l_max, C_ℓ in K².
    fn lensed_cl(&self, l_max: usize) -> Result<RawSpectrum, EngineError>;

    /// Free computed solver state. Idempotent.
    fn struct_cleanup(&mut self);

    /// Drop the configuration and any remaining resources. Idempotent.
    fn empty(&mut self);
}

impl<E: SpectrumEngine + ?Sized> SpectrumEngine for Box<E> {
    fn configure(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        (**self).configure(config)
    }

    fn compute(&mut self) -> Result<(), EngineError> {
        (**self).compute()
    }

    fn lensed_cl(&self, l_max: usize) -> Result<RawSpectrum, EngineError> {
        (**self).lensed_cl(l_max)
    }

    fn struct_cleanup(&mut self) {
        (**self).struct_cleanup()
    }

    fn empty(&mut self) {
        (**self).empty()
    }
}

/// Makes a fresh engine for each recompute cycle.
pub trait EngineFactory {
    type Engine: SpectrumEngine;

    fn create(&mut self) -> Result<Self::Engine, EngineError>;
}

/// Which solver backs the pipeline, chosen from settings or the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Analytic,
    Class { executable: PathBuf },
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Analytic => "analytic",
            Backend::Class { .. } => "class",
        }
    }
}

impl EngineFactory for Backend {
    type Engine = Box<dyn SpectrumEngine>;

    fn create(&mut self) -> Result<Self::Engine, EngineError> {
        match self {
            Backend::Analytic => Ok(Box::new(AnalyticEngine::new())),
            Backend::Class { executable } => {
                Ok(Box::new(ClassProcessEngine::new(executable.clone())?))
            }
        }
    }
}

// ─── Scoped handle ─────────────────────────────────────────────────────────────

/// Exclusive owner of one engine. Releasing it is not optional: `Drop`
/// runs `struct_cleanup` then `empty`, after which the engine itself drops.
pub struct EngineHandle<E: SpectrumEngine> {
    engine: E,
}

impl<E: SpectrumEngine> EngineHandle<E> {
    pub fn acquire<F>(factory: &mut F) -> Result<Self, EngineError>
    where
        F: EngineFactory<Engine = E>,
    {
        let engine = factory.create()?;
        debug!("engine acquired");
        Ok(Self { engine })
    }
}

impl<E: SpectrumEngine> Deref for EngineHandle<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.engine
    }
}

impl<E: SpectrumEngine> DerefMut for EngineHandle<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: SpectrumEngine> Drop for EngineHandle<E> {
    fn drop(&mut self) {
        self.engine.struct_cleanup();
        self.engine.empty();
        debug!("engine released");
    }
}
