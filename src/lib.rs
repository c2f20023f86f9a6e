//! Interactive explorer for the lensed CMB temperature power spectrum.
//!
//! Five cosmological parameters go in through [`data::SliderValues`], an
//! engine from [`engine`] produces C_ℓ, [`processing`] turns that into
//! D_ℓ in μK² and hands it to a [`processing::Renderer`].

pub mod data;
pub mod engine;
pub mod logging;
pub mod processing;
pub mod rendering;
pub mod settings;

#[cfg(feature = "gui")]
pub mod ui;
