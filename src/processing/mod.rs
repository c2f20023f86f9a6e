pub mod controller;
pub mod settle;
pub mod transform;

pub use controller::{CycleOutcome, Renderer, UpdateController};
pub use settle::SettleGate;
pub use transform::transform;
