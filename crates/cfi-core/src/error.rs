use crate::Dims;
use thiserror::Error;

/// Error taxonomy for the diffusion subsystem.
///
/// Capability failures (`Denoiser`, `Predictor`) wrap the external
/// error verbatim; nothing is retried inside a trajectory.
#[derive(Debug, Error)]
pub enum DiffusionError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Dims, got: Dims },

    #[error("timestep {t} outside schedule range 0..{timesteps}")]
    InvalidTimestep { t: usize, timesteps: usize },

    #[error("non-finite values in x0 estimate at t={t}")]
    NumericalDivergence { t: usize },

    #[error("denoiser failed")]
    Denoiser(#[source] anyhow::Error),

    #[error("predictor failed")]
    Predictor(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DiffusionError>;
