use crate::tensor::{ImageTensor, MaskTensor};
use crate::F;
use nalgebra::DVector;

/// Opaque noise-predicting network.
///
/// `ts` carries one timestep per batch element. Implementations must be
/// deterministic given identical inputs; any internal randomness would
/// break trajectory reproducibility.
pub trait Denoiser: Send + Sync {
    fn predict_noise(
        &self,
        x: &ImageTensor,
        ts: &[usize],
        mask: &MaskTensor,
    ) -> anyhow::Result<ImageTensor>;
}

/// Opaque classifier/regressor used for sensitivity scoring.
///
/// Returns one flat prediction vector per call (all batch outputs
/// concatenated). Must be side-effect-free.
pub trait Predictor: Send + Sync {
    fn predict(&self, image: &ImageTensor) -> anyhow::Result<DVector<F>>;
}
