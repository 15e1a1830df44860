use cfi_core::{Denoiser, ImageTensor, MaskTensor};

/// Denoiser that predicts no noise at all.
///
/// Under this model the x₀ estimate at step t is x_t/√ᾱ(t) (clamped),
/// so trajectories drift toward an amplified version of the current
/// state. Useful for exercising the sampler without any network.
#[derive(Clone, Debug)]
pub struct ZeroDenoiser;

impl Denoiser for ZeroDenoiser {
    fn predict_noise(
        &self,
        x: &ImageTensor,
        _ts: &[usize],
        _mask: &MaskTensor,
    ) -> anyhow::Result<ImageTensor> {
        Ok(ImageTensor::zeros(x.dims()))
    }
}
