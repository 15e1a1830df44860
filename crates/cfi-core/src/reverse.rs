use crate::denoiser::Denoiser;
use crate::error::{DiffusionError, Result};
use crate::noise::NoiseGenerator;
use crate::schedule::NoiseSchedule;
use crate::tensor::{ImageTensor, MaskTensor};

/// One step of the reverse Markov chain: x_t → x_{t−1}.
///
/// Reconstructs an x₀ estimate from the predicted noise, forms the
/// posterior mean, injects posterior noise for t > 0, and, when
/// `original` is supplied, hard-resets all pixels outside the mask to
/// the clean image. The t = 0 step is deterministic.
pub fn p_sample<D: Denoiser + ?Sized>(
    schedule: &NoiseSchedule,
    denoiser: &D,
    x: &ImageTensor,
    t: usize,
    mask: &MaskTensor,
    original: Option<&ImageTensor>,
    rng: &mut NoiseGenerator,
) -> Result<ImageTensor> {
    schedule.check_timestep(t)?;
    mask.matches_image(x)?;
    if let Some(orig) = original {
        x.same_shape(orig)?;
    }

    let ts = vec![t; x.batch()];
    let noise_pred = denoiser
        .predict_noise(x, &ts, mask)
        .map_err(DiffusionError::Denoiser)?;
    x.same_shape(&noise_pred)?;

    let beta = schedule.betas[t];
    let alpha = schedule.alphas[t];
    let alpha_bar = schedule.alpha_bar[t];
    let alpha_bar_prev = schedule.alpha_bar_prev[t];

    // x̂₀ = (x_t − √(1−ᾱ)·ε̂) / √ᾱ, clamped to the image range
    let sqrt_one_minus = schedule.sqrt_one_minus_alpha_bar[t];
    let sqrt_alpha_bar = schedule.sqrt_alpha_bar[t];
    let x0_hat = x.map_indexed(|i, xv| {
        ((xv - sqrt_one_minus * noise_pred[i]) / sqrt_alpha_bar).clamp(-1.0, 1.0)
    });
    if !x0_hat.all_finite() {
        return Err(DiffusionError::NumericalDivergence { t });
    }

    // Posterior mean: coef₀·x̂₀ + coefₜ·x_t
    let coef0 = alpha_bar_prev.sqrt() * beta / (1.0 - alpha_bar);
    let coef_t = alpha.sqrt() * (1.0 - alpha_bar_prev) / (1.0 - alpha_bar);
    let mut next = x.map_indexed(|i, xv| coef0 * x0_hat[i] + coef_t * xv);

    // Inject posterior noise except at the final, degenerate step
    if t > 0 {
        let sigma = schedule.posterior_variance[t].sqrt();
        let eps = rng.standard_normal_like(x);
        next = next.map_indexed(|i, m| m + sigma * eps[i]);
    }

    match original {
        Some(orig) => mask.blend(&next, orig),
        None => Ok(next),
    }
}
