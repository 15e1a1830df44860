use cfi_core::{Denoiser, ImageTensor, MaskTensor, NoiseSchedule};

/// Denoiser with perfect knowledge of a target clean image.
///
/// Predicts ε̂ = (x_t − √ᾱ(t)·target) / √(1−ᾱ(t)), the exact residual
/// that makes the reconstructed x̂₀ equal the target. The analog of an
/// SDE model with a closed-form solution: it lets tests pin down what
/// the sampler should converge to.
pub struct OracleDenoiser {
    schedule: NoiseSchedule,
    target: ImageTensor,
}

impl OracleDenoiser {
    pub fn new(schedule: NoiseSchedule, target: ImageTensor) -> Self {
        Self { schedule, target }
    }

    pub fn target(&self) -> &ImageTensor {
        &self.target
    }
}

impl Denoiser for OracleDenoiser {
    fn predict_noise(
        &self,
        x: &ImageTensor,
        ts: &[usize],
        _mask: &MaskTensor,
    ) -> anyhow::Result<ImageTensor> {
        anyhow::ensure!(
            x.dims() == self.target.dims(),
            "oracle target dims {:?} do not match input {:?}",
            self.target.dims(),
            x.dims()
        );
        anyhow::ensure!(
            ts.len() == x.batch(),
            "got {} timesteps for batch of {}",
            ts.len(),
            x.batch()
        );
        for &t in ts {
            anyhow::ensure!(t < self.schedule.len(), "timestep {} out of range", t);
        }

        Ok(x.map_indexed(|i, xv| {
            let t = ts[x.batch_of(i)];
            (xv - self.schedule.sqrt_alpha_bar[t] * self.target[i])
                / self.schedule.sqrt_one_minus_alpha_bar[t]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfi_core::{p_sample, DiffusionConfig, NoiseGenerator};

    #[test]
    fn test_oracle_reconstructs_target_exactly() {
        let schedule = NoiseSchedule::build(&DiffusionConfig {
            timesteps: 10,
            ..Default::default()
        })
        .unwrap();
        let target = ImageTensor::filled([1, 1, 4, 4], 0.25);
        let oracle = OracleDenoiser::new(schedule.clone(), target.clone());
        let mask = MaskTensor::ones(1, 4, 4);

        // At t = 0 the step is deterministic and the posterior mean
        // collapses onto x̂₀, which the oracle makes equal to target.
        let mut rng = NoiseGenerator::new(0);
        let x = ImageTensor::filled([1, 1, 4, 4], 0.9);
        let out = p_sample(&schedule, &oracle, &x, 0, &mask, None, &mut rng).unwrap();
        for i in 0..out.len() {
            assert!((out[i] - 0.25).abs() < 1e-9, "pixel {} = {}", i, out[i]);
        }
    }
}
