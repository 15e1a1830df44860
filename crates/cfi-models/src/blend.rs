use cfi_core::{Denoiser, ImageTensor, MaskTensor, NoiseSchedule, F};

/// Denoiser that pulls the masked region toward a uniform tissue level.
///
/// Same residual construction as the oracle, with a constant target.
/// Stands in for a network trained on homogeneous healthy tissue.
pub struct BlendDenoiser {
    schedule: NoiseSchedule,
    level: F,
}

impl BlendDenoiser {
    pub fn new(schedule: NoiseSchedule, level: F) -> Self {
        Self { schedule, level }
    }
}

impl Denoiser for BlendDenoiser {
    fn predict_noise(
        &self,
        x: &ImageTensor,
        ts: &[usize],
        _mask: &MaskTensor,
    ) -> anyhow::Result<ImageTensor> {
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
            (xv - self.schedule.sqrt_alpha_bar[t] * self.level)
                / self.schedule.sqrt_one_minus_alpha_bar[t]
        }))
    }
}
