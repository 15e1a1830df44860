use crate::error::{DiffusionError, Result};
use crate::noise::NoiseGenerator;
use crate::schedule::NoiseSchedule;
use crate::tensor::ImageTensor;

/// Forward diffusion: noise a clean image to timestep t.
///
/// `x_t = √ᾱ(t)·x₀ + √(1−ᾱ(t))·ε`, with a per-batch-element timestep.
/// When `noise` is `None`, ε is drawn fresh from `rng`.
pub fn q_sample(
    schedule: &NoiseSchedule,
    x0: &ImageTensor,
    ts: &[usize],
    noise: Option<&ImageTensor>,
    rng: &mut NoiseGenerator,
) -> Result<ImageTensor> {
    if ts.len() != x0.batch() {
        return Err(DiffusionError::InvalidConfig(format!(
            "got {} timesteps for batch of {}",
            ts.len(),
            x0.batch()
        )));
    }
    for &t in ts {
        schedule.check_timestep(t)?;
    }

    let drawn;
    let eps = match noise {
        Some(n) => {
            x0.same_shape(n)?;
            n
        }
        None => {
            drawn = rng.standard_normal_like(x0);
            &drawn
        }
    };

    Ok(x0.map_indexed(|i, x| {
        let t = ts[x0.batch_of(i)];
        schedule.sqrt_alpha_bar[t] * x + schedule.sqrt_one_minus_alpha_bar[t] * eps[i]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DiffusionConfig;

    fn schedule(t: usize) -> NoiseSchedule {
        NoiseSchedule::build(&DiffusionConfig {
            timesteps: t,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_zero_noise_is_pure_scaling() {
        let schedule = schedule(10);
        let x0 = ImageTensor::filled([1, 1, 2, 2], 0.5);
        let zero = ImageTensor::zeros([1, 1, 2, 2]);
        let mut rng = NoiseGenerator::new(0);

        let xt = q_sample(&schedule, &x0, &[7], Some(&zero), &mut rng).unwrap();
        for i in 0..xt.len() {
            assert!((xt[i] - schedule.sqrt_alpha_bar[7] * 0.5).abs() < 1e-15);
        }
    }

    #[test]
    fn test_per_batch_timesteps() {
        let schedule = schedule(10);
        let x0 = ImageTensor::filled([2, 1, 1, 1], 1.0);
        let zero = ImageTensor::zeros([2, 1, 1, 1]);
        let mut rng = NoiseGenerator::new(0);

        let xt = q_sample(&schedule, &x0, &[0, 9], Some(&zero), &mut rng).unwrap();
        assert!((xt[0] - schedule.sqrt_alpha_bar[0]).abs() < 1e-15);
        assert!((xt[1] - schedule.sqrt_alpha_bar[9]).abs() < 1e-15);
    }

    #[test]
    fn test_timestep_out_of_range() {
        let schedule = schedule(10);
        let x0 = ImageTensor::zeros([1, 1, 2, 2]);
        let mut rng = NoiseGenerator::new(0);
        let err = q_sample(&schedule, &x0, &[10], None, &mut rng);
        assert!(matches!(
            err,
            Err(DiffusionError::InvalidTimestep { t: 10, timesteps: 10 })
        ));
    }

    #[test]
    fn test_batch_timestep_arity() {
        let schedule = schedule(10);
        let x0 = ImageTensor::zeros([2, 1, 2, 2]);
        let mut rng = NoiseGenerator::new(0);
        let err = q_sample(&schedule, &x0, &[3], None, &mut rng);
        assert!(matches!(err, Err(DiffusionError::InvalidConfig(_))));
    }
}
