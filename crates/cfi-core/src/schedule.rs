use crate::error::{DiffusionError, Result};
use crate::F;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Shape of the β(t) noise-injection curve
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Linear,
    Quadratic,
    Cosine,
}

impl FromStr for ScheduleKind {
    type Err = DiffusionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(ScheduleKind::Linear),
            "quadratic" => Ok(ScheduleKind::Quadratic),
            "cosine" => Ok(ScheduleKind::Cosine),
            other => Err(DiffusionError::InvalidConfig(format!(
                "unknown schedule: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScheduleKind::Linear => "linear",
            ScheduleKind::Quadratic => "quadratic",
            ScheduleKind::Cosine => "cosine",
        };
        write!(f, "{}", name)
    }
}

/// Configuration for building a noise schedule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiffusionConfig {
    pub timesteps: usize,
    pub beta_start: F,
    pub beta_end: F,
    pub schedule: ScheduleKind,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            timesteps: 1000,
            beta_start: 1e-4,
            beta_end: 0.02,
            schedule: ScheduleKind::Linear,
        }
    }
}

impl DiffusionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timesteps < 1 {
            return Err(DiffusionError::InvalidConfig(
                "timesteps must be >= 1".to_string(),
            ));
        }
        if !(self.beta_start > 0.0 && self.beta_start < 1.0) {
            return Err(DiffusionError::InvalidConfig(format!(
                "beta_start {} must be in (0, 1)",
                self.beta_start
            )));
        }
        if !(self.beta_end > 0.0 && self.beta_end < 1.0) {
            return Err(DiffusionError::InvalidConfig(format!(
                "beta_end {} must be in (0, 1)",
                self.beta_end
            )));
        }
        if self.beta_start >= self.beta_end {
            return Err(DiffusionError::InvalidConfig(format!(
                "beta_start {} must be < beta_end {}",
                self.beta_start, self.beta_end
            )));
        }
        Ok(())
    }
}

/// Precomputed per-timestep schedule buffers.
///
/// Built once, immutable thereafter; shared read-only by every reverse
/// step and every sensitivity sample.
#[derive(Clone, Debug)]
pub struct NoiseSchedule {
    pub betas: Vec<F>,
    pub alphas: Vec<F>,
    /// ᾱ(t) = ∏ α(0..=t)
    pub alpha_bar: Vec<F>,
    /// ᾱ(t−1), with ᾱ(−1) ≡ 1
    pub alpha_bar_prev: Vec<F>,
    pub sqrt_alpha_bar: Vec<F>,
    pub sqrt_one_minus_alpha_bar: Vec<F>,
    /// β(t)·(1−ᾱ(t−1))/(1−ᾱ(t))
    pub posterior_variance: Vec<F>,
    pub posterior_log_variance: Vec<F>,
}

impl NoiseSchedule {
    pub fn build(config: &DiffusionConfig) -> Result<Self> {
        config.validate()?;

        let t = config.timesteps;
        let betas = match config.schedule {
            ScheduleKind::Linear => linspace(config.beta_start, config.beta_end, t),
            ScheduleKind::Quadratic => {
                linspace(config.beta_start.sqrt(), config.beta_end.sqrt(), t)
                    .into_iter()
                    .map(|b| b * b)
                    .collect()
            }
            ScheduleKind::Cosine => cosine_betas(t),
        };

        let alphas: Vec<F> = betas.iter().map(|b| 1.0 - b).collect();

        let mut alpha_bar = Vec::with_capacity(t);
        let mut prod = 1.0;
        for a in &alphas {
            prod *= a;
            alpha_bar.push(prod);
        }

        // Shifted cumulative product: prepend 1, drop last
        let mut alpha_bar_prev = Vec::with_capacity(t);
        alpha_bar_prev.push(1.0);
        alpha_bar_prev.extend_from_slice(&alpha_bar[..t - 1]);

        let sqrt_alpha_bar: Vec<F> = alpha_bar.iter().map(|a| a.sqrt()).collect();
        let sqrt_one_minus_alpha_bar: Vec<F> = alpha_bar.iter().map(|a| (1.0 - a).sqrt()).collect();

        // β(t)·(1−ᾱ(t−1))/(1−ᾱ(t)); denominator is > 0 for any valid β
        let posterior_variance: Vec<F> = (0..t)
            .map(|i| betas[i] * (1.0 - alpha_bar_prev[i]) / (1.0 - alpha_bar[i]))
            .collect();
        let posterior_log_variance: Vec<F> = posterior_variance
            .iter()
            .map(|v| v.max(1e-20).ln())
            .collect();

        Ok(Self {
            betas,
            alphas,
            alpha_bar,
            alpha_bar_prev,
            sqrt_alpha_bar,
            sqrt_one_minus_alpha_bar,
            posterior_variance,
            posterior_log_variance,
        })
    }

    /// Number of timesteps T
    pub fn len(&self) -> usize {
        self.betas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.betas.is_empty()
    }

    pub fn check_timestep(&self, t: usize) -> Result<()> {
        if t >= self.len() {
            return Err(DiffusionError::InvalidTimestep {
                t,
                timesteps: self.len(),
            });
        }
        Ok(())
    }
}

fn linspace(start: F, end: F, n: usize) -> Vec<F> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as F;
    (0..n).map(|i| start + step * i as F).collect()
}

/// Cosine schedule from improved DDPM (Nichol & Dhariwal), s = 0.008
fn cosine_betas(timesteps: usize) -> Vec<F> {
    let s = 0.008;
    let t = timesteps as F;
    let alpha_bar_raw: Vec<F> = (0..=timesteps)
        .map(|i| {
            let f = (i as F / t + s) / (1.0 + s) * std::f64::consts::FRAC_PI_2;
            f.cos().powi(2)
        })
        .collect();

    let a0 = alpha_bar_raw[0];
    (0..timesteps)
        .map(|i| {
            let beta = 1.0 - (alpha_bar_raw[i + 1] / a0) / (alpha_bar_raw[i] / a0);
            beta.clamp(1e-4, 0.999)
        })
        .collect()
}
