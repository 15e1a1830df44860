use cfi_core::{
    p_sample, Denoiser, DiffusionError, ImageTensor, MaskTensor, NoiseGenerator, NoiseSchedule,
    Predictor, Result, F,
};
use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Options for a single inpainting run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InpaintOptions {
    /// Number of reverse steps; defaults to the full schedule length
    pub num_steps: Option<usize>,
    /// Classifier-free guidance scale.
    /// TODO: wire into the denoiser call once a guided model exists.
    pub guidance_scale: F,
}

impl Default for InpaintOptions {
    fn default() -> Self {
        Self {
            num_steps: None,
            guidance_scale: 1.0,
        }
    }
}

/// Output of one inpainting trajectory
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InpaintResult {
    pub inpainted: ImageTensor,
    pub original: ImageTensor,
    pub mask: MaskTensor,
    /// Periodic snapshots of x_t along the reverse trajectory
    pub intermediates: Vec<ImageTensor>,
}

/// Drives the full T→0 reverse trajectory for one image/mask pair.
///
/// The masked region starts as pure noise and the background is
/// injected as clean pixels, then held fixed by the per-step mask
/// reassignment inside `p_sample`. The background is deliberately not
/// forward-diffused to the noise level of each timestep; this mirrors
/// the trained model's sampling procedure, seams and all.
pub struct InpaintingSampler<D: Denoiser> {
    pub schedule: NoiseSchedule,
    pub denoiser: D,
}

impl<D: Denoiser> InpaintingSampler<D> {
    pub fn new(schedule: NoiseSchedule, denoiser: D) -> Self {
        Self { schedule, denoiser }
    }

    /// Regenerate the masked region, holding the background fixed.
    ///
    /// Strictly sequential: each step consumes the previous step's
    /// output. The trajectory is fully determined by `rng`'s seed.
    pub fn inpaint(
        &self,
        image: &ImageTensor,
        mask: &MaskTensor,
        options: &InpaintOptions,
        rng: &mut NoiseGenerator,
    ) -> Result<InpaintResult> {
        mask.matches_image(image)?;

        let t_max = self.schedule.len();
        let num_steps = options.num_steps.unwrap_or(t_max);
        if num_steps < 1 {
            return Err(DiffusionError::InvalidConfig(
                "num_steps must be >= 1".to_string(),
            ));
        }
        if num_steps > t_max {
            return Err(DiffusionError::InvalidConfig(format!(
                "num_steps {} exceeds schedule length {}",
                num_steps, t_max
            )));
        }

        // Noise in the masked region, real pixels elsewhere
        let noise = rng.standard_normal_like(image);
        let mut x = mask.blend(&noise, image)?;

        let snapshot_stride = (num_steps / 10).max(1);
        let mut intermediates = Vec::new();

        for t in (0..num_steps).rev() {
            x = p_sample(
                &self.schedule,
                &self.denoiser,
                &x,
                t,
                mask,
                Some(image),
                rng,
            )?;

            if t % snapshot_stride == 0 {
                intermediates.push(x.clone());
            }
        }

        Ok(InpaintResult {
            inpainted: x,
            original: image.clone(),
            mask: mask.clone(),
            intermediates,
        })
    }
}

/// Aggregate statistics from repeated counterfactual sampling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub original_prediction: DVector<F>,
    pub counterfactual_mean: DVector<F>,
    pub counterfactual_std: DVector<F>,
    /// original − counterfactual mean: how much the score depends on
    /// the masked region
    pub sensitivity: DVector<F>,
    /// 1/(1+std), elementwise; 1 when all samples agree
    pub confidence: DVector<F>,
    pub inpainted_samples: Vec<ImageTensor>,
}

/// Runs N independent inpainting samples and scores each counterfactual.
///
/// Samples share only the read-only schedule and denoiser, so they are
/// dispatched across the rayon pool with per-sample RNG streams derived
/// from the global seed. Results do not depend on thread count.
pub struct SensitivityAnalyzer<D: Denoiser> {
    sampler: InpaintingSampler<D>,
    pub options: InpaintOptions,
}

impl<D: Denoiser> SensitivityAnalyzer<D> {
    pub fn new(sampler: InpaintingSampler<D>) -> Self {
        Self {
            sampler,
            options: InpaintOptions::default(),
        }
    }

    pub fn with_options(mut self, options: InpaintOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sampler(&self) -> &InpaintingSampler<D> {
        &self.sampler
    }

    pub fn sensitivity_analysis<P: Predictor + ?Sized>(
        &self,
        image: &ImageTensor,
        mask: &MaskTensor,
        predictor: &P,
        num_samples: usize,
        global_seed: u64,
    ) -> Result<SensitivityResult> {
        if num_samples < 1 {
            return Err(DiffusionError::InvalidConfig(
                "num_samples must be >= 1".to_string(),
            ));
        }

        let original_prediction = predictor
            .predict(image)
            .map_err(DiffusionError::Predictor)?;

        let runs: Vec<(ImageTensor, DVector<F>)> = (0..num_samples)
            .into_par_iter()
            .map(|sample_id| {
                let mut rng = NoiseGenerator::from_sample_id(global_seed, sample_id as u64);
                let result = self.sampler.inpaint(image, mask, &self.options, &mut rng)?;
                let pred = predictor
                    .predict(&result.inpainted)
                    .map_err(DiffusionError::Predictor)?;
                Ok((result.inpainted, pred))
            })
            .collect::<Result<Vec<_>>>()?;

        let dim = original_prediction.len();
        for (_, pred) in &runs {
            if pred.len() != dim {
                return Err(DiffusionError::InvalidConfig(format!(
                    "predictor returned {} outputs for a counterfactual, expected {}",
                    pred.len(),
                    dim
                )));
            }
        }

        // Elementwise mean and sample std across the sample axis
        let n = num_samples as F;
        let mut mean = DVector::zeros(dim);
        for (_, pred) in &runs {
            mean += pred;
        }
        mean /= n;

        let mut var = DVector::zeros(dim);
        for (_, pred) in &runs {
            let diff = pred - &mean;
            var += diff.component_mul(&diff);
        }
        var /= (num_samples - 1).max(1) as F;
        let std = var.map(|v: F| v.sqrt());

        let sensitivity = &original_prediction - &mean;
        let confidence = std.map(|s| 1.0 / (1.0 + s));
        let inpainted_samples = runs.into_iter().map(|(img, _)| img).collect();

        Ok(SensitivityResult {
            original_prediction,
            counterfactual_mean: mean,
            counterfactual_std: std,
            sensitivity,
            confidence,
            inpainted_samples,
        })
    }
}
