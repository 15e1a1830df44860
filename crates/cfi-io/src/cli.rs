use crate::{synthetic_phantom, RunManifest, SensitivitySummary};
use cfi_core::{Denoiser, DiffusionConfig, NoiseGenerator, NoiseSchedule, ScheduleKind};
use cfi_models::{BlendDenoiser, MaskedEnergyPredictor, MeanIntensityPredictor, ZeroDenoiser};
use cfi_sampler::{InpaintOptions, InpaintingSampler, SensitivityAnalyzer};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfi")]
#[command(about = "Counterfactual diffusion inpainting over synthetic phantoms")]
#[command(long_about = "DDPM-style inpainting and sensitivity analysis with reproducible seeds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one inpainting trajectory and write a JSON manifest
    Inpaint {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Run multi-sample sensitivity analysis and write JSON results
    Sensitivity {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of independent counterfactual samples
        #[arg(long, default_value = "5")]
        samples: usize,

        /// Scoring function
        #[arg(long, value_enum, default_value = "mean-intensity")]
        predictor: PredictorType,
    },
}

#[derive(clap::Args)]
pub struct CommonArgs {
    /// Noise schedule shape
    #[arg(long, value_enum, default_value = "linear")]
    pub schedule: ScheduleType,

    /// Diffusion timesteps T
    #[arg(long, default_value = "200")]
    pub timesteps: usize,

    #[arg(long, default_value = "1e-4")]
    pub beta_start: f64,

    #[arg(long, default_value = "0.02")]
    pub beta_end: f64,

    /// Reverse steps (default: all timesteps)
    #[arg(long)]
    pub steps: Option<usize>,

    /// Denoiser stand-in
    #[arg(long, value_enum, default_value = "blend")]
    pub model: ModelType,

    /// Tissue level for the blend model
    #[arg(long, default_value = "-0.8", allow_hyphen_values = true)]
    pub level: f64,

    /// Phantom side length in pixels
    #[arg(long, default_value = "32")]
    pub size: usize,

    /// Lesion side length in pixels
    #[arg(long, default_value = "8")]
    pub lesion: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output JSON file (manifest goes to <out>.manifest.json)
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ScheduleType {
    #[value(name = "linear")]
    Linear,
    #[value(name = "quadratic")]
    Quadratic,
    #[value(name = "cosine")]
    Cosine,
}

impl From<ScheduleType> for ScheduleKind {
    fn from(s: ScheduleType) -> Self {
        match s {
            ScheduleType::Linear => ScheduleKind::Linear,
            ScheduleType::Quadratic => ScheduleKind::Quadratic,
            ScheduleType::Cosine => ScheduleKind::Cosine,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ModelType {
    /// Predicts zero noise
    #[value(name = "zero")]
    Zero,
    /// Pulls the masked region toward a uniform tissue level
    #[value(name = "blend")]
    Blend,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum PredictorType {
    #[value(name = "mean-intensity")]
    MeanIntensity,
    #[value(name = "masked-energy")]
    MaskedEnergy,
}

fn build_config(common: &CommonArgs) -> DiffusionConfig {
    DiffusionConfig {
        timesteps: common.timesteps,
        beta_start: common.beta_start,
        beta_end: common.beta_end,
        schedule: common.schedule.clone().into(),
    }
}

fn model_name(model: &ModelType) -> &'static str {
    match model {
        ModelType::Zero => "zero",
        ModelType::Blend => "blend",
    }
}

pub async fn run_inpaint_command(common: CommonArgs) -> anyhow::Result<()> {
    let config = build_config(&common);
    let schedule = NoiseSchedule::build(&config)?;
    let (image, mask) = synthetic_phantom(common.size, common.lesion)?;
    let num_steps = common.steps.unwrap_or(config.timesteps);

    println!("CFI Inpainting");
    println!("==============");
    println!("Schedule: {} (T={})", config.schedule, config.timesteps);
    println!("Model: {}", model_name(&common.model));
    println!("Steps: {}", num_steps);
    println!("Seed: {}", common.seed);
    println!("Phantom: {}x{} with {}x{} lesion", common.size, common.size, common.lesion, common.lesion);

    let manifest = RunManifest::new(
        common.seed,
        &config,
        num_steps,
        1,
        model_name(&common.model),
        &image,
        &mask,
    );

    let options = InpaintOptions {
        num_steps: common.steps,
        ..Default::default()
    };
    let mut rng = NoiseGenerator::new(common.seed);

    let result = match common.model {
        ModelType::Zero => {
            let sampler = InpaintingSampler::new(schedule, ZeroDenoiser);
            sampler.inpaint(&image, &mask, &options, &mut rng)?
        }
        ModelType::Blend => {
            let denoiser = BlendDenoiser::new(schedule.clone(), common.level);
            let sampler = InpaintingSampler::new(schedule, denoiser);
            sampler.inpaint(&image, &mask, &options, &mut rng)?
        }
    };

    let out = common
        .out
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path"))?;
    let manifest_path = common.out.with_extension("manifest.json");
    manifest.save_to_file(
        manifest_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 manifest path"))?,
    )?;
    std::fs::write(out, serde_json::to_string_pretty(&result)?)?;

    let lesion_mean = lesion_mean(&result.inpainted, &mask);
    println!();
    println!("Inpainted lesion mean intensity: {:.4}", lesion_mean);
    println!("Snapshots captured: {}", result.intermediates.len());
    println!("✓ Inpainting completed");
    Ok(())
}

pub async fn run_sensitivity_command(
    common: CommonArgs,
    samples: usize,
    predictor: PredictorType,
) -> anyhow::Result<()> {
    let config = build_config(&common);
    let schedule = NoiseSchedule::build(&config)?;
    let (image, mask) = synthetic_phantom(common.size, common.lesion)?;
    let num_steps = common.steps.unwrap_or(config.timesteps);

    println!("CFI Sensitivity Analysis");
    println!("========================");
    println!("Schedule: {} (T={})", config.schedule, config.timesteps);
    println!("Model: {}", model_name(&common.model));
    println!("Samples: {}", samples);
    println!("Seed: {}", common.seed);

    let manifest = RunManifest::new(
        common.seed,
        &config,
        num_steps,
        samples,
        model_name(&common.model),
        &image,
        &mask,
    );

    let options = InpaintOptions {
        num_steps: common.steps,
        ..Default::default()
    };

    let result = match common.model {
        ModelType::Zero => {
            let analyzer = SensitivityAnalyzer::new(InpaintingSampler::new(schedule, ZeroDenoiser))
                .with_options(options);
            run_with_predictor(&analyzer, &image, &mask, &predictor, samples, common.seed)?
        }
        ModelType::Blend => {
            let denoiser = BlendDenoiser::new(schedule.clone(), common.level);
            let analyzer = SensitivityAnalyzer::new(InpaintingSampler::new(schedule, denoiser))
                .with_options(options);
            run_with_predictor(&analyzer, &image, &mask, &predictor, samples, common.seed)?
        }
    };

    let summary = SensitivitySummary::from_result(&manifest.run_id, &result);
    let out = common
        .out
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("non-UTF8 output path"))?;
    let manifest_path = common.out.with_extension("manifest.json");
    manifest.save_to_file(
        manifest_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("non-UTF8 manifest path"))?,
    )?;
    summary.save_to_file(out)?;

    println!();
    println!("Summary Statistics:");
    println!("==================");
    println!("Original prediction: {:?}", summary.original_prediction);
    println!("Counterfactual mean: {:?}", summary.counterfactual_mean);
    println!("Counterfactual std:  {:?}", summary.counterfactual_std);
    println!("Sensitivity:         {:?}", summary.sensitivity);
    println!("Confidence:          {:?}", summary.confidence);
    println!("✓ Sensitivity analysis completed");
    Ok(())
}

fn run_with_predictor<D: Denoiser>(
    analyzer: &SensitivityAnalyzer<D>,
    image: &cfi_core::ImageTensor,
    mask: &cfi_core::MaskTensor,
    predictor: &PredictorType,
    samples: usize,
    seed: u64,
) -> anyhow::Result<cfi_sampler::SensitivityResult> {
    let result = match predictor {
        PredictorType::MeanIntensity => {
            analyzer.sensitivity_analysis(image, mask, &MeanIntensityPredictor, samples, seed)?
        }
        PredictorType::MaskedEnergy => {
            let scorer = MaskedEnergyPredictor::new(mask.clone());
            analyzer.sensitivity_analysis(image, mask, &scorer, samples, seed)?
        }
    };
    Ok(result)
}

fn lesion_mean(image: &cfi_core::ImageTensor, mask: &cfi_core::MaskTensor) -> f64 {
    let [_, _, h, w] = image.dims();
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in 0..h {
        for x in 0..w {
            if mask.at(0, y, x) > 0.0 {
                sum += image[image.idx(0, 0, y, x)];
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
