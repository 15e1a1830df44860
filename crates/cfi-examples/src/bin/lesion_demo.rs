use cfi_core::{DiffusionConfig, ImageTensor, MaskTensor, NoiseGenerator, NoiseSchedule, F};
use cfi_models::{BlendDenoiser, MeanIntensityPredictor};
use cfi_sampler::{InpaintOptions, InpaintingSampler, SensitivityAnalyzer};

fn main() {
    // A 16x16 phantom: dark tissue with a bright 4x4 "lesion"
    let size = 16;
    let tissue = -0.8;
    let mut pixels = vec![tissue; size * size];
    let mut mask_values = vec![0.0; size * size];
    for h in 6..10 {
        for w in 6..10 {
            pixels[h * size + w] = 0.9;
            mask_values[h * size + w] = 1.0;
        }
    }
    let image = ImageTensor::from_vec([1, 1, size, size], pixels).unwrap();
    let mask = MaskTensor::from_vec(1, size, size, mask_values).unwrap();

    // Short schedule, denoiser that regenerates uniform healthy tissue
    let config = DiffusionConfig {
        timesteps: 100,
        ..Default::default()
    };
    let schedule = NoiseSchedule::build(&config).unwrap();
    let denoiser = BlendDenoiser::new(schedule.clone(), tissue);
    let sampler = InpaintingSampler::new(schedule, denoiser);

    println!("Inpainting a {0}x{0} phantom, T={1}", size, config.timesteps);

    let mut rng = NoiseGenerator::new(42);
    let result = sampler
        .inpaint(&image, &mask, &InpaintOptions::default(), &mut rng)
        .unwrap();

    let lesion_before = region_mean(&image, &mask);
    let lesion_after = region_mean(&result.inpainted, &mask);
    println!("Lesion mean intensity: {:.3} -> {:.3}", lesion_before, lesion_after);
    println!("Snapshots along the trajectory: {}", result.intermediates.len());

    // How much does a brightness score depend on the lesion region?
    let analyzer = SensitivityAnalyzer::new(sampler);
    let analysis = analyzer
        .sensitivity_analysis(&image, &mask, &MeanIntensityPredictor, 5, 42)
        .unwrap();

    println!();
    println!("Original prediction:   {:.4}", analysis.original_prediction[0]);
    println!("Counterfactual mean:   {:.4}", analysis.counterfactual_mean[0]);
    println!("Counterfactual std:    {:.4}", analysis.counterfactual_std[0]);
    println!("Sensitivity:           {:.4}", analysis.sensitivity[0]);
    println!("Confidence:            {:.4}", analysis.confidence[0]);
}

fn region_mean(image: &ImageTensor, mask: &MaskTensor) -> F {
    let [_, _, h, w] = image.dims();
    let mut sum = 0.0;
    let mut count = 0;
    for y in 0..h {
        for x in 0..w {
            if mask.at(0, y, x) > 0.0 {
                sum += image[image.idx(0, 0, y, x)];
                count += 1;
            }
        }
    }
    sum / count as F
}
