use cfi_core::{DiffusionConfig, ImageTensor, MaskTensor, F};
use cfi_sampler::SensitivityResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod cli;
pub use cli::*;

/// Run manifest for complete reproducibility
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub timestamp: String,
    pub seed: u64,
    pub config: DiffusionConfig,
    pub num_steps: usize,
    pub num_samples: usize,
    pub model_name: String,
    pub image_dims: [usize; 4],
    pub mask_area: usize,
    pub commit_hash: Option<String>,
    pub rust_version: String,
}

impl RunManifest {
    pub fn new(
        seed: u64,
        config: &DiffusionConfig,
        num_steps: usize,
        num_samples: usize,
        model_name: &str,
        image: &ImageTensor,
        mask: &MaskTensor,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            seed,
            config: config.clone(),
            num_steps,
            num_samples,
            model_name: model_name.to_string(),
            image_dims: image.dims(),
            mask_area: mask.data().iter().filter(|&&v| v > 0.0).count(),
            commit_hash: get_git_commit(),
            rust_version: get_rust_version(),
        }
    }

    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let manifest = serde_json::from_str(&json)?;
        Ok(manifest)
    }
}

/// Flat summary of a sensitivity run, written next to the manifest
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensitivitySummary {
    pub run_id: String,
    pub original_prediction: Vec<F>,
    pub counterfactual_mean: Vec<F>,
    pub counterfactual_std: Vec<F>,
    pub sensitivity: Vec<F>,
    pub confidence: Vec<F>,
    pub num_samples: usize,
}

impl SensitivitySummary {
    pub fn from_result(run_id: &str, result: &SensitivityResult) -> Self {
        Self {
            run_id: run_id.to_string(),
            original_prediction: result.original_prediction.iter().copied().collect(),
            counterfactual_mean: result.counterfactual_mean.iter().copied().collect(),
            counterfactual_std: result.counterfactual_std.iter().copied().collect(),
            sensitivity: result.sensitivity.iter().copied().collect(),
            confidence: result.confidence.iter().copied().collect(),
            num_samples: result.inpainted_samples.len(),
        }
    }

    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Synthetic phantom: uniform dark tissue with a bright square lesion.
///
/// Stands in for upstream image loading, which is not this subsystem's
/// job; the CLI only needs plausible [-1, 1] inputs.
pub fn synthetic_phantom(
    size: usize,
    lesion_extent: usize,
) -> anyhow::Result<(ImageTensor, MaskTensor)> {
    anyhow::ensure!(size > 0, "phantom size must be > 0");
    anyhow::ensure!(
        lesion_extent <= size,
        "lesion extent {} exceeds phantom size {}",
        lesion_extent,
        size
    );

    let background = -0.8;
    let lesion = 0.9;
    let start = (size - lesion_extent) / 2;
    let end = start + lesion_extent;

    let mut pixels = vec![background; size * size];
    let mut mask = vec![0.0; size * size];
    for h in start..end {
        for w in start..end {
            pixels[h * size + w] = lesion;
            mask[h * size + w] = 1.0;
        }
    }

    let image = ImageTensor::from_vec([1, 1, size, size], pixels)
        .expect("phantom buffer matches dims");
    let mask = MaskTensor::from_vec(1, size, size, mask).expect("mask buffer matches dims");
    Ok((image, mask))
}

fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
}

fn get_rust_version() -> String {
    std::process::Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phantom_geometry() {
        let (image, mask) = synthetic_phantom(16, 4).unwrap();
        assert_eq!(image.dims(), [1, 1, 16, 16]);
        assert_eq!(mask.data().iter().filter(|&&v| v > 0.0).count(), 16);
        // Lesion pixels are bright, background dark
        assert_eq!(image[image.idx(0, 0, 8, 8)], 0.9);
        assert_eq!(image[image.idx(0, 0, 0, 0)], -0.8);
    }

    #[test]
    fn test_phantom_rejects_oversized_lesion() {
        // A lesion wider than the phantom is a bad flag combination,
        // not a reason to panic
        assert!(synthetic_phantom(8, 16).is_err());
        assert!(synthetic_phantom(0, 0).is_err());
        // Full-frame lesion is still valid
        let (_, mask) = synthetic_phantom(8, 8).unwrap();
        assert_eq!(mask.data().iter().filter(|&&v| v > 0.0).count(), 64);
    }

    #[test]
    fn test_manifest_roundtrip() {
        let (image, mask) = synthetic_phantom(8, 2).unwrap();
        let config = DiffusionConfig::default();
        let manifest = RunManifest::new(42, &config, 50, 5, "blend", &image, &mask);

        let json = serde_json::to_string(&manifest).unwrap();
        let back: RunManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, manifest.run_id);
        assert_eq!(back.seed, 42);
        assert_eq!(back.mask_area, 4);
    }
}
