use cfi_core::{ImageTensor, MaskTensor, Predictor, F};
use nalgebra::DVector;

/// Predicts the mean pixel intensity of each batch element.
///
/// A trivial "classifier" whose score moves whenever the inpainted
/// region changes brightness, which makes sensitivity scores easy to
/// reason about in tests.
#[derive(Clone, Debug)]
pub struct MeanIntensityPredictor;

impl Predictor for MeanIntensityPredictor {
    fn predict(&self, image: &ImageTensor) -> anyhow::Result<DVector<F>> {
        let per_batch = image.channels() * image.height() * image.width();
        anyhow::ensure!(per_batch > 0, "empty image");

        let scores = (0..image.batch())
            .map(|b| {
                let start = b * per_batch;
                (start..start + per_batch).map(|i| image[i]).sum::<F>() / per_batch as F
            })
            .collect::<Vec<F>>();
        Ok(DVector::from_vec(scores))
    }
}

/// Always returns the same score, regardless of input
#[derive(Clone, Debug)]
pub struct ConstantPredictor {
    pub value: F,
    pub outputs: usize,
}

impl ConstantPredictor {
    pub fn new(value: F, outputs: usize) -> Self {
        Self { value, outputs }
    }
}

impl Predictor for ConstantPredictor {
    fn predict(&self, _image: &ImageTensor) -> anyhow::Result<DVector<F>> {
        Ok(DVector::from_element(self.outputs, self.value))
    }
}

/// Scores the mean absolute intensity inside a fixed region.
///
/// Mimics a lesion detector that only looks at the suspected area: if
/// inpainting flattens the region, the score drops and the sensitivity
/// analysis reports a large effect.
pub struct MaskedEnergyPredictor {
    region: MaskTensor,
}

impl MaskedEnergyPredictor {
    pub fn new(region: MaskTensor) -> Self {
        Self { region }
    }
}

impl Predictor for MaskedEnergyPredictor {
    fn predict(&self, image: &ImageTensor) -> anyhow::Result<DVector<F>> {
        self.region
            .matches_image(image)
            .map_err(anyhow::Error::from)?;

        let [_, c, h, w] = image.dims();
        let scores = (0..image.batch())
            .map(|b| {
                let mut sum = 0.0;
                let mut count = 0usize;
                for ch in 0..c {
                    for y in 0..h {
                        for x in 0..w {
                            if self.region.at(b, y, x) > 0.0 {
                                sum += image[image.idx(b, ch, y, x)].abs();
                                count += 1;
                            }
                        }
                    }
                }
                if count == 0 {
                    0.0
                } else {
                    sum / count as F
                }
            })
            .collect::<Vec<F>>();
        Ok(DVector::from_vec(scores))
    }
}
