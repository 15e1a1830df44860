use crate::tensor::{Dims, ImageTensor};
use crate::F;
use nalgebra::DVector;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, StandardNormal};

/// Seeded Gaussian noise source.
///
/// Every stochastic call in the subsystem draws from one of these, so a
/// trajectory is fully determined by its seed. Independent sensitivity
/// samples get independent streams via `from_sample_id`.
pub struct NoiseGenerator {
    rng: ChaCha20Rng,
}

impl NoiseGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn from_sample_id(global_seed: u64, sample_id: u64) -> Self {
        // Combine seeds deterministically
        let seed = global_seed.wrapping_add(sample_id.wrapping_mul(0x9e3779b97f4a7c15));
        Self::new(seed)
    }

    /// Tensor of independent N(0, 1) draws
    pub fn standard_normal(&mut self, dims: Dims) -> ImageTensor {
        let n: usize = dims.iter().product();
        ImageTensor::from_raw(dims, self.standard_normal_vec(n))
    }

    pub fn standard_normal_like(&mut self, x: &ImageTensor) -> ImageTensor {
        self.standard_normal(x.dims())
    }

    /// Flat vector of N(0, 1) draws
    pub fn standard_normal_vec(&mut self, n: usize) -> DVector<F> {
        DVector::from_iterator(n, (0..n).map(|_| StandardNormal.sample(&mut self.rng)))
    }
}
