pub mod zero;
pub mod oracle;
pub mod blend;
pub mod predictors;

pub use zero::ZeroDenoiser;
pub use oracle::OracleDenoiser;
pub use blend::BlendDenoiser;
pub use predictors::{ConstantPredictor, MaskedEnergyPredictor, MeanIntensityPredictor};
