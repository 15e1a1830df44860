pub mod error;
pub mod tensor;
pub mod schedule;
pub mod noise;
pub mod denoiser;
pub mod forward;
pub mod reverse;

// Core scalar type
pub type F = f64;

pub use error::{DiffusionError, Result};
pub use tensor::{Dims, ImageTensor, MaskTensor};
pub use schedule::{DiffusionConfig, NoiseSchedule, ScheduleKind};
pub use noise::NoiseGenerator;
pub use denoiser::{Denoiser, Predictor};
pub use forward::q_sample;
pub use reverse::p_sample;
