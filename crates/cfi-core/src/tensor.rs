use crate::error::{DiffusionError, Result};
use crate::F;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Tensor dimensions `[B, C, H, W]`
pub type Dims = [usize; 4];

/// Dense image batch `[B, C, H, W]`, row-major, nominal range [-1, 1]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageTensor {
    dims: Dims,
    data: DVector<F>,
}

impl ImageTensor {
    pub fn zeros(dims: Dims) -> Self {
        Self {
            dims,
            data: DVector::zeros(dims.iter().product()),
        }
    }

    pub fn filled(dims: Dims, value: F) -> Self {
        Self {
            dims,
            data: DVector::from_element(dims.iter().product(), value),
        }
    }

    pub fn from_vec(dims: Dims, values: Vec<F>) -> Result<Self> {
        let expected: usize = dims.iter().product();
        if values.len() != expected {
            return Err(DiffusionError::InvalidConfig(format!(
                "tensor data length {} does not match dims {:?} ({} elements)",
                values.len(),
                dims,
                expected
            )));
        }
        Ok(Self {
            dims,
            data: DVector::from_vec(values),
        })
    }

    pub(crate) fn from_raw(dims: Dims, data: DVector<F>) -> Self {
        debug_assert_eq!(data.len(), dims.iter().product::<usize>());
        Self { dims, data }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn batch(&self) -> usize {
        self.dims[0]
    }

    pub fn channels(&self) -> usize {
        self.dims[1]
    }

    pub fn height(&self) -> usize {
        self.dims[2]
    }

    pub fn width(&self) -> usize {
        self.dims[3]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of element (b, c, h, w)
    #[inline]
    pub fn idx(&self, b: usize, c: usize, h: usize, w: usize) -> usize {
        ((b * self.dims[1] + c) * self.dims[2] + h) * self.dims[3] + w
    }

    /// Batch index owning flat element i
    #[inline]
    pub fn batch_of(&self, i: usize) -> usize {
        i / (self.dims[1] * self.dims[2] * self.dims[3])
    }

    pub fn data(&self) -> &DVector<F> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DVector<F> {
        &mut self.data
    }

    /// New tensor with the same dims, elements produced by `f(i, self[i])`
    pub fn map_indexed<G>(&self, mut f: G) -> Self
    where
        G: FnMut(usize, F) -> F,
    {
        let data = DVector::from_iterator(
            self.data.len(),
            self.data.iter().enumerate().map(|(i, &v)| f(i, v)),
        );
        Self {
            dims: self.dims,
            data,
        }
    }

    pub fn same_shape(&self, other: &ImageTensor) -> Result<()> {
        if self.dims != other.dims {
            return Err(DiffusionError::ShapeMismatch {
                expected: self.dims,
                got: other.dims,
            });
        }
        Ok(())
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl std::ops::Deref for ImageTensor {
    type Target = DVector<F>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// Binary inpainting mask `[B, 1, H, W]`, 1 = region to regenerate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskTensor {
    dims: Dims,
    data: DVector<F>,
}

impl MaskTensor {
    /// All-zero mask: nothing to inpaint
    pub fn zeros(batch: usize, height: usize, width: usize) -> Self {
        Self {
            dims: [batch, 1, height, width],
            data: DVector::zeros(batch * height * width),
        }
    }

    /// All-one mask: regenerate everything
    pub fn ones(batch: usize, height: usize, width: usize) -> Self {
        Self {
            dims: [batch, 1, height, width],
            data: DVector::from_element(batch * height * width, 1.0),
        }
    }

    pub fn from_vec(batch: usize, height: usize, width: usize, values: Vec<F>) -> Result<Self> {
        if values.len() != batch * height * width {
            return Err(DiffusionError::InvalidConfig(format!(
                "mask data length {} does not match [{}x1x{}x{}]",
                values.len(),
                batch,
                height,
                width
            )));
        }
        if values.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(DiffusionError::InvalidConfig(
                "mask values must be exactly 0 or 1".to_string(),
            ));
        }
        Ok(Self {
            dims: [batch, 1, height, width],
            data: DVector::from_vec(values),
        })
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    pub fn at(&self, b: usize, h: usize, w: usize) -> F {
        self.data[(b * self.dims[2] + h) * self.dims[3] + w]
    }

    pub fn data(&self) -> &DVector<F> {
        &self.data
    }

    /// Check the mask covers the same batch/spatial extent as `image`
    pub fn matches_image(&self, image: &ImageTensor) -> Result<()> {
        let d = image.dims();
        if self.dims[0] != d[0] || self.dims[2] != d[2] || self.dims[3] != d[3] {
            return Err(DiffusionError::ShapeMismatch {
                expected: [d[0], 1, d[2], d[3]],
                got: self.dims,
            });
        }
        Ok(())
    }

    /// `x·mask + original·(1−mask)`, mask broadcast over channels.
    ///
    /// This is the per-step inpainting constraint: pixels outside the
    /// mask are hard-reset to the known clean image.
    pub fn blend(&self, x: &ImageTensor, original: &ImageTensor) -> Result<ImageTensor> {
        x.same_shape(original)?;
        self.matches_image(x)?;

        let [_, c, h, w] = x.dims();
        let plane = h * w;
        Ok(x.map_indexed(|i, xv| {
            let b = i / (c * plane);
            let spatial = i % plane;
            let m = self.data[b * plane + spatial];
            xv * m + original[i] * (1.0 - m)
        }))
    }
}
