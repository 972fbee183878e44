//! Retinal image → classifier input tensor.
//!
//! The model expects a single RGB image, 224x224, pixel values scaled to
//! `[0, 1]`, laid out NHWC with batch size 1.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

use super::ClassifierError;

/// Square input edge expected by the model.
pub const INPUT_SIZE: u32 = 224;
/// RGB.
pub const CHANNELS: usize = 3;

/// Maximum encoded image size accepted before decoding (50 MB).
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;
/// Smallest plausible encoded image (minimal PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Normalized `[1, 224, 224, 3]` float tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    /// Read and preprocess an image file.
    pub fn from_path(path: &Path) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode and preprocess an encoded image (JPEG, PNG, TIFF, BMP).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassifierError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClassifierError::Decode(format!(
                "image too large ({} bytes)",
                bytes.len()
            )));
        }
        if bytes.len() < MIN_IMAGE_BYTES {
            return Err(ClassifierError::Decode(format!(
                "image too small ({} bytes)",
                bytes.len()
            )));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| ClassifierError::Decode(e.to_string()))?;
        Ok(Self::from_image(&img))
    }

    /// Resize (nearest neighbour, aspect ratio not preserved) and rescale.
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgb = img
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Nearest)
            .to_rgb8();
        let data = rgb
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect();
        Self { data }
    }

    /// NHWC shape.
    pub fn shape(&self) -> [usize; 4] {
        [1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn tensor_has_model_shape() {
        let tensor = ImageTensor::from_bytes(&encoded_png(640, 480, [10, 20, 30])).unwrap();
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(tensor.as_slice().len(), 224 * 224 * 3);
    }

    #[test]
    fn pixels_scaled_to_unit_interval() {
        let tensor = ImageTensor::from_bytes(&encoded_png(300, 300, [255, 0, 51])).unwrap();
        let px = &tensor.as_slice()[..3];
        assert_eq!(px[0], 1.0);
        assert_eq!(px[1], 0.0);
        assert!((px[2] - 0.2).abs() < 1e-6);
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn grayscale_input_becomes_rgb() {
        let gray = image::GrayImage::from_pixel(50, 50, image::Luma([128]));
        let tensor = ImageTensor::from_image(&DynamicImage::ImageLuma8(gray));
        let px = &tensor.as_slice()[..3];
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }

    #[test]
    fn rejects_tiny_payload() {
        let err = ImageTensor::from_bytes(&[0x89, 0x50, 0x4E]).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = ImageTensor::from_bytes(&[0u8; 512]).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ImageTensor::from_path(Path::new("/nonexistent/retina.png")).unwrap_err();
        assert!(matches!(err, ClassifierError::Io(_)));
    }
}
