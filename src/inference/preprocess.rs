//! Tile image preprocessing for the classifier.
//!
//! Decode → RGB → square bilinear resize → scale to [0, 1] → per-channel
//! `(x - mean) / std`, laid out channel-major (CHW).

use image::imageops::FilterType;

use crate::config::defaults::{CHANNEL_MEAN, CHANNEL_STD};

/// Number of colour channels fed to the classifier.
pub const NUM_CHANNELS: usize = 3;

/// Normalised square RGB image in CHW layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    size: u32,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Wrap an existing CHW buffer. Returns `None` if the length does not
    /// match `3 * size * size`.
    pub fn from_chw(size: u32, data: Vec<f32>) -> Option<Self> {
        (data.len() == NUM_CHANNELS * (size as usize).pow(2)).then_some(Self { size, data })
    }

    /// Side length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// One channel plane (`size * size` values).
    pub fn channel(&self, c: usize) -> &[f32] {
        let plane = (self.size as usize).pow(2);
        &self.data[c * plane..(c + 1) * plane]
    }

    /// Spatial mean of each channel.
    pub fn channel_means(&self) -> [f32; NUM_CHANNELS] {
        let plane = (self.size as usize).pow(2).max(1) as f64;
        std::array::from_fn(|c| {
            let sum: f64 = self.channel(c).iter().map(|&v| f64::from(v)).sum();
            (sum / plane) as f32
        })
    }
}

/// Decode `bytes` and produce the classifier input tensor.
pub fn preprocess(bytes: &[u8], size: u32) -> Result<ImageTensor, image::ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let resized = image::imageops::resize(&rgb, size, size, FilterType::Triangle);

    let plane = (size as usize).pow(2);
    let mut data = vec![0.0_f32; NUM_CHANNELS * plane];
    for (idx, pixel) in resized.pixels().enumerate() {
        for c in 0..NUM_CHANNELS {
            let scaled = f32::from(pixel[c]) / 255.0;
            data[c * plane + idx] = (scaled - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }

    Ok(ImageTensor { size, data })
}
