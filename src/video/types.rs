use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Represents a single video frame
///
/// This is a simple wrapper around an RGB image buffer that provides
/// convenient methods for the pixel classification used by the compositor.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        let buffer = ImageBuffer::new(width, height);
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    /// Get the width of the frame
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Get the height of the frame
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let pixel = self.buffer.get_pixel(x, y);
        [pixel[0], pixel[1], pixel[2]]
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// BT.601 grayscale luminance of the pixel at the given coordinates,
    /// on a 0-255 scale. Matches the weighting used by common BGR-to-gray
    /// conversions, so thresholds tuned against those apply unchanged.
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        let [r, g, b] = self.get_pixel(x, y);
        luminance_rgb(r, g, b)
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Get a mutable reference to the underlying image buffer
    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Convert the frame to raw RGB bytes (width * height * 3)
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.buffer.as_raw().clone()
    }

    /// Borrow the frame's raw RGB bytes without copying
    pub fn rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// BT.601 luminance in integer arithmetic, 0-255.
pub fn luminance_rgb(r: u8, g: u8, b: u8) -> u8 {
    ((299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000) as u8
}

/// Solid color used to replace background pixels in the composite output.
///
/// Constant for the lifetime of one composite operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl KeyColor {
    /// Pure chroma green: maximum green channel, zero red and blue.
    pub const GREEN: KeyColor = KeyColor { r: 0, g: 255, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn as_rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for KeyColor {
    fn default() -> Self {
        Self::GREEN
    }
}

/// Which luminance pole of a mask frame means "background".
///
/// Segmentation services conventionally render masked-out regions as black,
/// but the convention is an explicit parameter here rather than a hardcoded
/// assumption: if a service renders background as white instead, select
/// [`MaskConvention::LightBackground`] and nothing inverts silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskConvention {
    /// Pixels darker than the threshold are background (near-black matte).
    #[default]
    DarkBackground,
    /// Pixels at or above the threshold are background (near-white matte).
    LightBackground,
}

impl MaskConvention {
    /// Classify a mask pixel's luminance as background.
    pub fn is_background(&self, luminance: u8, threshold: u8) -> bool {
        match self {
            MaskConvention::DarkBackground => luminance < threshold,
            MaskConvention::LightBackground => luminance >= threshold,
        }
    }
}

/// Video stream metadata probed from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Declared frame count, when the container reports one.
    pub frame_count: Option<u64>,
}

impl VideoMetadata {
    /// Size in bytes of one raw RGB24 frame at these dimensions.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Encoder parameters for the output writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderParams {
    /// Video codec to use for output
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Frame rate used when the source container does not report one
    pub fallback_fps: f64,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            quality: 85,
            fallback_fps: 25.0,
        }
    }
}

impl EncoderParams {
    /// Map the 0-100 quality scale onto libx264's CRF scale (lower is better).
    pub fn crf(&self) -> u8 {
        (51.0 - (self.quality.min(100) as f32 / 100.0) * 51.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weighting() {
        assert_eq!(luminance_rgb(0, 0, 0), 0);
        assert_eq!(luminance_rgb(255, 255, 255), 255);
        // Green dominates the BT.601 weighting
        assert!(luminance_rgb(0, 255, 0) > luminance_rgb(255, 0, 0));
        assert!(luminance_rgb(255, 0, 0) > luminance_rgb(0, 0, 255));
    }

    #[test]
    fn test_mask_convention_classification() {
        // Luminance [5, 15, 9, 200] at threshold 10
        let values = [5u8, 15, 9, 200];
        let classified: Vec<bool> = values
            .iter()
            .map(|&v| MaskConvention::DarkBackground.is_background(v, 10))
            .collect();
        assert_eq!(classified, vec![true, false, true, false]);

        // Light-background convention inverts the classification
        let inverted: Vec<bool> = values
            .iter()
            .map(|&v| MaskConvention::LightBackground.is_background(v, 10))
            .collect();
        assert_eq!(inverted, vec![false, true, false, true]);
    }

    #[test]
    fn test_frame_pixel_roundtrip() {
        let mut frame = Frame::new_black(4, 2);
        frame.set_pixel(3, 1, [10, 20, 30]);
        assert_eq!(frame.get_pixel(3, 1), [10, 20, 30]);
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_frame_rgb_bytes_roundtrip() {
        let frame = Frame::new_filled(2, 2, [1, 2, 3]);
        let bytes = frame.to_rgb_bytes();
        assert_eq!(bytes.len(), 12);
        let restored = Frame::from_rgb_bytes(2, 2, bytes).unwrap();
        assert_eq!(restored, frame);
    }

    #[test]
    fn test_quality_to_crf() {
        let params = EncoderParams::default();
        assert!(params.crf() <= 51);
        let lossless = EncoderParams {
            quality: 100,
            ..EncoderParams::default()
        };
        assert_eq!(lossless.crf(), 0);
    }
}
