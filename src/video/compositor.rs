//! Frame-accurate mask compositing.
//!
//! Reads the original video and its segmentation-mask video in lockstep,
//! classifies each mask pixel as background by a luminance threshold, and
//! writes a new video with background pixels replaced by a solid key color.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, VideoError};
use crate::video::reader::{FfmpegFrameReader, FrameSource};
use crate::video::types::{EncoderParams, Frame, KeyColor, MaskConvention};
use crate::video::writer::{FfmpegFrameWriter, FrameSink};

/// Parameters governing one composite operation.
///
/// Constant for the operation's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatteParams {
    /// Color painted over background pixels
    pub key_color: KeyColor,

    /// Luminance threshold on a 0-255 scale. 10 tolerates the compression
    /// artifacts that keep a rendered black backdrop from being exactly 0.
    pub threshold: u8,

    /// Which luminance pole of the mask means "background"
    pub convention: MaskConvention,
}

impl Default for MatteParams {
    fn default() -> Self {
        Self {
            key_color: KeyColor::GREEN,
            threshold: 10,
            convention: MaskConvention::DarkBackground,
        }
    }
}

/// Result of a composite operation
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// Path of the written output video
    pub path: PathBuf,

    /// Frames written: min(original frame count, mask frame count)
    pub frame_count: u64,

    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Copy `original`, painting the key color over every pixel whose
/// corresponding mask pixel classifies as background.
///
/// Pixels are either replaced exactly or left exactly as in the original;
/// there is no blending.
pub fn apply_mask(original: &Frame, mask: &Frame, params: &MatteParams) -> Frame {
    let mut out = original.clone();
    let key = params.key_color.as_rgb();

    let width = original.width().min(mask.width());
    let height = original.height().min(mask.height());

    for y in 0..height {
        for x in 0..width {
            let lum = mask.luminance(x, y);
            if params.convention.is_background(lum, params.threshold) {
                out.set_pixel(x, y, key);
            }
        }
    }

    out
}

/// Lockstep composite loop over two frame streams.
///
/// Stops as soon as either stream is exhausted; a partial pair is never
/// emitted. Returns the number of frames written.
pub fn composite_streams(
    original: &mut dyn FrameSource,
    mask: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    params: &MatteParams,
) -> Result<u64> {
    let mut frames = 0u64;

    loop {
        let original_frame = match original.next_frame()? {
            Some(frame) => frame,
            None => break,
        };
        let mask_frame = match mask.next_frame()? {
            Some(frame) => frame,
            None => break,
        };

        let out = apply_mask(&original_frame, &mask_frame, params);
        sink.write_frame(&out)?;
        frames += 1;
    }

    Ok(frames)
}

/// Composites an original video against its mask video into a green-screen
/// output file.
#[derive(Clone)]
pub struct MatteCompositor {
    params: MatteParams,
    encoder: EncoderParams,
}

impl MatteCompositor {
    pub fn new(params: MatteParams, encoder: EncoderParams) -> Self {
        Self { params, encoder }
    }

    pub fn params(&self) -> &MatteParams {
        &self.params
    }

    /// Run the full composite: open both inputs, stream frame pairs through
    /// the keyer, and encode the result.
    ///
    /// Output dimensions and frame rate follow the original stream. The
    /// inputs are never mutated; on any error the partial output file is
    /// removed before the error propagates.
    pub fn composite<P: AsRef<Path>>(
        &self,
        original_path: P,
        mask_path: P,
        output_path: P,
    ) -> Result<CompositeResult> {
        let original_path = original_path.as_ref();
        let mask_path = mask_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            "Compositing {:?} against mask {:?} -> {:?}",
            original_path, mask_path, output_path
        );

        let mut original = FfmpegFrameReader::open(original_path)?;
        let mut mask = FfmpegFrameReader::open(mask_path)?;

        let metadata = original.metadata().clone();
        let fps = if metadata.fps > 0.0 {
            metadata.fps
        } else {
            self.encoder.fallback_fps
        };

        debug!(
            "Output follows original stream: {}x{} @ {:.2} fps",
            metadata.width, metadata.height, fps
        );

        let mut sink: Box<FfmpegFrameWriter> = Box::new(FfmpegFrameWriter::create(
            output_path,
            metadata.width,
            metadata.height,
            fps,
            &self.encoder,
        )?);

        // Writer drop discards the partial file if this loop errors out
        let frame_count = composite_streams(&mut original, &mut mask, sink.as_mut(), &self.params)?;

        if frame_count == 0 {
            // Both readers open fine on some zero-frame containers; surface
            // the emptier of the two
            let empty = if original.frames_read() == 0 {
                original_path
            } else {
                mask_path
            };
            return Err(VideoError::EmptyVideo {
                path: empty.display().to_string(),
            }
            .into());
        }

        FrameSink::finish(sink)?;

        info!("Composite complete: {} frames written", frame_count);

        Ok(CompositeResult {
            path: output_path.to_path_buf(),
            frame_count,
            width: metadata.width,
            height: metadata.height,
            fps,
        })
    }
}

impl Default for MatteCompositor {
    fn default() -> Self {
        Self::new(MatteParams::default(), EncoderParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory frame source for exercising the lockstep loop without ffmpeg
    struct VecSource {
        frames: std::vec::IntoIter<Frame>,
    }

    impl VecSource {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into_iter(),
            }
        }
    }

    impl FrameSource for VecSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.next())
        }
    }

    /// In-memory sink collecting written frames
    #[derive(Default)]
    struct VecSink {
        frames: Vec<Frame>,
    }

    impl FrameSink for VecSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn gray_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new_filled(width, height, [value, value, value])
    }

    #[test]
    fn test_output_length_is_min_of_inputs() {
        // 10-frame original, 8-frame mask, 640x360
        let originals: Vec<Frame> = (0..10).map(|_| gray_frame(640, 360, 128)).collect();
        let masks: Vec<Frame> = (0..8).map(|_| gray_frame(640, 360, 255)).collect();

        let mut original = VecSource::new(originals);
        let mut mask = VecSource::new(masks);
        let mut sink = VecSink::default();

        let written =
            composite_streams(&mut original, &mut mask, &mut sink, &MatteParams::default())
                .unwrap();

        assert_eq!(written, 8);
        assert_eq!(sink.frames.len(), 8);
        assert_eq!(sink.frames[0].width(), 640);
        assert_eq!(sink.frames[0].height(), 360);
    }

    #[test]
    fn test_shorter_original_also_truncates() {
        let mut original = VecSource::new(vec![gray_frame(4, 4, 100); 3]);
        let mut mask = VecSource::new(vec![gray_frame(4, 4, 0); 7]);
        let mut sink = VecSink::default();

        let written =
            composite_streams(&mut original, &mut mask, &mut sink, &MatteParams::default())
                .unwrap();
        assert_eq!(written, 3);
    }

    #[test]
    fn test_all_below_threshold_yields_full_key_frame() {
        let original = gray_frame(8, 8, 200);
        let mask = gray_frame(8, 8, 0);
        let params = MatteParams::default();

        let out = apply_mask(&original, &mask, &params);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(out.get_pixel(x, y), [0, 255, 0]);
            }
        }
    }

    #[test]
    fn test_at_or_above_threshold_leaves_original_untouched() {
        let mut original = Frame::new_black(4, 4);
        original.set_pixel(2, 3, [7, 8, 9]);
        // Exactly at the threshold counts as foreground
        let mask = gray_frame(4, 4, 10);
        let params = MatteParams::default();

        let out = apply_mask(&original, &mask, &params);
        assert_eq!(out, original);
    }

    #[test]
    fn test_mixed_mask_classification() {
        // Mask luminance [5, 15, 9, 200] -> background [true, false, true, false]
        let original = gray_frame(4, 1, 77);
        let mut mask = Frame::new_black(4, 1);
        for (x, v) in [5u8, 15, 9, 200].into_iter().enumerate() {
            mask.set_pixel(x as u32, 0, [v, v, v]);
        }

        let out = apply_mask(&original, &mask, &MatteParams::default());
        assert_eq!(out.get_pixel(0, 0), [0, 255, 0]);
        assert_eq!(out.get_pixel(1, 0), [77, 77, 77]);
        assert_eq!(out.get_pixel(2, 0), [0, 255, 0]);
        assert_eq!(out.get_pixel(3, 0), [77, 77, 77]);
    }

    #[test]
    fn test_light_background_convention_inverts() {
        let original = gray_frame(2, 1, 50);
        let mut mask = Frame::new_black(2, 1);
        mask.set_pixel(1, 0, [255, 255, 255]);

        let params = MatteParams {
            convention: MaskConvention::LightBackground,
            ..MatteParams::default()
        };

        let out = apply_mask(&original, &mask, &params);
        // Dark mask pixel is now foreground, light one background
        assert_eq!(out.get_pixel(0, 0), [50, 50, 50]);
        assert_eq!(out.get_pixel(1, 0), [0, 255, 0]);
    }

    #[test]
    fn test_composite_is_idempotent() {
        let originals: Vec<Frame> = (0..4)
            .map(|i| gray_frame(16, 16, 40 + i * 10))
            .collect();
        let masks: Vec<Frame> = (0..4)
            .map(|i| gray_frame(16, 16, if i % 2 == 0 { 0 } else { 255 }))
            .collect();
        let params = MatteParams::default();

        let run = |orig: Vec<Frame>, msk: Vec<Frame>| -> Vec<Frame> {
            let mut original = VecSource::new(orig);
            let mut mask = VecSource::new(msk);
            let mut sink = VecSink::default();
            composite_streams(&mut original, &mut mask, &mut sink, &params).unwrap();
            sink.frames
        };

        let first = run(originals.clone(), masks.clone());
        let second = run(originals, masks);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_key_color() {
        let original = gray_frame(2, 2, 100);
        let mask = gray_frame(2, 2, 0);
        let params = MatteParams {
            key_color: KeyColor::new(255, 0, 255),
            ..MatteParams::default()
        };

        let out = apply_mask(&original, &mask, &params);
        assert_eq!(out.get_pixel(0, 0), [255, 0, 255]);
    }

    #[test]
    fn test_empty_streams_write_nothing() {
        let mut original = VecSource::new(vec![]);
        let mut mask = VecSource::new(vec![gray_frame(2, 2, 0)]);
        let mut sink = VecSink::default();

        let written =
            composite_streams(&mut original, &mut mask, &mut sink, &MatteParams::default())
                .unwrap();
        assert_eq!(written, 0);
        assert!(sink.frames.is_empty());
    }
}
