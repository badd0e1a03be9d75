//! # Video Processing Module
//!
//! Frame types, ffmpeg-backed stream readers/writers, the mask compositor,
//! and first-frame preview extraction.

pub mod compositor;
pub mod preview;
pub mod reader;
pub mod types;
pub mod writer;

pub use compositor::{apply_mask, composite_streams, CompositeResult, MatteCompositor, MatteParams};
pub use preview::extract_first_frame;
pub use reader::{check_ffmpeg_available, probe_metadata, FfmpegFrameReader, FrameSource};
pub use types::{EncoderParams, Frame, KeyColor, MaskConvention, VideoMetadata};
pub use writer::{FfmpegFrameWriter, FrameSink};
