//! # greenscreen
//!
//! Turn a segmentation-mask video and its original footage into a
//! green-screen (background-replaced) composite.
//!
//! The core is a frame-accurate compositor: both videos are read in
//! lockstep, each mask frame is reduced to luminance and thresholded into a
//! background classification, and the original frame is copied with
//! background pixels painted in a solid key color. Around the core sits the
//! plumbing of a full pipeline: point annotation on the first frame, a
//! remote segmentation service that turns those points into a mask video,
//! and optional upload of the result to an object store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use greenscreen::video::MatteCompositor;
//!
//! # fn main() -> greenscreen::Result<()> {
//! let compositor = MatteCompositor::default();
//! let result = compositor.composite("original.mp4", "mask.mp4", "keyed.mp4")?;
//! println!("wrote {} frames", result.frame_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - frame types, ffmpeg-backed stream I/O, the mask compositor
//! - [`annotation`] - point annotations and display-space translation
//! - [`session`] - per-video annotation context
//! - [`remote`] - segmentation service, object store, and fetch clients
//! - [`pipeline`] - end-to-end orchestration
//! - [`config`] - configuration management
//!
//! ## Mask conventions
//!
//! Background classification assumes the segmentation service renders
//! masked-out regions near-black ([`video::MaskConvention::DarkBackground`]).
//! If a service renders background as white instead, select
//! [`video::MaskConvention::LightBackground`] rather than relying on a
//! silent inversion.

pub mod annotation;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod session;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    annotation::{AnnotationPoint, AnnotationSet, DisplayScale},
    config::Config,
    error::{CompositorError, Result},
    pipeline::{PipelineEngine, PipelineOutput},
    session::Session,
    video::{KeyColor, MaskConvention, MatteCompositor, MatteParams},
};
