//! # Remote Collaborators
//!
//! Clients for the services the pipeline consumes but does not implement:
//! the segmentation model, the object store, and plain video-URL fetching.

pub mod fetch;
pub mod segmentation;
pub mod storage;

pub use fetch::download_to_temp;
pub use segmentation::{HttpSegmenter, HttpSegmenterConfig, SegmentationRequest, Segmenter};
pub use storage::{GcsObjectStore, GcsObjectStoreConfig, ObjectStore};
