use std::path::Path;

use tracing::debug;

use crate::error::{Result, VideoError};
use crate::video::reader::{FfmpegFrameReader, FrameSource};
use crate::video::types::Frame;

/// Decode exactly the first frame of a video and release the source.
///
/// Used to render the point-picking canvas; no further frames are read.
/// Fails with `EmptyVideo` if the stream yields no frame at all.
pub fn extract_first_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let path = path.as_ref();

    let mut reader = FfmpegFrameReader::open(path)?;
    let frame = reader.next_frame()?.ok_or_else(|| VideoError::EmptyVideo {
        path: path.display().to_string(),
    })?;

    debug!(
        "Extracted first frame from {:?} ({}x{})",
        path,
        frame.width(),
        frame.height()
    );

    // Reader drop stops the decoder without draining the rest of the stream
    Ok(frame)
}
