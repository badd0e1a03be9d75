use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::types::{EncoderParams, Frame};

/// Accepts frames for an output video stream.
///
/// Call [`FrameSink::finish`] to flush and close the stream; dropping an
/// unfinished sink discards the partial output.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Encodes RGB frames into a video file by piping raw pixels into an
/// ffmpeg child process.
///
/// A partial output file is never left behind: `finish` removes it when the
/// encoder exits non-zero, and `Drop` removes it when the writer is
/// abandoned before `finish` (the error path of a composite loop).
pub struct FfmpegFrameWriter {
    output_path: PathBuf,
    width: u32,
    height: u32,
    child: Child,
    stdin: Option<ChildStdin>,
    frames_written: u64,
    finished: bool,
}

impl FfmpegFrameWriter {
    /// Create an encoder writing to `output_path` with the given frame
    /// geometry and rate.
    pub fn create<P: AsRef<Path>>(
        output_path: P,
        width: u32,
        height: u32,
        fps: f64,
        params: &EncoderParams,
    ) -> Result<Self> {
        let output_path = output_path.as_ref().to_path_buf();

        if width == 0 || height == 0 || fps <= 0.0 {
            return Err(VideoError::InvalidParameters {
                details: format!("{}x{} @ {} fps", width, height, fps),
            }
            .into());
        }

        debug!(
            "Opening writer: {:?} ({}x{} @ {:.2} fps, codec {})",
            output_path, width, height, fps, params.codec
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &format!("{}", fps)])
            .args(["-i", "pipe:0"])
            .args(["-c:v", &params.codec])
            .args(["-pix_fmt", "yuv420p"])
            .args(["-crf", &params.crf().to_string()])
            .arg("-y")
            .arg(&output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "could not open encoder input".to_string(),
        })?;

        Ok(Self {
            output_path,
            width,
            height,
            child,
            stdin: Some(stdin),
            frames_written: 0,
            finished: false,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn remove_partial_output(&self) {
        if self.output_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.output_path) {
                warn!("Failed to remove partial output {:?}: {}", self.output_path, e);
            }
        }
    }
}

impl FrameSink for FfmpegFrameWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "frame is {}x{}, writer expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.width,
                    self.height
                ),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodingFailed {
            reason: "writer already finished".to_string(),
        })?;

        stdin
            .write_all(frame.rgb_bytes())
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("encoder write failed: {}", e),
            })?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        // Closing stdin signals end of stream to the encoder
        drop(self.stdin.take());

        let mut stderr_text = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            use std::io::Read;
            let _ = stderr.read_to_string(&mut stderr_text);
        }

        let status = self.child.wait().map_err(|e| VideoError::EncodingFailed {
            reason: format!("failed to wait for encoder: {}", e),
        })?;

        if !status.success() {
            self.remove_partial_output();
            self.finished = true;
            return Err(VideoError::EncodingFailed {
                reason: format!("ffmpeg failed: {}", stderr_text.trim()),
            }
            .into());
        }

        debug!(
            "Encoder finished: {:?} ({} frames)",
            self.output_path, self.frames_written
        );
        self.finished = true;
        Ok(())
    }
}

impl Drop for FfmpegFrameWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Abandoned mid-stream: stop the encoder and discard the truncated file
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.remove_partial_output();
    }
}
