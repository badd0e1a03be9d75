use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::types::{Frame, VideoMetadata};

/// Ordered, finite, sequential access to the frames of a video stream.
///
/// Yields `Ok(None)` once the stream is exhausted. Implementations own
/// whatever decoder resources back the stream and release them on drop.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Check that the ffmpeg binary is on the PATH
pub fn check_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe container metadata with ffprobe.
///
/// Fails with `SourceUnreadable` if the file cannot be opened or carries no
/// video stream.
pub fn probe_metadata<P: AsRef<Path>>(path: P) -> Result<VideoMetadata> {
    let path = path.as_ref();

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,nb_frames",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::SourceUnreadable {
            path: path.display().to_string(),
            reason: format!("failed to run ffprobe: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VideoError::SourceUnreadable {
            path: path.display().to_string(),
            reason: format!("ffprobe failed: {}", stderr.trim()),
        }
        .into());
    }

    parse_probe_output(&output.stdout).ok_or_else(|| {
        VideoError::SourceUnreadable {
            path: path.display().to_string(),
            reason: "no video stream found".to_string(),
        }
        .into()
    })
}

fn parse_probe_output(stdout: &[u8]) -> Option<VideoMetadata> {
    let value: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    let stream = value.get("streams")?.get(0)?;

    let width = stream.get("width")?.as_u64()? as u32;
    let height = stream.get("height")?.as_u64()? as u32;

    let fps = stream
        .get("r_frame_rate")
        .and_then(|v| v.as_str())
        .and_then(parse_frame_rate)
        .unwrap_or(0.0);

    let frame_count = stream
        .get("nb_frames")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<u64>().ok());

    Some(VideoMetadata {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Parse an ffprobe rational like "30000/1001" or "25/1".
fn parse_frame_rate(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Decodes a video file into a sequence of RGB frames by streaming raw
/// pixels from an ffmpeg child process.
///
/// The child process and its pipe are released when the reader is dropped,
/// whether the read loop completed or an error aborted it.
pub struct FfmpegFrameReader {
    path: PathBuf,
    metadata: VideoMetadata,
    child: Child,
    stdout: ChildStdout,
    frames_read: u64,
    finished: bool,
}

impl FfmpegFrameReader {
    /// Open a video file for sequential frame reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = probe_metadata(&path)?;

        if metadata.width == 0 || metadata.height == 0 {
            return Err(VideoError::SourceUnreadable {
                path: path.display().to_string(),
                reason: "stream reports zero dimensions".to_string(),
            }
            .into());
        }

        debug!(
            "Opening reader: {:?} ({}x{} @ {:.2} fps)",
            path, metadata.width, metadata.height, metadata.fps
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::SourceUnreadable {
                path: path.display().to_string(),
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::SourceUnreadable {
            path: path.display().to_string(),
            reason: "could not capture decoder output".to_string(),
        })?;

        Ok(Self {
            path,
            metadata,
            child,
            stdout,
            frames_read: 0,
            finished: false,
        })
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Fill `buf` from the pipe. Returns the number of bytes read; fewer
    /// than `buf.len()` only at end of stream.
    fn read_full(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl FrameSource for FfmpegFrameReader {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let frame_size = self.metadata.frame_size();
        let mut buf = vec![0u8; frame_size];

        let filled = self.read_full(&mut buf).map_err(|e| VideoError::SourceUnreadable {
            path: self.path.display().to_string(),
            reason: format!("decode read failed: {}", e),
        })?;

        if filled == 0 {
            self.finished = true;
            return Ok(None);
        }

        if filled < frame_size {
            // Truncated tail; the container lied or the decoder died mid-frame
            warn!(
                "Discarding truncated frame tail from {:?} ({} of {} bytes)",
                self.path, filled, frame_size
            );
            self.finished = true;
            return Ok(None);
        }

        let frame = Frame::from_rgb_bytes(self.metadata.width, self.metadata.height, buf)
            .ok_or_else(|| VideoError::SourceUnreadable {
                path: self.path.display().to_string(),
                reason: "frame buffer size mismatch".to_string(),
            })?;

        self.frames_read += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        // The decoder may still be running if reading stopped early
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [{
                "width": 640,
                "height": 360,
                "r_frame_rate": "25/1",
                "nb_frames": "10"
            }]
        }"#;
        let metadata = parse_probe_output(json).unwrap();
        assert_eq!(metadata.width, 640);
        assert_eq!(metadata.height, 360);
        assert_eq!(metadata.fps, 25.0);
        assert_eq!(metadata.frame_count, Some(10));
        assert_eq!(metadata.frame_size(), 640 * 360 * 3);
    }

    #[test]
    fn test_parse_probe_output_no_streams() {
        assert!(parse_probe_output(br#"{"streams": []}"#).is_none());
        assert!(parse_probe_output(b"not json").is_none());
    }
}
