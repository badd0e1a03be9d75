use thiserror::Error;

/// Main error type for the greenscreen library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Remote collaborator error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    /// A video path or URL cannot be opened or decoded (missing file,
    /// corrupt container, unsupported codec).
    #[error("Source unreadable: {path} - {reason}")]
    SourceUnreadable { path: String, reason: String },

    /// A stream yielded zero frames where at least one was required.
    #[error("Video contains no decodable frames: {path}")]
    EmptyVideo { path: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors from remote collaborators (segmentation service, object store,
/// video source fetch)
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Failed to fetch video from {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Segmentation failed: {reason}")]
    SegmentationFailed { reason: String },

    /// Object-store upload failed. Non-fatal to the pipeline: the locally
    /// produced file is still returned to the caller.
    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried by the caller;
    /// the library itself never retries)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // IO and network errors might be temporary
            Self::Io(_) => true,
            Self::Remote(RemoteError::FetchFailed { .. }) => true,
            Self::Remote(RemoteError::UploadFailed { .. }) => true,
            Self::Video(VideoError::SourceUnreadable { .. }) => true,
            // Most other errors are permanent
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::SourceUnreadable { path, .. }) => {
                format!(
                    "Could not read video '{}'. Please check the file exists and is a supported format.",
                    path
                )
            }
            Self::Video(VideoError::EmptyVideo { path }) => {
                format!("Video '{}' contains no frames.", path)
            }
            Self::Remote(RemoteError::SegmentationFailed { reason }) => {
                format!("The segmentation service returned no usable mask: {}", reason)
            }
            Self::Remote(RemoteError::UploadFailed { reason }) => {
                format!(
                    "Upload to the object store failed ({}). The local output file is still available.",
                    reason
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failure_is_recoverable() {
        let err: CompositorError = RemoteError::FetchFailed {
            url: "http://example.com/a.mp4".to_string(),
            reason: "timeout".to_string(),
        }
        .into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_empty_video_is_not_recoverable() {
        let err: CompositorError = VideoError::EmptyVideo {
            path: "a.mp4".to_string(),
        }
        .into();
        assert!(!err.is_recoverable());
        assert!(err.user_message().contains("no frames"));
    }
}
