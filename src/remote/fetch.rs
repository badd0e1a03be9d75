use std::io::Write;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{RemoteError, Result};

/// Download a video URL into a scoped temporary file.
///
/// The returned [`NamedTempFile`] deletes itself on drop, so the local copy
/// is removed on both the success and failure paths of whatever consumes it.
pub async fn download_to_temp(client: &reqwest::Client, url: &str) -> Result<NamedTempFile> {
    info!("Downloading video: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| RemoteError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let bytes = response.bytes().await.map_err(|e| RemoteError::FetchFailed {
        url: url.to_string(),
        reason: format!("body read failed: {}", e),
    })?;

    let mut file = tempfile::Builder::new()
        .prefix("greenscreen_")
        .suffix(".mp4")
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;

    debug!("Downloaded {} bytes to {:?}", bytes.len(), file.path());
    Ok(file)
}
