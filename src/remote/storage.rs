use std::path::Path;

use tracing::{debug, info};

use crate::error::{RemoteError, Result};

/// Object store accepting a local file and returning its public URL.
///
/// Upload failure is non-fatal to a pipeline run: the locally produced file
/// remains valid and is returned to the caller regardless.
pub trait ObjectStore {
    fn upload(
        &self,
        local_path: &Path,
        destination: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Configuration for [`GcsObjectStore`]
#[derive(Debug, Clone)]
pub struct GcsObjectStoreConfig {
    pub bucket: String,
    pub access_token: String,
}

/// Google Cloud Storage client using the JSON media-upload API.
///
/// Uploads are guarded with `ifGenerationMatch=0`: if the destination
/// object already exists the request fails with a precondition error and
/// the existing object is left untouched.
pub struct GcsObjectStore {
    client: reqwest::Client,
    config: GcsObjectStoreConfig,
}

impl GcsObjectStore {
    pub fn new(client: reqwest::Client, config: GcsObjectStoreConfig) -> Self {
        Self { client, config }
    }

    fn public_url(&self, destination: &str) -> String {
        format!(
            "https://storage.googleapis.com/{}/{}",
            self.config.bucket, destination
        )
    }
}

impl ObjectStore for GcsObjectStore {
    async fn upload(&self, local_path: &Path, destination: &str) -> Result<String> {
        info!(
            "Uploading {:?} to bucket {} as {}",
            local_path, self.config.bucket, destination
        );

        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| RemoteError::UploadFailed {
                reason: format!("could not read {:?}: {}", local_path, e),
            })?;

        let upload_url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o",
            self.config.bucket
        );

        let response = self
            .client
            .post(&upload_url)
            .query(&[
                ("uploadType", "media"),
                ("name", destination),
                // Generation 0 match: fail instead of overwriting an
                // existing object
                ("ifGenerationMatch", "0"),
            ])
            .bearer_auth(&self.config.access_token)
            .header("Content-Type", "video/mp4")
            .body(bytes)
            .send()
            .await
            .map_err(|e| RemoteError::UploadFailed {
                reason: e.to_string(),
            })?;

        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED {
            return Err(RemoteError::UploadFailed {
                reason: format!("destination already exists: {}", destination),
            }
            .into());
        }

        if !response.status().is_success() {
            return Err(RemoteError::UploadFailed {
                reason: format!("object store returned {}", response.status()),
            }
            .into());
        }

        let url = self.public_url(destination);
        debug!("Upload complete: {}", url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_layout() {
        let store = GcsObjectStore::new(
            reqwest::Client::new(),
            GcsObjectStoreConfig {
                bucket: "my-bucket".to_string(),
                access_token: "token".to_string(),
            },
        );
        assert_eq!(
            store.public_url("greenscreen_abc.mp4"),
            "https://storage.googleapis.com/my-bucket/greenscreen_abc.mp4"
        );
    }
}
