use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{
    config::Config,
    error::{CompositorError, Result},
    remote::{download_to_temp, ObjectStore, SegmentationRequest, Segmenter},
    session::Session,
    video::{extract_first_frame, CompositeResult, Frame, MatteCompositor},
};

/// Result of one end-to-end pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Locally written green-screen video; valid even when the upload fails
    pub local_path: PathBuf,

    /// Public URL of the uploaded copy, when an object store is configured
    /// and the upload succeeded
    pub remote_url: Option<String>,

    /// Frames in the composite output
    pub frame_count: u64,
}

/// Orchestrates the full green-screen pipeline for one session at a time:
/// fetch the original, submit annotations for segmentation, fetch the mask,
/// composite, and optionally upload the result.
///
/// Videos are processed sequentially; the engine holds no state across
/// sessions. Errors propagate to the caller undecorated - retrying the
/// whole pipeline is the caller's decision.
pub struct PipelineEngine<S, O> {
    config: Config,
    compositor: MatteCompositor,
    segmenter: S,
    store: Option<O>,
    http: reqwest::Client,
    output_dir: PathBuf,
}

impl<S: Segmenter, O: ObjectStore> PipelineEngine<S, O> {
    pub fn new<P: Into<PathBuf>>(
        config: Config,
        segmenter: S,
        store: Option<O>,
        output_dir: P,
    ) -> Self {
        let compositor = MatteCompositor::new(config.matte.clone(), config.encoder.clone());
        Self {
            config,
            compositor,
            segmenter,
            store,
            http: reqwest::Client::new(),
            output_dir: output_dir.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the session's video and decode its first frame for the
    /// point-picking canvas. The temporary download is removed before this
    /// returns, on success and failure alike.
    pub async fn load_preview(&self, session: &mut Session) -> Result<Frame> {
        let temp = download_to_temp(&self.http, session.source_url()).await?;
        let path = temp.path().to_path_buf();

        let frame = tokio::task::spawn_blocking(move || extract_first_frame(&path))
            .await
            .map_err(|e| CompositorError::generic(format!("preview task failed: {}", e)))??;

        session.set_first_frame(frame.clone());
        Ok(frame)
    }

    /// Run the pipeline for one annotated session.
    pub async fn process(&self, session: &Session) -> Result<PipelineOutput> {
        info!(
            "Processing session {} ({} annotation points)",
            session.id(),
            session.annotations().len()
        );

        // The request is issued even with zero points; the service decides
        // whether an unannotated video is workable
        let request = SegmentationRequest::new(session.source_url(), session.annotations());
        let mask_url = self.segmenter.segment(&request).await?;
        info!("Segmentation produced mask video: {}", mask_url);

        // Both downloads are scoped temp files, removed on every exit path
        let original = download_to_temp(&self.http, session.source_url()).await?;
        let mask = download_to_temp(&self.http, &mask_url).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join(session.output_name());

        let result = self
            .composite_blocking(
                original.path().to_path_buf(),
                mask.path().to_path_buf(),
                output_path.clone(),
            )
            .await?;

        let remote_url = self.upload_result(&output_path, &session.output_name()).await;

        Ok(PipelineOutput {
            local_path: result.path,
            remote_url,
            frame_count: result.frame_count,
        })
    }

    /// Run the blocking composite off the async runtime.
    async fn composite_blocking(
        &self,
        original: PathBuf,
        mask: PathBuf,
        output: PathBuf,
    ) -> Result<CompositeResult> {
        let compositor = self.compositor.clone();
        tokio::task::spawn_blocking(move || compositor.composite(&original, &mask, &output))
            .await
            .map_err(|e| CompositorError::generic(format!("composite task failed: {}", e)))?
    }

    /// Upload the finished composite. Failure is logged, not fatal: the
    /// local file stays usable either way.
    async fn upload_result(&self, local_path: &Path, destination: &str) -> Option<String> {
        let store = self.store.as_ref()?;

        match store.upload(local_path, destination).await {
            Ok(url) => {
                info!("Result uploaded: {}", url);
                Some(url)
            }
            Err(e) => {
                warn!("Upload failed, keeping local result only: {}", e.user_message());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationPoint;
    use crate::error::RemoteError;
    use std::sync::Mutex;

    /// Segmenter that records the request and fails, so `process` stops
    /// before any network fetch.
    struct RecordingSegmenter {
        seen: Mutex<Vec<SegmentationRequest>>,
    }

    impl Segmenter for RecordingSegmenter {
        async fn segment(&self, request: &SegmentationRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            Err(RemoteError::SegmentationFailed {
                reason: "no usable mask".to_string(),
            }
            .into())
        }
    }

    struct NullStore;

    impl ObjectStore for NullStore {
        async fn upload(&self, _local_path: &Path, _destination: &str) -> Result<String> {
            Err(RemoteError::UploadFailed {
                reason: "unused".to_string(),
            }
            .into())
        }
    }

    fn engine_with(
        segmenter: RecordingSegmenter,
    ) -> PipelineEngine<RecordingSegmenter, NullStore> {
        PipelineEngine::new(Config::default(), segmenter, None, "test_output")
    }

    #[tokio::test]
    async fn test_segmentation_request_issued_with_empty_points() {
        let segmenter = RecordingSegmenter {
            seen: Mutex::new(Vec::new()),
        };
        let engine = engine_with(segmenter);
        let session = Session::new("http://example.com/video.mp4");

        let result = engine.process(&session).await;
        assert!(matches!(
            result,
            Err(CompositorError::Remote(RemoteError::SegmentationFailed { .. }))
        ));

        // The call was still issued, with empty coordinate and label strings
        let seen = engine.segmenter.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].click_coordinates, "");
        assert_eq!(seen[0].click_labels, "");
        assert_eq!(seen[0].input_video, "http://example.com/video.mp4");
    }

    #[tokio::test]
    async fn test_segmentation_request_carries_session_annotations() {
        let segmenter = RecordingSegmenter {
            seen: Mutex::new(Vec::new()),
        };
        let engine = engine_with(segmenter);

        let mut session = Session::new("http://example.com/video.mp4");
        session.add_point(AnnotationPoint::new(10, 20));
        session.add_point(AnnotationPoint::new(30, 40));

        let _ = engine.process(&session).await;

        let seen = engine.segmenter.seen.lock().unwrap();
        assert_eq!(seen[0].click_coordinates, "[10,20],[30,40]");
        assert_eq!(seen[0].click_frames, "0,0");
    }
}
