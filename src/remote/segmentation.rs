use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::AnnotationSet;
use crate::error::{RemoteError, Result};

/// Request payload for the segmentation service.
///
/// The fixed fields follow the service's point-prompt contract: every click
/// annotates frame 0 and labels foreground, and the whole ordered click set
/// belongs to a single mask object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationRequest {
    pub mask_type: String,
    pub video_fps: u32,
    pub input_video: String,
    pub click_frames: String,
    pub click_labels: String,
    pub output_video: bool,
    pub output_format: String,
    pub output_quality: u32,
    pub annotation_type: String,
    pub click_object_ids: String,
    pub click_coordinates: String,
    pub output_frame_interval: u32,
}

impl SegmentationRequest {
    /// Build the request for one video and its ordered annotation set.
    ///
    /// An empty set still produces a valid request with empty coordinate
    /// and label strings; whether the service accepts it is its own call.
    pub fn new(input_video: &str, annotations: &AnnotationSet) -> Self {
        Self {
            mask_type: "binary".to_string(),
            video_fps: 25,
            input_video: input_video.to_string(),
            click_frames: annotations.click_frames(),
            click_labels: annotations.click_labels(),
            output_video: true,
            output_format: "webp".to_string(),
            output_quality: 100,
            annotation_type: "mask".to_string(),
            click_object_ids: "mask_1".to_string(),
            click_coordinates: annotations.click_coordinates(),
            output_frame_interval: 1,
        }
    }
}

/// Remote segmentation model: accepts a video URL plus point annotations,
/// returns the URL of a generated mask video.
///
/// One logically blocking call per video; implementations do not retry.
pub trait Segmenter {
    fn segment(
        &self,
        request: &SegmentationRequest,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Configuration for [`HttpSegmenter`]
#[derive(Debug, Clone)]
pub struct HttpSegmenterConfig {
    pub api_base_url: String,
    pub model_version: String,
    pub api_token: String,
    pub poll_interval: Duration,
    /// Cap on polling; latency is otherwise unbounded
    pub max_polls: u32,
}

#[derive(Debug, Serialize)]
struct PredictionBody<'a> {
    version: &'a str,
    input: &'a SegmentationRequest,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Segmentation client speaking a prediction-style HTTP API: submit the
/// input, poll the prediction until it reaches a terminal status, return
/// the last output URL.
pub struct HttpSegmenter {
    client: reqwest::Client,
    config: HttpSegmenterConfig,
}

impl HttpSegmenter {
    pub fn new(client: reqwest::Client, config: HttpSegmenterConfig) -> Self {
        Self { client, config }
    }

    async fn submit(&self, request: &SegmentationRequest) -> Result<PredictionResponse> {
        let url = format!("{}/predictions", self.config.api_base_url);
        let body = PredictionBody {
            version: &self.config.model_version,
            input: request,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RemoteError::SegmentationFailed {
                reason: format!("submit failed: {}", e),
            })?;

        response
            .json()
            .await
            .map_err(|e| {
                RemoteError::SegmentationFailed {
                    reason: format!("malformed prediction response: {}", e),
                }
                .into()
            })
    }

    async fn poll(&self, id: &str) -> Result<PredictionResponse> {
        let url = format!("{}/predictions/{}", self.config.api_base_url, id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RemoteError::SegmentationFailed {
                reason: format!("poll failed: {}", e),
            })?;

        response
            .json()
            .await
            .map_err(|e| {
                RemoteError::SegmentationFailed {
                    reason: format!("malformed prediction response: {}", e),
                }
                .into()
            })
    }
}

impl Segmenter for HttpSegmenter {
    async fn segment(&self, request: &SegmentationRequest) -> Result<String> {
        info!(
            "Submitting segmentation for {} ({} clicks)",
            request.input_video,
            request.click_labels.split(',').filter(|s| !s.is_empty()).count()
        );

        let mut prediction = self.submit(request).await?;

        let mut polls = 0u32;
        while !is_terminal(&prediction.status) {
            if polls >= self.config.max_polls {
                return Err(RemoteError::SegmentationFailed {
                    reason: format!("gave up after {} polls (status: {})", polls, prediction.status),
                }
                .into());
            }
            polls += 1;
            debug!("Prediction {} status: {}", prediction.id, prediction.status);
            tokio::time::sleep(self.config.poll_interval).await;
            prediction = self.poll(&prediction.id).await?;
        }

        if prediction.status != "succeeded" {
            let detail = prediction
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| prediction.status.clone());
            return Err(RemoteError::SegmentationFailed { reason: detail }.into());
        }

        mask_url_from_output(prediction.output.as_ref()).ok_or_else(|| {
            warn!("Prediction succeeded but produced no output URL");
            RemoteError::SegmentationFailed {
                reason: "no output URL found in response".to_string(),
            }
            .into()
        })
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "succeeded" | "failed" | "canceled")
}

/// The service may return a single URL or a list of them; the mask video is
/// the last entry.
fn mask_url_from_output(output: Option<&serde_json::Value>) -> Option<String> {
    match output? {
        serde_json::Value::String(url) => Some(url.clone()),
        serde_json::Value::Array(items) => items
            .iter()
            .rev()
            .find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationPoint;

    #[test]
    fn test_request_carries_ordered_clicks() {
        let annotations: AnnotationSet = [
            AnnotationPoint::new(120, 45),
            AnnotationPoint::new(300, 200),
        ]
        .into_iter()
        .collect();

        let request = SegmentationRequest::new("http://example.com/a.mp4", &annotations);
        assert_eq!(request.click_coordinates, "[120,45],[300,200]");
        assert_eq!(request.click_frames, "0,0");
        assert_eq!(request.click_labels, "1,1");
        assert_eq!(request.mask_type, "binary");
        assert_eq!(request.click_object_ids, "mask_1");
        assert!(request.output_video);
    }

    #[test]
    fn test_empty_annotation_set_still_builds_request() {
        let request = SegmentationRequest::new("http://example.com/a.mp4", &AnnotationSet::new());
        assert_eq!(request.click_coordinates, "");
        assert_eq!(request.click_frames, "");
        assert_eq!(request.click_labels, "");
    }

    #[test]
    fn test_mask_url_prefers_last_list_entry() {
        let output = serde_json::json!(["http://a/progress.webp", "http://a/output_video.mp4"]);
        assert_eq!(
            mask_url_from_output(Some(&output)),
            Some("http://a/output_video.mp4".to_string())
        );

        let single = serde_json::json!("http://a/output_video.mp4");
        assert_eq!(
            mask_url_from_output(Some(&single)),
            Some("http://a/output_video.mp4".to_string())
        );

        assert_eq!(mask_url_from_output(None), None);
        assert_eq!(mask_url_from_output(Some(&serde_json::json!([]))), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(is_terminal("succeeded"));
        assert!(is_terminal("failed"));
        assert!(is_terminal("canceled"));
        assert!(!is_terminal("processing"));
        assert!(!is_terminal("starting"));
    }
}
