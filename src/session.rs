//! Per-video annotation session.
//!
//! Each video being annotated gets its own [`Session`] holding the first
//! frame, the annotation set, and derived identifiers. State never crosses
//! session boundaries, so two videos processed back to back (or from two
//! tasks) cannot interleave writes.

use uuid::Uuid;

use crate::annotation::{AnnotationPoint, AnnotationSet};
use crate::video::Frame;

/// Context for annotating and processing a single video.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    source_url: String,
    first_frame: Option<Frame>,
    annotations: AnnotationSet,
}

impl Session {
    pub fn new<S: Into<String>>(source_url: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_url: source_url.into(),
            first_frame: None,
            annotations: AnnotationSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Store the decoded first frame used by the point-picking canvas.
    pub fn set_first_frame(&mut self, frame: Frame) {
        self.first_frame = Some(frame);
    }

    pub fn first_frame(&self) -> Option<&Frame> {
        self.first_frame.as_ref()
    }

    pub fn add_point(&mut self, point: AnnotationPoint) {
        self.annotations.push(point);
    }

    pub fn clear_points(&mut self) {
        self.annotations.clear();
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    /// Unique name for the session's output object, mirroring the
    /// `greenscreen_<uuid>.mp4` naming of locally stored results.
    pub fn output_name(&self) -> String {
        format!("greenscreen_{}.mp4", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_do_not_share_state() {
        let mut a = Session::new("http://example.com/a.mp4");
        let b = Session::new("http://example.com/b.mp4");

        a.add_point(AnnotationPoint::new(1, 2));
        assert_eq!(a.annotations().len(), 1);
        assert!(b.annotations().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_output_name_embeds_session_id() {
        let session = Session::new("http://example.com/a.mp4");
        let name = session.output_name();
        assert!(name.starts_with("greenscreen_"));
        assert!(name.ends_with(".mp4"));
        assert!(name.contains(&session.id().to_string()));
    }
}
