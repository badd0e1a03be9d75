//! Point annotations and display-space coordinate translation.
//!
//! Points are always stored in original-image pixel coordinates. The UI may
//! present the frame uniformly downscaled; [`DisplayScale`] converts clicks
//! back before they go anywhere downstream, because a wrong conversion
//! silently corrupts every annotation sent to the segmentation service.

use serde::{Deserialize, Serialize};

/// A single point annotation in original-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationPoint {
    pub x: u32,
    pub y: u32,
}

impl AnnotationPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Ordered set of point annotations for one video.
///
/// Insertion order is significant: it determines the click ordering sent to
/// the segmentation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSet {
    points: Vec<AnnotationPoint>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: AnnotationPoint) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[AnnotationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Wire form of the coordinates: "[x,y],[x,y],...". Empty set yields an
    /// empty string; the request is still issued.
    pub fn click_coordinates(&self) -> String {
        self.points
            .iter()
            .map(|p| format!("[{},{}]", p.x, p.y))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Wire form of the per-click frame indices. Every click annotates the
    /// first frame: "0,0,...".
    pub fn click_frames(&self) -> String {
        vec!["0"; self.points.len()].join(",")
    }

    /// Wire form of the per-click labels. Every click marks foreground:
    /// "1,1,...".
    pub fn click_labels(&self) -> String {
        vec!["1"; self.points.len()].join(",")
    }
}

impl FromIterator<AnnotationPoint> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = AnnotationPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Uniform scale between the displayed frame and its natural size.
///
/// `scale = displayed_height / natural_height`. Translation is pure and
/// exact: display -> original -> display round-trips within one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    scale: f64,
}

impl DisplayScale {
    /// Build from the displayed and natural frame heights.
    pub fn from_heights(displayed_height: u32, natural_height: u32) -> Option<Self> {
        if displayed_height == 0 || natural_height == 0 {
            return None;
        }
        Some(Self {
            scale: displayed_height as f64 / natural_height as f64,
        })
    }

    pub fn factor(&self) -> f64 {
        self.scale
    }

    /// Translate a display-space coordinate to original pixel space.
    pub fn to_original(&self, display_coord: f64) -> u32 {
        (display_coord / self.scale).round().max(0.0) as u32
    }

    /// Translate an original-space coordinate to display space.
    pub fn to_display(&self, original_coord: u32) -> f64 {
        original_coord as f64 * self.scale
    }

    /// Translate a display-space click to an [`AnnotationPoint`].
    pub fn point_to_original(&self, display_x: f64, display_y: f64) -> AnnotationPoint {
        AnnotationPoint::new(self.to_original(display_x), self.to_original(display_y))
    }
}
