use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegionError {
    #[error("bottom-right corner ({br_x}, {br_y}) must lie strictly below and right of top-left ({tl_x}, {tl_y})")]
    InvertedCorners {
        tl_x: i32,
        tl_y: i32,
        br_x: i32,
        br_y: i32,
    },
}

/// An axis-aligned face bounding box in frame pixel coordinates.
///
/// Invariant: `width > 0` and `height > 0`. A detector that cannot honor
/// that for a candidate box drops the candidate instead of emitting it.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Detector confidence for this box, in [0, 1].
    pub confidence: f32,
}

impl Region {
    /// Builds a region from its top-left and bottom-right corners.
    ///
    /// The extents are computed into fresh values; the corner arguments are
    /// never written through while being read. Zero-area and inverted boxes
    /// are rejected.
    pub fn from_corners(
        top_left: (i32, i32),
        bottom_right: (i32, i32),
        confidence: f32,
    ) -> Result<Self, RegionError> {
        let width = bottom_right.0 - top_left.0;
        let height = bottom_right.1 - top_left.1;
        if width <= 0 || height <= 0 {
            return Err(RegionError::InvertedCorners {
                tl_x: top_left.0,
                tl_y: top_left.1,
                br_x: bottom_right.0,
                br_y: bottom_right.1,
            });
        }
        Ok(Self {
            x: top_left.0,
            y: top_left.1,
            width,
            height,
            confidence,
        })
    }

    /// Clamps the region to a `frame_w` × `frame_h` frame.
    ///
    /// Returns `None` when no part of the region overlaps the frame.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(frame_w as i32);
        let y2 = (self.y + self.height).min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: self.confidence,
        })
    }
}
