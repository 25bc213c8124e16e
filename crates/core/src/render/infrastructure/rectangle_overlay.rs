use crate::render::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Default stroke color (RGB).
const DEFAULT_COLOR: [u8; 3] = [0, 80, 255];

/// Default stroke thickness in pixels.
const DEFAULT_THICKNESS: u32 = 2;

/// Draws unfilled rectangles at detection boxes.
///
/// The stroke is painted from each region's `x`/`y`/`width`/`height` only —
/// corner coordinates are never reinterpreted as extents. Regions are
/// clamped to the frame, so a box spilling past an edge paints just its
/// visible part; regions with no visible part are skipped.
pub struct RectangleOverlay {
    color: [u8; 3],
    thickness: u32,
}

impl RectangleOverlay {
    pub fn new(color: [u8; 3], thickness: u32) -> Self {
        Self {
            color,
            thickness: thickness.max(1),
        }
    }
}

impl Default for RectangleOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR, DEFAULT_THICKNESS)
    }
}

impl OverlayRenderer for RectangleOverlay {
    fn draw(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let fw = frame.width();
        let fh = frame.height();
        let stride = fw as usize * 3;
        let data = frame.data_mut();

        for region in regions {
            let Some(r) = region.clamp_to(fw, fh) else {
                continue;
            };

            let x1 = r.x as usize;
            let y1 = r.y as usize;
            let x2 = (r.x + r.width) as usize;
            let y2 = (r.y + r.height) as usize;
            let t = self.thickness as usize;

            for y in y1..y2 {
                let on_horizontal_edge = y < y1 + t || y + t >= y2;
                if on_horizontal_edge {
                    for x in x1..x2 {
                        paint(data, stride, x, y, self.color);
                    }
                } else {
                    for x in x1..(x1 + t).min(x2) {
                        paint(data, stride, x, y, self.color);
                    }
                    for x in x2.saturating_sub(t).max(x1)..x2 {
                        paint(data, stride, x, y, self.color);
                    }
                }
            }
        }

        Ok(())
    }
}

#[inline]
fn paint(data: &mut [u8], stride: usize, x: usize, y: usize, color: [u8; 3]) {
    let idx = y * stride + x * 3;
    data[idx..idx + 3].copy_from_slice(&color);
}
