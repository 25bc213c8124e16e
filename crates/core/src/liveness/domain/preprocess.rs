use ndarray::Array4;

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Converts a frame (or a cropped sub-region of it) into the classifier's
/// input tensor: `[1, target_h, target_w, 3]` NHWC float32 in [0,1].
///
/// Resize is center-aligned nearest-neighbor — matching the resize the model
/// saw at training time; substituting a smoother filter would shift the input
/// distribution. Normalization is a plain division by 255 with no mean
/// subtraction, for the same reason.
///
/// A crop is clamped to the frame extents first; a crop left with no overlap
/// falls back to the full frame. The returned tensor is built fresh on every
/// call and is not reused across cycles.
pub fn preprocess(frame: &Frame, target: (u32, u32), crop: Option<&Region>) -> Array4<f32> {
    let src = frame.as_ndarray();

    let (ox, oy, window_w, window_h) =
        match crop.and_then(|r| r.clamp_to(frame.width(), frame.height())) {
            Some(r) => (
                r.x as usize,
                r.y as usize,
                r.width as usize,
                r.height as usize,
            ),
            None => (0, 0, frame.width() as usize, frame.height() as usize),
        };

    let (target_w, target_h) = (target.0 as usize, target.1 as usize);
    let mut tensor = Array4::<f32>::zeros((1, target_h, target_w, 3));

    for y in 0..target_h {
        let src_y =
            oy + (((y as f64 + 0.5) * window_h as f64 / target_h as f64) as usize).min(window_h - 1);
        for x in 0..target_w {
            let src_x = ox
                + (((x as f64 + 0.5) * window_w as f64 / target_w as f64) as usize)
                    .min(window_w - 1);
            for c in 0..3 {
                tensor[[0, y, x, c]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}
