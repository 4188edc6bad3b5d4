use crate::shared::bounding_box::BoundingBox;

/// A face outline in preview-widget coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayRect {
    /// Maps a box from a `frame_w` × `frame_h` frame into a
    /// `view_w` × `view_h` preview that is displayed mirrored.
    ///
    /// Returns `None` for an empty frame.
    pub fn mirrored(
        bbox: &BoundingBox,
        frame_w: u32,
        frame_h: u32,
        view_w: u32,
        view_h: u32,
    ) -> Option<Self> {
        if frame_w == 0 || frame_h == 0 {
            return None;
        }
        let scale_x = view_w as f64 / frame_w as f64;
        let scale_y = view_h as f64 / frame_h as f64;
        let width = bbox.width * scale_x;
        Some(Self {
            x: view_w as f64 - bbox.x * scale_x - width,
            y: bbox.y * scale_y,
            width,
            height: bbox.height * scale_y,
        })
    }

    /// Overlay for the first detected face; extra faces are not drawn.
    pub fn for_first_face(
        boxes: &[BoundingBox],
        frame_w: u32,
        frame_h: u32,
        view_w: u32,
        view_h: u32,
    ) -> Option<Self> {
        boxes
            .first()
            .and_then(|b| Self::mirrored(b, frame_w, frame_h, view_w, view_h))
    }
}
