/// A detected face in source-frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

impl BoundingBox {
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence,
        }
    }

    /// `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Keeps boxes whose confidence reaches `min_confidence`.
    ///
    /// Zero-confidence boxes never pass, even with a threshold of 0.
    pub fn filter_by_confidence(boxes: &[BoundingBox], min_confidence: f64) -> Vec<BoundingBox> {
        boxes
            .iter()
            .filter(|b| b.confidence > 0.0 && b.confidence >= min_confidence)
            .copied()
            .collect()
    }

    /// Clamps the box to a `frame_w` × `frame_h` frame.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> BoundingBox {
        let [x1, y1, x2, y2] = self.corners();
        let fw = frame_w as f64;
        let fh = frame_h as f64;
        BoundingBox::from_corners(
            x1.clamp(0.0, fw),
            y1.clamp(0.0, fh),
            x2.clamp(0.0, fw),
            y2.clamp(0.0, fh),
            self.confidence,
        )
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let a = self.corners();
        let b = other.corners();
        let x1 = a[0].max(b[0]);
        let y1 = a[1].max(b[1]);
        let x2 = a[2].min(b[2]);
        let y2 = a[3].min(b[3]);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}
