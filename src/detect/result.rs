/// Pixel coordinate on a contour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle covering a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn x1(&self) -> u32 {
        self.x
    }

    pub fn y1(&self) -> u32 {
        self.y
    }

    /// Right edge, `x + width`.
    pub fn x2(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge, `y + height`.
    pub fn y2(&self) -> u32 {
        self.y + self.height
    }
}

/// A connected set of foreground pixels found in one mask.
///
/// Regions are recomputed every frame and never matched across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Closed outer boundary, clockwise in image coordinates.
    pub contour: Vec<Point>,
    /// Number of pixels in the component.
    pub area: u64,
    pub bounding_box: BoundingBox,
}

impl Region {
    /// Share of the frame covered by this region. Zero for an empty frame.
    pub fn area_fraction(&self, frame_area: u64) -> f64 {
        if frame_area == 0 {
            return 0.0;
        }
        self.area as f64 / frame_area as f64
    }
}
