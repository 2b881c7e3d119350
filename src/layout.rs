//! Page geometry: transformation matrices, points and span boxes

use std::fmt;

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Translation by (tx, ty)
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: tx, f: ty }
    }

    /// Counter-clockwise rotation by a multiple of 90 degrees, placed at (x, y)
    pub fn rotation_at(quarter_turns: u8, x: f32, y: f32) -> Self {
        let (cos, sin) = match quarter_turns % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        Self { a: cos, b: sin, c: -sin, d: cos, e: x, f: y }
    }

    /// `self` followed by `other` (PDF row-vector convention)
    ///
    /// The text rendering matrix is `text_matrix.then(&ctm)`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, x: f32, y: f32) -> Point {
        Point {
            x: self.a * x + self.c * y + self.e,
            y: self.b * x + self.d * y + self.f,
        }
    }

    /// Apply only the linear part (no translation) to a vector
    pub fn transform_vector(&self, x: f32, y: f32) -> Point {
        Point {
            x: self.a * x + self.c * y,
            y: self.b * x + self.d * y,
        }
    }

    /// Check if this is (approximately) the identity matrix
    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < 0.001 &&
        self.b.abs() < 0.001 &&
        self.c.abs() < 0.001 &&
        (self.d - 1.0).abs() < 0.001 &&
        self.e.abs() < 0.001 &&
        self.f.abs() < 0.001
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Axis-aligned box in page space.
///
/// Page space has its origin at the top-left corner of the MediaBox with y
/// growing downwards, so `y1` is the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Smallest box containing all points
    pub fn bounding(points: &[Point]) -> Self {
        // Empty seed; `Rect::new` would sort it into an infinite box
        let mut rect = Rect {
            x0: f32::MAX,
            y0: f32::MAX,
            x1: f32::MIN,
            y1: f32::MIN,
        };
        for p in points {
            rect.x0 = rect.x0.min(p.x);
            rect.y0 = rect.y0.min(p.y);
            rect.x1 = rect.x1.max(p.x);
            rect.y1 = rect.y1.max(p.y);
        }
        rect
    }

    /// All four edges are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1].iter().all(|v| v.is_finite())
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Orientation inferred from the box shape alone
    pub fn orientation(&self) -> Orientation {
        if self.height() > self.width() {
            Orientation::Rotated90
        } else {
            Orientation::Normal
        }
    }

    /// Where replacement text starts for a span of the given orientation
    ///
    /// Normal text starts at the bottom-left corner, rotated text at the
    /// bottom-right corner.
    pub fn anchor(&self, orientation: Orientation) -> Point {
        match orientation {
            Orientation::Normal => Point { x: self.x0, y: self.y1 },
            Orientation::Rotated90 => Point { x: self.x1, y: self.y1 },
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.1}, {:.1}, {:.1}, {:.1}]", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Reading direction of a matched span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Normal,
    Rotated90,
}

impl Orientation {
    /// Rotation in degrees applied to the replacement text
    pub fn degrees(&self) -> u16 {
        match self {
            Orientation::Normal => 0,
            Orientation::Rotated90 => 90,
        }
    }
}

/// Conversion between PDF user space and top-left page space for one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// MediaBox left edge in user space
    pub left: f32,
    /// MediaBox top edge in user space
    pub top: f32,
}

impl PageFrame {
    /// Frame for a MediaBox `[llx lly urx ury]`
    pub fn from_media_box(media_box: [f32; 4]) -> Self {
        Self {
            left: media_box[0].min(media_box[2]),
            top: media_box[1].max(media_box[3]),
        }
    }

    /// US Letter (612 × 792 points), the fallback when a page has no MediaBox
    pub fn letter() -> Self {
        Self::from_media_box([0.0, 0.0, 612.0, 792.0])
    }

    pub fn to_page(&self, p: Point) -> Point {
        Point { x: p.x - self.left, y: self.top - p.y }
    }

    pub fn to_user(&self, p: Point) -> Point {
        Point { x: p.x + self.left, y: self.top - p.y }
    }
}
