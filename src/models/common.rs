use serde::{Deserialize, Serialize};

/// A rectangle in the drawing application's native coordinate space.
///
/// The native space is y-up: `top` is numerically greater than `bottom`.
/// Bounds are read from the host as `[left, top, right, bottom]` tuples and
/// kept in that orientation; conversion to the y-down CSS space happens in
/// [`Bounds::to_css_box`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Bounds {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Tests whether two native rectangles intersect (inclusive of edges).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.right >= other.left
            && other.right >= self.left
            && self.bottom <= other.top
            && other.bottom <= self.top
    }

    /// Tests whether two rectangles are the same to within a per-side
    /// tolerance. A negative tolerance falls back to 1 unit.
    pub fn similar_to(&self, other: &Bounds, max_offset: f64) -> bool {
        let tol = if max_offset >= 0.0 { max_offset } else { 1.0 };
        (self.left - other.left).abs() <= tol
            && (self.top - other.top).abs() <= tol
            && (self.right - other.right).abs() <= tol
            && (self.bottom - other.bottom).abs() <= tol
    }

    pub fn shifted(&self, dx: f64, dy: f64) -> Bounds {
        Bounds {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Converts native y-up bounds to a y-down CSS box.
    ///
    /// The width is rounded to an integer (artboard widths address integer
    /// pixel breakpoints); the height is left exact.
    pub fn to_css_box(&self) -> CssBox {
        let x = self.left;
        let y = -self.top;
        CssBox {
            left: x,
            top: y,
            width: (self.right - x).round(),
            height: -self.bottom - y,
        }
    }
}

/// A rectangle in CSS coordinate space (y-down, origin at top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A 2x3 affine transform `[a b c d tx ty]`, as reported by the host for
/// text frames:
///
/// ```text
/// x' = a * x + c * y + tx
/// y' = b * x + d * y + ty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    #[serde(default)]
    pub tx: f64,
    #[serde(default)]
    pub ty: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

impl Matrix {
    pub fn is_identity_orientation(&self) -> bool {
        self.a == 1.0 && self.b == 0.0 && self.c == 0.0 && self.d == 1.0
    }

    /// The decomposed rotation component in degrees.
    pub fn rotation_degrees(&self) -> f64 {
        self.b.atan2(self.a).to_degrees()
    }

    /// Whether the transform rotates or skews by a meaningful amount.
    /// Rotation below one degree is treated as noise (it is common to nudge
    /// text accidentally and then unrotate by hand).
    pub fn is_rotated(&self) -> bool {
        if self.is_identity_orientation() {
            return false;
        }
        self.rotation_degrees().abs() > 1.0
    }

    /// The same transform with its translation zeroed out.
    pub fn without_translation(&self) -> Matrix {
        Matrix {
            tx: 0.0,
            ty: 0.0,
            ..*self
        }
    }

    /// The inverse transform. Returns `None` for a degenerate matrix.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Matrix {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            tx: (self.c * self.ty - self.d * self.tx) * inv_det,
            ty: (self.b * self.tx - self.a * self.ty) * inv_det,
        })
    }

    /// Applies the transform to a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_intersection_is_inclusive() {
        let a = Bounds::new(0.0, 100.0, 100.0, 0.0);
        let b = Bounds::new(100.0, 50.0, 150.0, 10.0);
        let c = Bounds::new(101.0, 50.0, 150.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn css_box_negates_y_and_rounds_width() {
        let b = Bounds::new(10.0, -20.0, 110.4, -70.0);
        let css = b.to_css_box();
        assert_eq!(css.left, 10.0);
        assert_eq!(css.top, 20.0);
        assert_eq!(css.width, 100.0);
        assert_eq!(css.height, 50.0);
    }

    #[test]
    fn rotation_below_one_degree_is_noise() {
        let slight = Matrix {
            a: 0.9999,
            b: 0.005,
            c: -0.005,
            d: 0.9999,
            tx: 0.0,
            ty: 0.0,
        };
        assert!(!slight.is_rotated());
        let quarter = Matrix {
            a: 0.0,
            b: 1.0,
            c: -1.0,
            d: 0.0,
            tx: 5.0,
            ty: 9.0,
        };
        assert!(quarter.is_rotated());
        assert!((quarter.rotation_degrees() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_round_trips_points() {
        let m = Matrix {
            a: 0.8,
            b: 0.6,
            c: -0.6,
            d: 0.8,
            tx: 12.0,
            ty: -3.0,
        };
        let inv = m.inverse().unwrap();
        let (x, y) = m.apply(7.0, 11.0);
        let (rx, ry) = inv.apply(x, y);
        assert!((rx - 7.0).abs() < 1e-9);
        assert!((ry - 11.0).abs() < 1e-9);
    }
}
