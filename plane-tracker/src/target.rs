use nalgebra::Vector2;
use opencv::core::{Mat, Point2f};

/// Axis aligned pixel rectangle, both corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRect {
    pub min: Vector2<i32>,
    pub max: Vector2<i32>,
}

impl TargetRect {
    pub fn new(min: Vector2<i32>, max: Vector2<i32>) -> Self {
        Self { min, max }
    }

    /// Normalised box spanned by two opposite corners. Degenerate boxes
    /// (zero width or height) give `None`.
    pub fn from_corners(a: Vector2<i32>, b: Vector2<i32>) -> Option<Self> {
        let min = a.inf(&b);
        let max = a.sup(&b);
        let size = max - min;
        if size.x > 0 && size.y > 0 {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: &Point2f) -> bool {
        p.x >= self.min.x as f32
            && p.x <= self.max.x as f32
            && p.y >= self.min.y as f32
            && p.y <= self.max.y as f32
    }

    pub fn center(&self) -> Vector2<f64> {
        (self.min + self.max).cast::<f64>() / 2.0
    }

    /// Outline radius: the diagonal of a square with half the rect's width.
    pub fn outline_radius(&self) -> i32 {
        let half_width = (self.width() / 2).abs();
        (half_width as f64 * 2f64.sqrt()) as i32
    }

    // Top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point2f; 4] {
        let (x0, y0) = (self.min.x as f32, self.min.y as f32);
        let (x1, y1) = (self.max.x as f32, self.max.y as f32);
        [
            Point2f::new(x0, y0),
            Point2f::new(x1, y0),
            Point2f::new(x1, y1),
            Point2f::new(x0, y1),
        ]
    }
}

/// A registered reference frame together with the features found inside
/// the selected rectangle.
#[derive(Debug)]
pub struct PlanarTarget {
    pub image: Mat,
    pub rect: TargetRect,
    pub points: Vec<Point2f>,
    // One descriptor row per entry in `points`
    pub descriptors: Mat,
}

/// Pose of a target in the most recently tracked frame.
#[derive(Debug)]
pub struct TrackedTarget {
    pub target_index: usize,
    /// Inlier positions in the reference image
    pub p0: Vec<Point2f>,
    /// Matching inlier positions in the tracked frame
    pub p1: Vec<Point2f>,
    pub homography: Mat,
    /// Target rectangle corners projected into the frame
    pub quad: [Point2f; 4],
}

impl TrackedTarget {
    pub fn inlier_count(&self) -> usize {
        self.p0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_normalises_drag_direction() {
        let rect = TargetRect::from_corners(Vector2::new(40, 30), Vector2::new(10, 50)).unwrap();
        assert_eq!(rect.min, Vector2::new(10, 30));
        assert_eq!(rect.max, Vector2::new(40, 50));
        assert_eq!((rect.width(), rect.height()), (30, 20));
    }

    #[test]
    fn from_corners_rejects_flat_boxes() {
        assert!(TargetRect::from_corners(Vector2::new(5, 5), Vector2::new(5, 20)).is_none());
        assert!(TargetRect::from_corners(Vector2::new(5, 5), Vector2::new(20, 5)).is_none());
    }

    #[test]
    fn contains_is_inclusive() {
        let rect = TargetRect::new(Vector2::new(10, 10), Vector2::new(20, 20));
        assert!(rect.contains(&Point2f::new(10.0, 10.0)));
        assert!(rect.contains(&Point2f::new(20.0, 20.0)));
        assert!(!rect.contains(&Point2f::new(20.5, 15.0)));
        assert!(!rect.contains(&Point2f::new(15.0, 9.9)));
    }

    #[test]
    fn outline_radius_follows_width() {
        let square = TargetRect::new(Vector2::new(0, 0), Vector2::new(20, 20));
        assert_eq!(square.outline_radius(), 14);

        let wide = TargetRect::new(Vector2::new(0, 0), Vector2::new(60, 20));
        assert_eq!(wide.outline_radius(), 42);

        let tall = TargetRect::new(Vector2::new(0, 0), Vector2::new(60, 80));
        assert_eq!(tall.outline_radius(), 42);
        assert_eq!(tall.center(), Vector2::new(30.0, 40.0));

        // Odd widths truncate the half width first
        let odd = TargetRect::new(Vector2::new(3, 0), Vector2::new(10, 5));
        assert_eq!(odd.outline_radius(), 4);
    }
}
