use opencv::{
    core::{hconcat2, Mat, Point, Point2f, Scalar, Vector},
    imgproc::{circle, line, polylines, LINE_8},
    prelude::*,
};
use plane_tracker::{PlanarTarget, TargetRect, TrackedTarget};

// BGR
const KEYPOINT_COLOR: (f64, f64, f64) = (0.0, 255.0, 255.0);
const TARGET_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const QUAD_COLOR: (f64, f64, f64) = (255.0, 0.0, 255.0);
const MATCH_COLOR: (f64, f64, f64) = (255.0, 0.0, 0.0);

fn bgr((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

fn to_point(p: &Point2f) -> Point {
    Point::new(p.x as i32, p.y as i32)
}

/// Builds the side by side canvas: `frame` on the left, the reference image
/// of `target` (or black) on the right, with tracking overlays on top.
pub fn compose(
    frame: &Mat,
    target: Option<&PlanarTarget>,
    tracked: Option<&TrackedTarget>,
    frame_points: &[Point2f],
) -> anyhow::Result<Mat> {
    let size = frame.size()?;
    let right = match target {
        Some(target) => {
            let mut reference = target.image.try_clone()?;
            draw_keypoints(&mut reference, &target.points)?;
            reference
        }
        None => {
            let black = Scalar::all(0.0);
            Mat::new_rows_cols_with_default(size.height, size.width, frame.typ(), black)?
        }
    };

    let mut vis = Mat::default();
    hconcat2(frame, &right, &mut vis)?;

    if let Some(target) = target {
        draw_target_outline(&mut vis, &target.rect, size.width)?;
    }
    if let Some(tracked) = tracked {
        draw_tracked(&mut vis, tracked, size.width)?;
    }
    draw_keypoints(&mut vis, frame_points)?;

    Ok(vis)
}

pub fn draw_keypoints(vis: &mut Mat, points: &[Point2f]) -> anyhow::Result<()> {
    for p in points {
        circle(vis, to_point(p), 2, bgr(KEYPOINT_COLOR), 1, LINE_8, 0)?;
    }

    Ok(())
}

/// Circles the selected rectangle on the reference half of the canvas.
fn draw_target_outline(vis: &mut Mat, rect: &TargetRect, offset_x: i32) -> anyhow::Result<()> {
    let center = rect.center();
    let center = Point::new(center.x as i32 + offset_x, center.y as i32);
    circle(vis, center, rect.outline_radius(), bgr(TARGET_COLOR), 2, LINE_8, 0)?;

    Ok(())
}

fn draw_tracked(vis: &mut Mat, tracked: &TrackedTarget, offset_x: i32) -> anyhow::Result<()> {
    let quad: Vector<Point> = tracked.quad.iter().map(to_point).collect();
    let polygons: Vector<Vector<Point>> = [quad].into_iter().collect();
    polylines(vis, &polygons, true, bgr(QUAD_COLOR), 2, LINE_8, 0)?;

    for (p0, p1) in tracked.p0.iter().zip(&tracked.p1) {
        let from = Point::new(p0.x as i32 + offset_x, p0.y as i32);
        line(vis, from, to_point(p1), bgr(MATCH_COLOR), 1, LINE_8, 0)?;
    }

    Ok(())
}
