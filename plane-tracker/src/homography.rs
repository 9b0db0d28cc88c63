use opencv::{
    calib3d::{find_homography, RANSAC},
    core::{perspective_transform, Mat, Point2f, Vector},
    prelude::*,
};

const RANSAC_REPROJ_THRESHOLD: f64 = 3.0;

/// Robust homography from `src` to `dst` along with an inlier flag per pair.
/// `None` when no model could be fitted.
pub fn estimate(src: &[Point2f], dst: &[Point2f]) -> anyhow::Result<Option<(Mat, Vec<bool>)>> {
    let src_points: Vector<Point2f> = src.iter().copied().collect();
    let dst_points: Vector<Point2f> = dst.iter().copied().collect();

    let mut mask = Mat::default();
    let homography = find_homography(
        &src_points,
        &dst_points,
        &mut mask,
        RANSAC,
        RANSAC_REPROJ_THRESHOLD,
    )?;
    if homography.empty() || mask.empty() {
        return Ok(None);
    }

    let inliers = (0..src.len())
        .map(|i| mask.at::<u8>(i as i32).map(|v| *v != 0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some((homography, inliers)))
}

pub fn project(points: &[Point2f; 4], homography: &Mat) -> anyhow::Result<[Point2f; 4]> {
    let src: Vector<Point2f> = points.iter().copied().collect();
    let mut dst = Vector::<Point2f>::new();
    perspective_transform(&src, &mut dst, homography)?;

    Ok([dst.get(0)?, dst.get(1)?, dst.get(2)?, dst.get(3)?])
}
