mod features;
mod homography;
mod matching;
mod target;

use features::{FeatureDetector, Features};
use itertools::Itertools;
use matching::DescriptorMatcher;
use opencv::core::{Mat, Point2f};

pub use target::{PlanarTarget, TargetRect, TrackedTarget};

const MAX_FEATURES: i32 = 1000;
const MIN_MATCH_COUNT: usize = 10;

/// Registry of planar targets that can be located in later frames.
pub trait TargetTracker {
    fn clear(&mut self);
    fn add_target(&mut self, image: &Mat, rect: TargetRect) -> anyhow::Result<()>;
    /// Locates the registered targets in `frame`, best supported first.
    fn track(&mut self, frame: &Mat) -> anyhow::Result<Vec<TrackedTarget>>;
    fn targets(&self) -> &[PlanarTarget];
    /// Keypoints found in the frame passed to the last `track` call.
    fn frame_points(&self) -> &[Point2f];
}

/// ORB features, ratio tested Hamming matches and a RANSAC homography per target.
pub struct PlaneTracker {
    detector: FeatureDetector,
    matcher: DescriptorMatcher,
    targets: Vec<PlanarTarget>,
    frame_points: Vec<Point2f>,
}

impl PlaneTracker {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            detector: FeatureDetector::new(MAX_FEATURES)?,
            matcher: DescriptorMatcher::new()?,
            targets: Vec::new(),
            frame_points: Vec::new(),
        })
    }

    fn locate(
        &self,
        target_index: usize,
        target: &PlanarTarget,
        frame: &Features,
    ) -> anyhow::Result<Option<TrackedTarget>> {
        let matches = self.matcher.good_matches(&frame.descriptors, &target.descriptors)?;
        if matches.len() < MIN_MATCH_COUNT {
            return Ok(None);
        }

        let p0: Vec<Point2f> = matches
            .iter()
            .map(|m| target.points[m.train_idx as usize])
            .collect();
        let p1: Vec<Point2f> = matches
            .iter()
            .map(|m| frame.points[m.query_idx as usize])
            .collect();

        let Some((homography, inliers)) = homography::estimate(&p0, &p1)? else {
            return Ok(None);
        };
        if inliers.iter().filter(|i| **i).count() < MIN_MATCH_COUNT {
            return Ok(None);
        }

        let (p0, p1): (Vec<Point2f>, Vec<Point2f>) = p0
            .into_iter()
            .zip(p1)
            .zip(inliers)
            .filter_map(|(pair, inlier)| inlier.then_some(pair))
            .unzip();
        let quad = homography::project(&target.rect.corners(), &homography)?;

        Ok(Some(TrackedTarget {
            target_index,
            p0,
            p1,
            homography,
            quad,
        }))
    }
}

impl TargetTracker for PlaneTracker {
    fn clear(&mut self) {
        self.targets.clear();
    }

    fn add_target(&mut self, image: &Mat, rect: TargetRect) -> anyhow::Result<()> {
        let features = self.detector.detect(image)?.within(&rect)?;
        log::info!(
            "Registered target ({}, {})-({}, {}) with {} keypoints",
            rect.min.x,
            rect.min.y,
            rect.max.x,
            rect.max.y,
            features.len()
        );

        self.targets.push(PlanarTarget {
            image: image.try_clone()?,
            rect,
            points: features.points,
            descriptors: features.descriptors,
        });

        Ok(())
    }

    fn track(&mut self, frame: &Mat) -> anyhow::Result<Vec<TrackedTarget>> {
        let features = self.detector.detect(frame)?;
        self.frame_points = features.points.clone();
        if features.len() < MIN_MATCH_COUNT {
            return Ok(Vec::new());
        }

        let mut tracked = Vec::new();
        for (index, target) in self.targets.iter().enumerate() {
            if let Some(t) = self.locate(index, target, &features)? {
                log::debug!("Target {index} tracked with {} inliers", t.inlier_count());
                tracked.push(t);
            }
        }

        Ok(tracked
            .into_iter()
            .sorted_by(|a, b| b.inlier_count().cmp(&a.inlier_count()))
            .collect())
    }

    fn targets(&self) -> &[PlanarTarget] {
        &self.targets
    }

    fn frame_points(&self) -> &[Point2f] {
        &self.frame_points
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;
    use opencv::{
        core::{self, Scalar, Size, BORDER_REFLECT, CV_8UC3},
        imgproc::{gaussian_blur_def, warp_affine, INTER_LINEAR},
        prelude::*,
    };

    use super::*;

    fn textured_image(width: i32, height: i32) -> Mat {
        core::set_rng_seed(7).unwrap();
        let mut noise =
            Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap();
        core::randu(&mut noise, &Scalar::all(0.0), &Scalar::all(255.0)).unwrap();
        let mut img = Mat::default();
        gaussian_blur_def(&noise, &mut img, Size::new(5, 5), 1.5).unwrap();
        img
    }

    fn shifted(img: &Mat, dx: f64, dy: f64) -> Mat {
        let m = Mat::from_slice_2d(&[[1.0, 0.0, dx], [0.0, 1.0, dy]]).unwrap();
        let mut out = Mat::default();
        let size = img.size().unwrap();
        warp_affine(img, &mut out, &m, size, INTER_LINEAR, BORDER_REFLECT, Scalar::default())
            .unwrap();
        out
    }

    fn target_rect() -> TargetRect {
        TargetRect::new(Vector2::new(60, 40), Vector2::new(260, 200))
    }

    #[test]
    fn add_target_keeps_points_inside_rect() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        tracker.add_target(&img, target_rect()).unwrap();

        let target = &tracker.targets()[0];
        assert!(!target.points.is_empty());
        assert!(target.points.iter().all(|p| target_rect().contains(p)));
        assert_eq!(target.descriptors.rows() as usize, target.points.len());
    }

    #[test]
    fn clear_drops_targets() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        tracker.add_target(&img, target_rect()).unwrap();
        tracker.add_target(&img, target_rect()).unwrap();
        assert_eq!(tracker.targets().len(), 2);

        tracker.clear();
        assert!(tracker.targets().is_empty());
    }

    #[test]
    fn tracks_target_in_same_frame() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        tracker.add_target(&img, target_rect()).unwrap();

        let tracked = tracker.track(&img).unwrap();
        assert_eq!(tracked.len(), 1);
        assert!(tracked[0].inlier_count() >= MIN_MATCH_COUNT);
        assert_eq!(tracked[0].p0.len(), tracked[0].p1.len());
        for (q, c) in tracked[0].quad.iter().zip(target_rect().corners().iter()) {
            assert!((q.x - c.x).abs() < 2.0 && (q.y - c.y).abs() < 2.0);
        }
        assert!(!tracker.frame_points().is_empty());
    }

    #[test]
    fn follows_translated_target() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        tracker.add_target(&img, target_rect()).unwrap();

        let moved = shifted(&img, 12.0, 8.0);
        let tracked = tracker.track(&moved).unwrap();
        assert_eq!(tracked.len(), 1);
        for (q, c) in tracked[0].quad.iter().zip(target_rect().corners().iter()) {
            assert!((q.x - (c.x + 12.0)).abs() < 2.0);
            assert!((q.y - (c.y + 8.0)).abs() < 2.0);
        }
    }

    #[test]
    fn best_supported_target_comes_first() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        let small = TargetRect::new(Vector2::new(130, 90), Vector2::new(190, 150));
        tracker.add_target(&img, small).unwrap();
        tracker.add_target(&img, target_rect()).unwrap();

        let tracked = tracker.track(&img).unwrap();
        assert_eq!(tracked.len(), 2);
        assert_eq!(tracked[0].target_index, 1);
        assert_eq!(tracked[1].target_index, 0);
        assert!(tracked[0].inlier_count() > tracked[1].inlier_count());
    }

    #[test]
    fn target_without_keypoints_is_never_tracked() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        // Inside ORB's edge margin
        let corner = TargetRect::new(Vector2::new(0, 0), Vector2::new(20, 20));
        tracker.add_target(&img, corner).unwrap();
        assert!(tracker.targets()[0].points.is_empty());

        assert!(tracker.track(&img).unwrap().is_empty());
        assert!(!tracker.frame_points().is_empty());
    }

    #[test]
    fn inconsistent_matches_are_rejected() {
        let mut tracker = PlaneTracker::new().unwrap();
        let img = textured_image(320, 240);
        let features = tracker.detector.detect(&img).unwrap().within(&target_rect()).unwrap();
        assert!(features.len() > 2 * MIN_MATCH_COUNT);

        // Descriptors still match, but every point sits at another keypoint's position
        let mut points = features.points;
        let half = points.len() / 2;
        points.rotate_left(half);
        tracker.targets.push(PlanarTarget {
            image: img.try_clone().unwrap(),
            rect: target_rect(),
            points,
            descriptors: features.descriptors,
        });

        assert!(tracker.track(&img).unwrap().is_empty());
    }

    #[test]
    fn featureless_frame_tracks_nothing() {
        let mut tracker = PlaneTracker::new().unwrap();
        tracker.add_target(&textured_image(320, 240), target_rect()).unwrap();

        let blank = Mat::new_rows_cols_with_default(240, 320, CV_8UC3, Scalar::all(128.0)).unwrap();
        assert!(tracker.track(&blank).unwrap().is_empty());
        assert!(tracker.frame_points().is_empty());
    }

    #[test]
    fn no_targets_tracks_nothing() {
        let mut tracker = PlaneTracker::new().unwrap();
        let tracked = tracker.track(&textured_image(320, 240)).unwrap();
        assert!(tracked.is_empty());
        assert!(!tracker.frame_points().is_empty());
    }
}
