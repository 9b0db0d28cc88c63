use opencv::{
    core::{vconcat, KeyPoint, Mat, Point2f, Ptr, Vector},
    features2d::{ORB_ScoreType, ORB},
    prelude::*,
};

use crate::target::TargetRect;

pub struct FeatureDetector {
    orb: Ptr<ORB>,
}

/// Keypoint positions with their descriptors, row `i` belonging to `points[i]`.
pub struct Features {
    pub points: Vec<Point2f>,
    pub descriptors: Mat,
}

impl FeatureDetector {
    pub fn new(max_features: i32) -> anyhow::Result<Self> {
        let orb = ORB::create(
            max_features,
            1.2,
            8,
            31,
            0,
            2,
            ORB_ScoreType::HARRIS_SCORE,
            31,
            20,
        )?;

        Ok(Self { orb })
    }

    pub fn detect(&mut self, image: &Mat) -> anyhow::Result<Features> {
        let mut keypoints = Vector::<KeyPoint>::new();
        let mut descriptors = Mat::default();
        self.orb
            .detect_and_compute(image, &Mat::default(), &mut keypoints, &mut descriptors, false)?;

        Ok(Features {
            points: keypoints.iter().map(|kp| kp.pt()).collect(),
            descriptors,
        })
    }
}

impl Features {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Keeps the features whose position lies inside `rect`.
    pub fn within(self, rect: &TargetRect) -> anyhow::Result<Features> {
        let mut points = Vec::new();
        let mut rows = Vector::<Mat>::new();
        for (i, p) in self.points.iter().enumerate() {
            if rect.contains(p) {
                points.push(*p);
                rows.push(self.descriptors.row(i as i32)?.try_clone()?);
            }
        }

        let mut descriptors = Mat::default();
        if !rows.is_empty() {
            vconcat(&rows, &mut descriptors)?;
        }

        Ok(Features { points, descriptors })
    }
}
