use opencv::{
    core::{DMatch, Mat, Vector, NORM_HAMMING},
    features2d::BFMatcher,
    prelude::*,
};

const RATIO_TEST_THRESHOLD: f32 = 0.75;

pub struct DescriptorMatcher {
    matcher: BFMatcher,
}

impl DescriptorMatcher {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            matcher: BFMatcher::new(NORM_HAMMING, false)?,
        })
    }

    /// Matches every query descriptor against `train` and keeps the ones
    /// passing the ratio test. `query_idx` indexes `query`, `train_idx`
    /// indexes `train`.
    pub fn good_matches(&self, query: &Mat, train: &Mat) -> anyhow::Result<Vec<DMatch>> {
        if query.empty() || train.empty() {
            return Ok(Vec::new());
        }

        let mut knn = Vector::<Vector<DMatch>>::new();
        self.matcher
            .knn_train_match(query, train, &mut knn, 2, &Mat::default(), false)?;

        Ok(ratio_filter(&knn, RATIO_TEST_THRESHOLD))
    }
}

pub fn ratio_filter(knn: &Vector<Vector<DMatch>>, ratio: f32) -> Vec<DMatch> {
    knn.iter()
        .filter(|pair| pair.len() == 2)
        .filter_map(|pair| {
            let best = pair.get(0).ok()?;
            let second = pair.get(1).ok()?;
            (best.distance < second.distance * ratio).then_some(best)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dmatch(query_idx: i32, train_idx: i32, distance: f32) -> DMatch {
        DMatch {
            query_idx,
            train_idx,
            img_idx: 0,
            distance,
        }
    }

    #[test]
    fn ratio_filter_keeps_distinctive_matches() {
        let knn: Vector<Vector<DMatch>> = vec![
            Vector::from_iter([dmatch(0, 3, 10.0), dmatch(0, 4, 40.0)]),
            Vector::from_iter([dmatch(1, 5, 30.0), dmatch(1, 6, 32.0)]),
            Vector::from_iter([dmatch(2, 7, 5.0)]),
        ]
        .into_iter()
        .collect();

        let kept = ratio_filter(&knn, RATIO_TEST_THRESHOLD);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].query_idx, 0);
        assert_eq!(kept[0].train_idx, 3);
    }

    #[test]
    fn empty_descriptors_give_no_matches() {
        let matcher = DescriptorMatcher::new().unwrap();
        let matches = matcher.good_matches(&Mat::default(), &Mat::default()).unwrap();
        assert!(matches.is_empty());
    }
}
