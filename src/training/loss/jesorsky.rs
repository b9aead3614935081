//! Keypoint localization loss.
//!
//! Targets and scores are interleaved keypoint coordinates
//! `[x0, y0, x1, y1, ...]`. The first two keypoints are the eyes; their
//! distance in the target normalizes every keypoint error, which makes the
//! loss independent of the face scale.

use super::Loss;

/// Added under the square root so the gradient stays finite at zero distance.
const EPSILON: f64 = 1e-12;

/// Mean keypoint distance normalized by the inter-eye distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Jesorsky;

impl Jesorsky {
    /// Distance between the first two keypoints (the eyes).
    #[inline]
    pub fn eye_dist(targets: &[f64]) -> f64 {
        let dx = targets[0] - targets[2];
        let dy = targets[1] - targets[3];
        (dx * dx + dy * dy).sqrt()
    }

    #[inline]
    fn scale(targets: &[f64]) -> f64 {
        let n_points = targets.len() >> 1;
        1.0 / (n_points as f64 * Self::eye_dist(targets))
    }
}

impl Loss for Jesorsky {
    fn error(&self, targets: &[f64], scores: &[f64]) -> f64 {
        debug_assert!(targets.len() >= 4 && targets.len() % 2 == 0);
        debug_assert_eq!(targets.len(), scores.len());

        let scale = Self::scale(targets);
        targets
            .chunks_exact(2)
            .zip(scores.chunks_exact(2))
            .map(|(t, s)| {
                let dx = s[0] - t[0];
                let dy = s[1] - t[1];
                scale * (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    fn value(&self, targets: &[f64], scores: &[f64]) -> f64 {
        debug_assert!(targets.len() >= 4 && targets.len() % 2 == 0);
        debug_assert_eq!(targets.len(), scores.len());

        let scale = Self::scale(targets);
        targets
            .chunks_exact(2)
            .zip(scores.chunks_exact(2))
            .map(|(t, s)| {
                let dx = s[0] - t[0];
                let dy = s[1] - t[1];
                scale * (dx * dx + dy * dy + EPSILON).sqrt()
            })
            .sum()
    }

    fn value_grad(&self, targets: &[f64], scores: &[f64], grad: &mut [f64]) -> f64 {
        debug_assert!(targets.len() >= 4 && targets.len() % 2 == 0);
        debug_assert_eq!(targets.len(), scores.len());
        debug_assert_eq!(grad.len(), scores.len());

        let scale = Self::scale(targets);
        let mut value = 0.0;
        for ((t, s), g) in targets
            .chunks_exact(2)
            .zip(scores.chunks_exact(2))
            .zip(grad.chunks_exact_mut(2))
        {
            let dx = s[0] - t[0];
            let dy = s[1] - t[1];
            let de = (dx * dx + dy * dy + EPSILON).sqrt();

            value += scale * de;
            g[0] = scale * dx / de;
            g[1] = scale * dy / de;
        }
        value
    }

    fn name(&self) -> &'static str {
        "jesorsky"
    }
}
