//! Collage layout of a capsule on the front-end wall.
//!
//! New capsules land somewhere near the middle of the wall with a slight tilt;
//! users can later drag them anywhere within the wider bounds.

use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const INITIAL_POSITION: RangeInclusive<f64> = 10.0..=90.0;
pub const INITIAL_ROTATION: RangeInclusive<f64> = -15.0..=15.0;
pub const INITIAL_SCALE: RangeInclusive<f64> = 0.8..=1.2;

pub const POSITION_BOUNDS: RangeInclusive<f64> = 0.0..=100.0;
pub const ROTATION_BOUNDS: RangeInclusive<f64> = -30.0..=30.0;
pub const SCALE_BOUNDS: RangeInclusive<f64> = 0.5..=1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl Fragment {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            x: rng.random_range(INITIAL_POSITION),
            y: rng.random_range(INITIAL_POSITION),
            rotation: rng.random_range(INITIAL_ROTATION),
            scale: rng.random_range(INITIAL_SCALE),
        }
    }

    /// Applies the fields present in `patch`, clamped to the drag bounds.
    pub fn apply(&mut self, patch: &FragmentPatch) {
        if let Some(x) = patch.x {
            self.x = clamp(x, &POSITION_BOUNDS);
        }
        if let Some(y) = patch.y {
            self.y = clamp(y, &POSITION_BOUNDS);
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = clamp(rotation, &ROTATION_BOUNDS);
        }
        if let Some(scale) = patch.scale {
            self.scale = clamp(scale, &SCALE_BOUNDS);
        }
    }
}

/// Partial layout update; `None` leaves the field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FragmentPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub scale: Option<f64>,
}

impl FragmentPatch {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.rotation.is_none() && self.scale.is_none()
    }
}

fn clamp(value: f64, bounds: &RangeInclusive<f64>) -> f64 {
    value.clamp(*bounds.start(), *bounds.end())
}

/// Where new capsules get their initial layout from.
pub trait LayoutSource: Send + Sync {
    fn layout(&self) -> Fragment;
}

/// Uniformly random layout within the initial ranges.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomLayout;

impl LayoutSource for RandomLayout {
    fn layout(&self) -> Fragment {
        Fragment::random(&mut rand::rng())
    }
}

/// Always hands out the same layout.
#[derive(Debug, Clone, Copy)]
pub struct FixedLayout(pub Fragment);

impl LayoutSource for FixedLayout {
    fn layout(&self) -> Fragment {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn centered() -> Fragment {
        Fragment { x: 50.0, y: 50.0, rotation: 0.0, scale: 1.0 }
    }

    #[test]
    fn test_random_layout_within_initial_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let f = Fragment::random(&mut rng);
            assert!(INITIAL_POSITION.contains(&f.x));
            assert!(INITIAL_POSITION.contains(&f.y));
            assert!(INITIAL_ROTATION.contains(&f.rotation));
            assert!(INITIAL_SCALE.contains(&f.scale));
        }
    }

    #[test]
    fn test_patch_is_clamped() {
        let mut f = centered();
        f.apply(&FragmentPatch {
            x: Some(150.0),
            y: Some(-50.0),
            rotation: Some(45.0),
            scale: Some(0.1),
        });
        assert_eq!(f.x, 100.0);
        assert_eq!(f.y, 0.0);
        assert_eq!(f.rotation, 30.0);
        assert_eq!(f.scale, 0.5);

        f.apply(&FragmentPatch { rotation: Some(-1e9), scale: Some(1e9), ..Default::default() });
        assert_eq!(f.rotation, -30.0);
        assert_eq!(f.scale, 1.5);
    }

    #[test]
    fn test_patch_leaves_missing_fields() {
        let mut f = centered();
        f.apply(&FragmentPatch { y: Some(12.5), ..Default::default() });
        assert_eq!(f, Fragment { y: 12.5, ..centered() });
    }

    #[test]
    fn test_fixed_layout() {
        let source = FixedLayout(centered());
        assert_eq!(source.layout(), centered());
        assert!(FragmentPatch::default().is_empty());
    }
}
