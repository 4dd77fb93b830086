//! Tracking configuration variants.
//!
//! Which variant runs is decided once, from the detection source's reported
//! capabilities, when the reference images are ready.

use std::sync::Arc;

use crate::dataset::ReferenceImage;

/// What the detection source can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Per-frame image tracking, with its own anchor lifecycle signals. When
    /// absent, images are only detected inside world tracking and stale
    /// overlays must be swept by the registry.
    pub image_tracking: bool,
}

impl Capabilities {
    /// Whether overlays have to be expired by the staleness sweep, because
    /// the source gives no per-anchor lifecycle signals of its own.
    pub fn needs_staleness_sweep(&self) -> bool {
        !self.image_tracking
    }
}

/// Configuration the detection source is run with.
#[derive(Debug, Clone)]
pub enum TrackingConfiguration {
    /// Track reference images on every frame.
    ImageTracking {
        tracking_images: Vec<Arc<ReferenceImage>>,
        maximum_tracked: usize,
    },
    /// World tracking that also detects reference images.
    WorldTracking {
        detection_images: Vec<Arc<ReferenceImage>>,
    },
}

impl TrackingConfiguration {
    /// Pick the variant supported by `capabilities`. Image tracking follows
    /// every reference image at once.
    pub fn select(capabilities: Capabilities, images: Vec<Arc<ReferenceImage>>) -> Self {
        if capabilities.image_tracking {
            let maximum_tracked = images.len();
            Self::ImageTracking {
                tracking_images: images,
                maximum_tracked,
            }
        } else {
            Self::WorldTracking {
                detection_images: images,
            }
        }
    }

    pub fn reference_images(&self) -> &[Arc<ReferenceImage>] {
        match self {
            Self::ImageTracking {
                tracking_images, ..
            } => tracking_images,
            Self::WorldTracking { detection_images } => detection_images,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ImageTracking { .. } => "image-tracking",
            Self::WorldTracking { .. } => "world-tracking",
        }
    }
}

/// Options for (re)starting the detection source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub reset_tracking: bool,
    pub remove_existing_anchors: bool,
}

impl RunOptions {
    /// Start from scratch: reset tracking and drop every existing anchor.
    pub const RESET: Self = Self {
        reset_tracking: true,
        remove_existing_anchors: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage};

    use crate::dataset::ImageOrientation;

    fn images(n: usize) -> Vec<Arc<ReferenceImage>> {
        (0..n)
            .map(|i| {
                let img = DynamicImage::ImageLuma8(GrayImage::new(8, 8));
                Arc::new(
                    ReferenceImage::from_image(&format!("card{}", i), img, ImageOrientation::Up, 0.1)
                        .unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_select_image_tracking_tracks_all_images() {
        let caps = Capabilities {
            image_tracking: true,
        };
        let config = TrackingConfiguration::select(caps, images(3));
        assert!(!caps.needs_staleness_sweep());

        match &config {
            TrackingConfiguration::ImageTracking {
                tracking_images,
                maximum_tracked,
            } => {
                assert_eq!(tracking_images.len(), 3);
                assert_eq!(*maximum_tracked, 3);
            }
            other => panic!("unexpected configuration {}", other.name()),
        }
    }

    #[test]
    fn test_select_world_tracking_without_image_tracking() {
        let config = TrackingConfiguration::select(Capabilities::default(), images(2));

        assert!(matches!(config, TrackingConfiguration::WorldTracking { .. }));
        assert_eq!(config.reference_images().len(), 2);
        assert!(Capabilities::default().needs_staleness_sweep());
    }
}
