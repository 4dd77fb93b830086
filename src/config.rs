//! Application configuration loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock demo setup: the sample dataset URL, a 3 s staleness threshold swept
//! every 3 s, and the two stock card labels.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Remote dataset consumed when no other URL is configured.
pub const DEFAULT_DATASET_URL: &str = "https://www.sofapps.it/sampleDataset.json";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// URL of the JSON descriptor list.
    pub dataset_url: String,
    /// Per-request timeout for the descriptor list and each reference image.
    pub request_timeout_ms: u64,
    pub staleness: StalenessPolicy,
    /// Size of the canvas the label text is laid out on.
    pub scene_size: SceneSize,
    pub label_style: LabelStyle,
    /// Label text per reference image name. Markers without an entry get no overlay.
    pub labels: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert(
            "card1".to_string(),
            "Hi, Costantino!\nYour loyalties points are 2032.".to_string(),
        );
        labels.insert(
            "card2".to_string(),
            "Last tweet from Costantino:\n#WWDC18 #ARKit2 rocks!".to_string(),
        );

        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            request_timeout_ms: 10_000,
            staleness: StalenessPolicy::default(),
            scene_size: SceneSize::default(),
            label_style: LabelStyle::default(),
            labels,
        }
    }
}

impl AppConfig {
    /// Load a YAML config file. Missing fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: AppConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config from a string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.staleness.threshold_ms == 0 {
            bail!("staleness.threshold_ms must be positive");
        }
        if self.staleness.sweep_interval_ms == 0 {
            bail!("staleness.sweep_interval_ms must be positive");
        }
        if self.staleness.sweeps_faster_than_threshold() {
            warn!(
                "staleness.sweep_interval_ms ({}) is below threshold_ms ({}), sweeping more often than needed",
                self.staleness.sweep_interval_ms, self.staleness.threshold_ms
            );
        }
        if !(self.label_style.font_size > 0.0) {
            bail!("label_style.font_size must be positive");
        }
        Ok(())
    }
}

/// When a tracked marker counts as stale and how often that is checked.
///
/// With the sweep interval equal to the threshold (the default), an entry that
/// stops being refreshed is evicted between 1x and 2x the threshold after its
/// last refresh. A sweep interval below the threshold tightens that window at
/// the cost of extra sweeps; such configs load with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessPolicy {
    pub threshold_ms: u64,
    pub sweep_interval_ms: u64,
}

impl StalenessPolicy {
    pub fn new(threshold: Duration, sweep_interval: Duration) -> Self {
        Self {
            threshold_ms: saturating_millis(threshold),
            sweep_interval_ms: saturating_millis(sweep_interval),
        }
    }

    /// Whether the sweep runs more often than the threshold.
    pub fn sweeps_faster_than_threshold(&self) -> bool {
        self.sweep_interval_ms < self.threshold_ms
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            threshold_ms: 3_000,
            sweep_interval_ms: 3_000,
        }
    }
}

/// Label canvas size in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSize {
    pub width: f64,
    pub height: f64,
}

impl Default for SceneSize {
    fn default() -> Self {
        Self {
            width: 375.0,
            height: 812.0,
        }
    }
}

/// Text appearance for label lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub font_name: String,
    pub font_size: f64,
    /// Left margin of every line.
    pub margin: f64,
    /// RGBA, components in [0, 1].
    pub color: [f32; 4],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_name: "Helvetica-Bold".to_string(),
            font_size: 20.0,
            margin: 20.0,
            color: [1.0, 1.0, 1.0, 0.85],
        }
    }
}
