//! Engine configuration
//!
//! Loaded from `ember.toml` (or any TOML string). Every field has a default,
//! so an empty file is a valid configuration.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Frame pacing, gesture and surface settings for one root container
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame-rate cap; 0 disables pacing
    pub max_fps: u32,
    /// Keep requesting frames even when nothing is dirty
    pub continuous_updates: bool,
    /// Panning jitter threshold in points, scaled by display density
    pub pan_threshold: f32,
    /// Longest press still reported as a tap, milliseconds
    pub tap_timeout_ms: u64,
    /// Paint this many frames in software before switching to the
    /// accelerated surface; `None` disables pre-rendering
    pub prerender_frames: Option<u32>,
    /// Retry delay while the surface has no area, milliseconds
    pub zero_size_retry_ms: u64,
    /// Weight of the newest sample in the FPS moving average
    pub fps_smoothing: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fps: 120,
            continuous_updates: false,
            pan_threshold: 2.0,
            tap_timeout_ms: 300,
            prerender_frames: None,
            zero_size_retry_ms: 16,
            fps_smoothing: 0.1,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse engine config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize engine config")
    }

    /// Target interval between frames, `None` when uncapped
    pub fn frame_budget(&self) -> Option<Duration> {
        (self.max_fps > 0).then(|| Duration::from_nanos(1_000_000_000 / self.max_fps as u64))
    }

    pub fn zero_size_retry(&self) -> Duration {
        Duration::from_millis(self.zero_size_retry_ms)
    }

    pub fn tap_timeout(&self) -> Duration {
        Duration::from_millis(self.tap_timeout_ms)
    }
}

/// Process-wide "rendering enabled" switch shared by roots
///
/// Hosts disable it while backgrounded; roots skip invalidation until it is
/// enabled again.
#[derive(Debug)]
pub struct RenderGate {
    enabled: AtomicBool,
}

impl Default for RenderGate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RenderGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn enable(&self) {
        if !self.enabled.swap(true, Ordering::AcqRel) {
            tracing::debug!("RenderGate enabled");
        }
    }

    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            tracing::debug!("RenderGate disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_fps = 60
            prerender_frames = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.max_fps, 60);
        assert_eq!(config.prerender_frames, Some(3));
        assert_eq!(config.zero_size_retry_ms, 16);
        assert_eq!(config.frame_budget(), Some(Duration::from_nanos(16_666_666)));
    }

    #[test]
    fn test_uncapped_has_no_budget() {
        let config = EngineConfig {
            max_fps: 0,
            ..Default::default()
        };
        assert_eq!(config.frame_budget(), None);
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = EngineConfig::from_toml_str("max_fps = \"fast\"").unwrap_err();
        assert!(err.to_string().contains("engine config"));
    }

    #[test]
    fn test_render_gate_transitions() {
        let gate = RenderGate::default();
        assert!(gate.is_enabled());
        gate.disable();
        assert!(!gate.is_enabled());
        gate.enable();
        assert!(gate.is_enabled());
    }
}
