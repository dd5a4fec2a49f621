use serde::{Deserialize, Serialize};

/// Recording session configuration.
///
/// One value is built per session and passed explicitly to each component at
/// construction; nothing reads global flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Wrap each frame payload with the zlib byte-compression stage.
    #[serde(alias = "useByteCompression")]
    pub use_byte_compression: bool,
    /// Frames between forced full (key) frames.  Bounds decoder drift and
    /// provides the only legal segment-rotation cut points.
    #[serde(alias = "keyframeInterval")]
    pub keyframe_interval: u32,
    /// Capacity of the bounded capture→encode hand-off queue.
    #[serde(alias = "queueDepth")]
    pub queue_depth: usize,
    /// Minimum milliseconds between captures (~5 fps ceiling by default).
    #[serde(alias = "frameIntervalMs")]
    pub frame_interval_ms: u64,
    /// Cadence of the rotator's in-memory buffer flushes to disk.
    #[serde(alias = "flushPeriodMs")]
    pub flush_period_ms: u64,
    /// Cadence of segment-rotation requests (honored at the next keyframe).
    #[serde(alias = "rotationPeriodMs")]
    pub rotation_period_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            use_byte_compression: true,
            keyframe_interval: 20,
            queue_depth: 2,
            frame_interval_ms: 190,
            flush_period_ms: 2_000,
            rotation_period_ms: 60_000,
        }
    }
}

impl RecorderConfig {
    /// Capture interval as a [`std::time::Duration`].
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::RecorderConfig;

    #[test]
    fn defaults_match_recording_profile() {
        let cfg = RecorderConfig::default();
        assert!(cfg.use_byte_compression);
        assert_eq!(cfg.keyframe_interval, 20);
        assert_eq!(cfg.queue_depth, 2);
        assert_eq!(cfg.frame_interval_ms, 190);
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "useByteCompression": false,
            "keyframeInterval": 10,
            "queueDepth": 4,
            "frameIntervalMs": 100
        }"#;

        let cfg: RecorderConfig = serde_json::from_str(json).expect("valid camelCase config");
        assert!(!cfg.use_byte_compression);
        assert_eq!(cfg.keyframe_interval, 10);
        assert_eq!(cfg.queue_depth, 4);
        assert_eq!(cfg.frame_interval_ms, 100);
        // Unset fields fall back to defaults.
        assert_eq!(cfg.flush_period_ms, 2_000);
    }

    #[test]
    fn deserializes_snake_case_fields() {
        let json = r#"{
            "use_byte_compression": true,
            "keyframe_interval": 30,
            "rotation_period_ms": 15000
        }"#;

        let cfg: RecorderConfig = serde_json::from_str(json).expect("valid snake_case config");
        assert_eq!(cfg.keyframe_interval, 30);
        assert_eq!(cfg.rotation_period_ms, 15_000);
    }
}
