//! Runtime settings for the capture engine.

use std::time::Duration;

/// Name the X server gives the keyboard half of the XTEST device.
pub const XTEST_KEYBOARD_NAME: &str = "Virtual core XTEST keyboard";

/// Default upper bound on how long the capture loop waits for events
/// before checking whether it has been cancelled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Settings for [`crate::KeyboardCapture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device whose events are never reported.
    pub xtest_device_name: String,
    /// Longest wait for input between cancellation checks. This also bounds
    /// how long [`crate::KeyboardCapture::cancel`] blocks.
    pub poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            xtest_device_name: XTEST_KEYBOARD_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name of the synthetic input device to ignore.
    pub fn with_xtest_device_name(mut self, name: impl Into<String>) -> Self {
        self.xtest_device_name = name.into();
        self
    }

    /// Set the loop's poll interval. Zero is raised to one millisecond.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.xtest_device_name, "Virtual core XTEST keyboard");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_builder() {
        let config = CaptureConfig::new()
            .with_xtest_device_name("Other XTEST keyboard")
            .with_poll_interval(Duration::ZERO);
        assert_eq!(config.xtest_device_name, "Other XTEST keyboard");
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }
}
