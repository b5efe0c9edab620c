//! Sentinel-based trigger for loading the next page.

/// Where the sentinel element sits relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelObservation {
    /// Distance in pixels from the bottom edge of the viewport to the
    /// sentinel. Zero or negative means the sentinel is visible.
    pub distance_px: f64,
}

impl SentinelObservation {
    pub fn at(distance_px: f64) -> Self {
        Self { distance_px }
    }

    pub fn visible() -> Self {
        Self { distance_px: 0.0 }
    }
}

/// Decides when an observed sentinel should request the next page.
#[derive(Debug, Clone)]
pub struct VisibilityTrigger {
    threshold_px: f64,
    enabled: bool,
}

impl VisibilityTrigger {
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px: threshold_px.max(0.0),
            enabled: true,
        }
    }

    pub fn threshold_px(&self) -> f64 {
        self.threshold_px
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when the sentinel is within range, more pages exist, and no
    /// fetch for the list is still pending.
    pub fn should_load(&self, observation: SentinelObservation, pending: bool, has_more: bool) -> bool {
        self.enabled && !pending && has_more && observation.distance_px <= self.threshold_px
    }
}

impl Default for VisibilityTrigger {
    fn default() -> Self {
        Self::new(200.0)
    }
}
