use crate::player_trait::PlaybackElement;
use adsync_core::config::SyncConfig;
use adsync_core::{DriftSample, SyncBaseline};

/// Thresholds and gains for closed-loop correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftPolicy {
    pub threshold_sec: f64,
    pub gain: f64,
    pub max_rate_correction: f64,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            threshold_sec: 0.25,
            gain: 0.5,
            max_rate_correction: 0.02,
        }
    }
}

impl DriftPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            threshold_sec: config.drift_threshold_sec,
            gain: config.correction_gain,
            max_rate_correction: config.max_rate_correction,
        }
    }

    /// Pick the correction for a measured drift (actual minus expected).
    pub fn evaluate(&self, drift_sec: f64) -> Correction {
        if drift_sec.abs() > self.threshold_sec {
            Correction::Hard
        } else {
            let adjust = (-drift_sec * self.gain)
                .clamp(-self.max_rate_correction, self.max_rate_correction);
            Correction::Soft { rate: 1.0 + adjust }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Jump to the expected position and re-anchor.
    Hard,
    /// Nudge the playback rate, keeping the baseline.
    Soft { rate: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftOutcome {
    pub sample: DriftSample,
    pub correction: Correction,
}

/// Keeps the playback element aligned with a wall-clock baseline.
pub struct DriftController {
    policy: DriftPolicy,
    baseline: Option<SyncBaseline>,
}

impl DriftController {
    pub fn new(policy: DriftPolicy) -> Self {
        Self {
            policy,
            baseline: None,
        }
    }

    pub fn policy(&self) -> DriftPolicy {
        self.policy
    }

    pub fn baseline(&self) -> Option<SyncBaseline> {
        self.baseline
    }

    pub fn install(&mut self, baseline: SyncBaseline) {
        tracing::debug!(
            wall_ref_ms = baseline.wall_ref_ms,
            media_ref_sec = baseline.media_ref_sec,
            "baseline installed"
        );
        self.baseline = Some(baseline);
    }

    /// Re-anchor on whatever the element reports right now.
    pub fn reset_baseline(&mut self, player: &dyn PlaybackElement, now_ms: f64) {
        self.install(SyncBaseline {
            wall_ref_ms: now_ms,
            media_ref_sec: player.current_time(),
        });
    }

    pub fn clear(&mut self) {
        self.baseline = None;
    }

    /// Compare the element's position with the baseline's prediction.
    pub fn measure(&self, player: &dyn PlaybackElement, now_ms: f64) -> Option<DriftSample> {
        let baseline = self.baseline?;
        let expected_sec = baseline.expected_sec(now_ms);
        let actual_sec = player.current_time();
        Some(DriftSample {
            expected_sec,
            actual_sec,
            drift_sec: actual_sec - expected_sec,
        })
    }

    /// Take one sample and apply the resulting correction.
    ///
    /// Returns `None` when no baseline is installed.
    pub fn correct(
        &mut self,
        player: &mut dyn PlaybackElement,
        now_ms: f64,
    ) -> Option<DriftOutcome> {
        let sample = self.measure(player, now_ms)?;
        let correction = self.policy.evaluate(sample.drift_sec);
        match correction {
            Correction::Hard => {
                tracing::info!(
                    drift_sec = sample.drift_sec,
                    expected_sec = sample.expected_sec,
                    "hard drift correction"
                );
                player.set_current_time(sample.expected_sec);
                player.set_playback_rate(1.0);
                self.reset_baseline(player, now_ms);
            }
            Correction::Soft { rate } => {
                tracing::debug!(drift_sec = sample.drift_sec, rate, "soft drift correction");
                player.set_playback_rate(rate);
            }
        }
        Some(DriftOutcome { sample, correction })
    }

    /// Sampling stops while paused; the rate goes back to nominal.
    pub fn on_pause(&mut self, player: &mut dyn PlaybackElement) {
        player.set_playback_rate(1.0);
    }
}
