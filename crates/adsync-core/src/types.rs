/// Outcome of one listening attempt, with the local timing captured around it.
///
/// All wall-clock values are milliseconds on the same [`Clock`](crate::Clock).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEvent {
    pub matched_clip_offset_ms: f64,
    pub listen_start_wall_ms: f64,
    pub matched_at_wall_ms: f64,
}

impl MatchEvent {
    /// Wall-clock time spent capturing and matching.
    pub fn elapsed_ms(&self) -> f64 {
        self.matched_at_wall_ms - self.listen_start_wall_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasConfig {
    pub sync_bias_ms: f64,
    pub capture_bias_ms: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            sync_bias_ms: crate::DEFAULT_SYNC_BIAS_MS as f64,
            capture_bias_ms: crate::CAPTURE_BIAS_MS,
        }
    }
}

/// Wall-clock instant paired with the media time the element reported at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncBaseline {
    pub wall_ref_ms: f64,
    pub media_ref_sec: f64,
}

impl SyncBaseline {
    /// Position the element should be at, `now_ms` on the wall clock.
    pub fn expected_sec(&self, now_ms: f64) -> f64 {
        self.media_ref_sec + (now_ms - self.wall_ref_ms) / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftSample {
    pub expected_sec: f64,
    pub actual_sec: f64,
    pub drift_sec: f64,
}

#[derive(Debug, Clone)]
pub struct AudioSample {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioSample {
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        frames * 1000.0 / self.sample_rate as f64
    }
}

/// Answer from the external fingerprint matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub clip_id: String,
    pub offset_ms: i64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub clip_hint: Option<String>,
    pub lang: String,
}

impl Default for MatchRequest {
    fn default() -> Self {
        Self {
            clip_hint: None,
            lang: "E".to_string(),
        }
    }
}

/// Playable source for an audio-description track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub clip_id: String,
    pub url: String,
}
