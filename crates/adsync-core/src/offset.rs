use crate::types::{BiasConfig, MatchEvent};

/// Media time (ms) the live source has reached by `match.matched_at_wall_ms`.
///
/// The capture/match latency is added to the matched offset because the source
/// kept playing while the sample was being identified. Both bias terms model
/// constant forward latency. Never negative.
pub fn compute_target_media_ms(event: &MatchEvent, bias: &BiasConfig) -> f64 {
    let raw = event.elapsed_ms()
        + event.matched_clip_offset_ms
        + bias.sync_bias_ms
        + bias.capture_bias_ms;
    raw.max(0.0)
}

/// Position (seconds) the element should be at when the wall clock reads `now_ms`,
/// given a target computed at `event.matched_at_wall_ms`.
pub fn expected_position_sec(target_ms: f64, event: &MatchEvent, now_ms: f64) -> f64 {
    target_ms / 1000.0 + ((now_ms - event.matched_at_wall_ms) / 1000.0).max(0.0)
}
