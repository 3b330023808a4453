use crate::matcher_trait::{Catalog, Matcher};
use adsync_core::{AudioSample, MatchError, MatchRequest, MatchResult, MediaSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
struct FixedConfig {
    #[serde(default = "default_clip_id")]
    clip_id: String,
    #[serde(default)]
    offset_ms: i64,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default = "default_media_url")]
    media_url: String,
    /// Simulated network + inference time per match.
    #[serde(default)]
    latency_ms: u64,
}

impl Default for FixedConfig {
    fn default() -> Self {
        Self {
            clip_id: default_clip_id(),
            offset_ms: 0,
            confidence: default_confidence(),
            media_url: default_media_url(),
            latency_ms: 0,
        }
    }
}

fn default_clip_id() -> String {
    "demo".to_string()
}

fn default_confidence() -> f64 {
    1.0
}

fn default_media_url() -> String {
    "file://demo-ad.mp3".to_string()
}

/// Matcher that answers every sample with a configured result.
///
/// Stands in for the remote service in offline runs and tests.
pub struct FixedMatcher {
    config: FixedConfig,
    match_count: AtomicUsize,
}

impl FixedMatcher {
    pub fn new() -> Self {
        Self {
            config: FixedConfig::default(),
            match_count: AtomicUsize::new(0),
        }
    }

    pub fn match_count(&self) -> usize {
        self.match_count.load(Ordering::Relaxed)
    }
}

impl Default for FixedMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Catalog for FixedMatcher {
    async fn resolve_source(&self, clip_id: &str, _lang: &str) -> Result<MediaSource, MatchError> {
        if clip_id != self.config.clip_id {
            return Err(MatchError::SourceUnavailable(format!(
                "no source for clip '{clip_id}'"
            )));
        }
        Ok(MediaSource {
            clip_id: clip_id.to_string(),
            url: self.config.media_url.clone(),
        })
    }
}

#[async_trait]
impl Matcher for FixedMatcher {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), MatchError> {
        self.config = config
            .try_into()
            .map_err(|e: toml::de::Error| MatchError::InitializationFailed(e.to_string()))?;
        Ok(())
    }

    async fn match_sample(
        &self,
        sample: &AudioSample,
        request: &MatchRequest,
    ) -> Result<MatchResult, MatchError> {
        if let Some(hint) = request.clip_hint.as_deref() {
            if hint != self.config.clip_id {
                return Err(MatchError::NoMatch);
            }
        }
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let count = self.match_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(
            "FixedMatcher match #{count}, {:.0} ms sample",
            sample.duration_ms()
        );
        Ok(MatchResult {
            clip_id: self.config.clip_id.clone(),
            offset_ms: self.config.offset_ms,
            confidence: self.config.confidence,
        })
    }

    async fn shutdown(&self) -> Result<(), MatchError> {
        Ok(())
    }
}
