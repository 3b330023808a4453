use crate::player_trait::PlaybackElement;
use adsync_core::config::PlayerConfig;
use adsync_core::{MediaSource, PlayerError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

struct Inner {
    source: Option<MediaSource>,
    loaded_at: Instant,
    ready_delay: Duration,
    start_latency: Duration,
    autoplay_allowed: bool,
    load_error: Option<String>,
    duration_sec: f64,
    clock_skew: f64,

    anchor_media_sec: f64,
    anchor_at: Instant,
    rate: f64,
    paused: bool,
    audible_at: Option<Instant>,
    seek_count: usize,
}

impl Inner {
    fn position_at(&self, now: Instant) -> f64 {
        let Some(audible_at) = self.audible_at else {
            return self.anchor_media_sec;
        };
        if self.paused || now < audible_at {
            return self.anchor_media_sec;
        }
        let since = now - self.anchor_at.max(audible_at);
        let advanced = since.as_secs_f64() * self.rate * (1.0 + self.clock_skew);
        (self.anchor_media_sec + advanced).clamp(0.0, self.duration_sec)
    }

    fn rebase(&mut self, now: Instant) {
        self.anchor_media_sec = self.position_at(now);
        self.anchor_at = now;
    }
}

/// Software playback element driven by the tokio clock.
///
/// Models the parts of a real media element the engine has to cope with:
/// metadata load time, a buffering gap between `play()` and audible output,
/// autoplay refusal and a media clock that runs slightly fast or slow.
/// Clones share the same element.
#[derive(Clone)]
pub struct SimulatedPlayer {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                source: None,
                loaded_at: now,
                ready_delay: Duration::ZERO,
                start_latency: Duration::ZERO,
                autoplay_allowed: true,
                load_error: None,
                duration_sec: f64::MAX,
                clock_skew: 0.0,
                anchor_media_sec: 0.0,
                anchor_at: now,
                rate: 1.0,
                paused: true,
                audible_at: None,
                seek_count: 0,
            })),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new()
            .with_ready_delay(Duration::from_millis(config.ready_delay_ms))
            .with_start_latency(Duration::from_millis(config.start_latency_ms))
            .with_clock_skew(config.clock_skew)
            .with_autoplay(config.autoplay_allowed)
            .with_duration(config.duration_sec)
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_ready_delay(self, delay: Duration) -> Self {
        self.inner().ready_delay = delay;
        self
    }

    pub fn with_start_latency(self, latency: Duration) -> Self {
        self.inner().start_latency = latency;
        self
    }

    pub fn with_clock_skew(self, skew: f64) -> Self {
        self.inner().clock_skew = skew;
        self
    }

    pub fn with_autoplay(self, allowed: bool) -> Self {
        self.inner().autoplay_allowed = allowed;
        self
    }

    pub fn with_duration(self, duration_sec: f64) -> Self {
        self.inner().duration_sec = duration_sec;
        self
    }

    /// Make the next load fail with `reason`.
    pub fn with_load_error(self, reason: &str) -> Self {
        self.inner().load_error = Some(reason.to_string());
        self
    }

    pub fn source(&self) -> Option<MediaSource> {
        self.inner().source.clone()
    }

    /// Number of explicit position changes made through the element API.
    pub fn seek_count(&self) -> usize {
        self.inner().seek_count
    }

    /// Shift the media clock without going through the element API, as a
    /// decoder stall or glitch would.
    pub fn glitch(&self, delta_sec: f64) {
        let mut inner = self.inner();
        inner.rebase(Instant::now());
        inner.anchor_media_sec = (inner.anchor_media_sec + delta_sec).max(0.0);
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackElement for SimulatedPlayer {
    fn name(&self) -> &str {
        "simulated"
    }

    fn load(&mut self, source: &MediaSource) {
        let now = Instant::now();
        let mut inner = self.inner();
        inner.source = Some(source.clone());
        inner.loaded_at = now;
        inner.anchor_media_sec = 0.0;
        inner.anchor_at = now;
        inner.rate = 1.0;
        inner.paused = true;
        inner.audible_at = None;
        tracing::debug!(url = %source.url, "simulated element loading");
    }

    async fn wait_ready(&mut self) -> Result<(), PlayerError> {
        let ready_at = {
            let inner = self.inner();
            if inner.source.is_none() {
                return Err(PlayerError::LoadFailed("no source assigned".to_string()));
            }
            if let Some(reason) = &inner.load_error {
                return Err(PlayerError::LoadFailed(reason.clone()));
            }
            inner.loaded_at + inner.ready_delay
        };
        tokio::time::sleep_until(ready_at).await;
        Ok(())
    }

    async fn play(&mut self) -> Result<(), PlayerError> {
        let now = Instant::now();
        let mut inner = self.inner();
        if !inner.autoplay_allowed {
            return Err(PlayerError::AutoplayBlocked);
        }
        if inner.paused {
            inner.rebase(now);
            inner.paused = false;
            inner.audible_at = Some(now + inner.start_latency);
        }
        Ok(())
    }

    async fn wait_playing(&mut self) {
        let audible_at = {
            let inner = self.inner();
            if inner.paused {
                None
            } else {
                inner.audible_at
            }
        };
        match audible_at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }

    fn pause(&mut self) {
        let now = Instant::now();
        let mut inner = self.inner();
        inner.rebase(now);
        inner.paused = true;
        inner.audible_at = None;
    }

    fn is_paused(&self) -> bool {
        self.inner().paused
    }

    fn current_time(&self) -> f64 {
        self.inner().position_at(Instant::now())
    }

    fn set_current_time(&mut self, sec: f64) {
        let now = Instant::now();
        let mut inner = self.inner();
        inner.anchor_media_sec = sec.clamp(0.0, inner.duration_sec);
        inner.anchor_at = now;
        inner.seek_count += 1;
    }

    fn playback_rate(&self) -> f64 {
        self.inner().rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let now = Instant::now();
        let mut inner = self.inner();
        inner.rebase(now);
        inner.rate = rate;
    }

    fn grant_user_activation(&mut self) {
        self.inner().autoplay_allowed = true;
    }
}
