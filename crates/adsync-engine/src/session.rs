use crate::bias::{BiasAdjustment, BiasController};
use crate::drift::{DriftController, DriftOutcome, DriftPolicy};
use crate::player_trait::PlaybackElement;
use crate::seek::SeekStabilizer;
use adsync_core::config::SyncConfig;
use adsync_core::{
    compute_target_media_ms, Clock, EngineStatus, MatchEvent, PlaybackRequest, PlayerError,
    SessionState, SyncBaseline, SyncError,
};
use std::sync::Arc;

/// One matched clip being played: lives from `start` until re-listen.
#[derive(Debug, Clone, Copy)]
struct Attempt {
    event: MatchEvent,
    target_ms: f64,
}

/// Waiting left over once a command's immediate effects are applied.
///
/// Dropping the future returned by [`SyncSession::finish`] abandons the wait;
/// the session stays in its intermediate state until re-listen or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Wait for the loaded element, then seek and play.
    Load,
    /// Seek and play an element that is already ready.
    Play,
    /// Play after a pause and re-anchor.
    Resume,
}

/// Playback of one audio-description track kept in step with the live source.
///
/// Owns the element, the drift baseline and the bias; every state change
/// goes through [`SessionState::can_transition_to`].
pub struct SyncSession {
    player: Box<dyn PlaybackElement>,
    clock: Arc<dyn Clock>,
    seek: SeekStabilizer,
    drift: DriftController,
    bias: BiasController,
    min_confidence: f64,
    state: SessionState,
    attempt: Option<Attempt>,
    status: EngineStatus,
}

impl SyncSession {
    pub fn new(
        player: Box<dyn PlaybackElement>,
        clock: Arc<dyn Clock>,
        bias: BiasController,
        config: &SyncConfig,
    ) -> Self {
        let status = EngineStatus {
            sync_bias_ms: bias.sync_bias_ms(),
            ..EngineStatus::default()
        };
        Self {
            player,
            clock,
            seek: SeekStabilizer::new(config.playing_timeout()),
            drift: DriftController::new(DriftPolicy::from_config(config)),
            bias,
            min_confidence: 0.0,
            state: SessionState::Idle,
            attempt: None,
            status,
        }
    }

    /// Matches below `min_confidence` are refused instead of played.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn baseline(&self) -> Option<SyncBaseline> {
        self.drift.baseline()
    }

    /// Target media position of the current attempt, in milliseconds.
    pub fn target_ms(&self) -> Option<f64> {
        self.attempt.map(|a| a.target_ms)
    }

    pub fn player(&self) -> &dyn PlaybackElement {
        self.player.as_ref()
    }

    fn transition(&mut self, next: SessionState, action: &'static str) -> Result<(), SyncError> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        tracing::debug!(from = ?self.state, to = ?next, "session transition");
        self.state = next;
        self.status.state = next;
        Ok(())
    }

    /// Abandon the attempt after a failure and surface it.
    fn fail(&mut self, error: SyncError) -> SyncError {
        tracing::warn!("playback attempt failed: {error}");
        self.discard();
        self.status.last_error = Some(error.clone());
        error
    }

    fn discard(&mut self) {
        if !self.player.is_paused() {
            self.player.pause();
        }
        self.player.set_playback_rate(1.0);
        self.drift.clear();
        self.attempt = None;
        self.state = SessionState::Idle;
        self.status.state = SessionState::Idle;
    }

    /// Play the matched clip: load, seek, start and hand off to drift correction.
    pub async fn start(&mut self, request: PlaybackRequest) -> Result<(), SyncError> {
        let pending = self.prepare_start(request)?;
        self.finish(pending).await
    }

    /// Validate the match, enter `Seeking` and hand the source to the element.
    pub fn prepare_start(&mut self, request: PlaybackRequest) -> Result<Pending, SyncError> {
        if self.state != SessionState::Idle {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                action: "start",
            });
        }
        let confidence = request.result.confidence;
        if confidence < self.min_confidence {
            let error = SyncError::LowConfidence {
                confidence,
                threshold: self.min_confidence,
            };
            tracing::warn!(clip_id = %request.result.clip_id, "{error}");
            self.status.last_error = Some(error.clone());
            return Err(error);
        }

        let target_ms = compute_target_media_ms(&request.event, &self.bias.bias_config());
        self.transition(SessionState::Seeking, "start")?;
        self.attempt = Some(Attempt {
            event: request.event,
            target_ms,
        });
        self.status.clip_id = Some(request.result.clip_id.clone());
        self.status.confidence = Some(confidence);
        self.status.last_error = None;
        tracing::info!(
            clip_id = %request.result.clip_id,
            url = %request.source.url,
            target_ms,
            "starting playback attempt"
        );

        self.player.load(&request.source);
        Ok(Pending::Load)
    }

    /// Run the waiting half of a prepared command.
    pub async fn finish(&mut self, pending: Pending) -> Result<(), SyncError> {
        match pending {
            Pending::Resume => self.resume().await,
            Pending::Load | Pending::Play => {
                let attempt = match (self.state, self.attempt) {
                    (SessionState::Seeking, Some(attempt)) => attempt,
                    (from, _) => {
                        return Err(SyncError::InvalidTransition {
                            from,
                            action: "seek",
                        })
                    }
                };
                if pending == Pending::Load {
                    if let Err(e) = self.seek.await_ready(self.player.as_mut()).await {
                        return Err(self.fail(e.into()));
                    }
                }
                self.begin_playback(attempt.event, attempt.target_ms).await
            }
        }
    }

    /// Pre-seek, play and install the baseline.
    async fn begin_playback(&mut self, event: MatchEvent, target_ms: f64) -> Result<(), SyncError> {
        self.seek
            .pre_seek(self.player.as_mut(), self.clock.as_ref(), target_ms, &event);
        match self
            .seek
            .start(self.player.as_mut(), self.clock.as_ref(), target_ms, &event)
            .await
        {
            Ok(baseline) => {
                self.drift.install(baseline);
                self.transition(SessionState::Playing, "play")
            }
            Err(PlayerError::AutoplayBlocked) => {
                tracing::info!("autoplay blocked, waiting for manual start");
                self.transition(SessionState::AwaitingManualStart, "block")?;
                self.status.last_error = Some(SyncError::AutoplayBlocked);
                Err(SyncError::AutoplayBlocked)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// User-initiated start after the platform refused autoplay.
    pub async fn manual_start(&mut self) -> Result<(), SyncError> {
        let pending = self.prepare_manual_start()?;
        self.finish(pending).await
    }

    pub fn prepare_manual_start(&mut self) -> Result<Pending, SyncError> {
        if self.state != SessionState::AwaitingManualStart || self.attempt.is_none() {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                action: "start manually",
            });
        }
        self.transition(SessionState::Seeking, "start manually")?;
        self.status.last_error = None;
        self.player.grant_user_activation();
        Ok(Pending::Play)
    }

    /// One drift sample. Does nothing unless playing.
    pub fn tick(&mut self) -> Option<DriftOutcome> {
        if self.state != SessionState::Playing {
            return None;
        }
        let now_ms = self.clock.now_ms();
        self.drift.correct(self.player.as_mut(), now_ms)
    }

    pub fn pause(&mut self) -> Result<(), SyncError> {
        self.transition(SessionState::Paused, "pause")?;
        self.player.pause();
        self.drift.on_pause(self.player.as_mut());
        tracing::info!(media_sec = self.player.current_time(), "paused");
        Ok(())
    }

    /// Resume and re-anchor on wherever the element actually is.
    pub async fn resume(&mut self) -> Result<(), SyncError> {
        if self.state != SessionState::Paused {
            return Err(SyncError::InvalidTransition {
                from: self.state,
                action: "resume",
            });
        }
        if let Err(e) = self.player.play().await {
            let error = SyncError::from(e);
            self.status.last_error = Some(error.clone());
            return Err(error);
        }
        let timeout = self.seek.playing_timeout();
        if tokio::time::timeout(timeout, self.player.wait_playing())
            .await
            .is_err()
        {
            tracing::debug!(?timeout, "no playing signal on resume, re-anchoring anyway");
        }
        self.drift
            .reset_baseline(self.player.as_ref(), self.clock.now_ms());
        self.transition(SessionState::Playing, "resume")?;
        tracing::info!(media_sec = self.player.current_time(), "resumed");
        Ok(())
    }

    /// Play/pause toggle; also serves as the manual start affordance.
    pub async fn toggle(&mut self) -> Result<(), SyncError> {
        match self.prepare_toggle()? {
            Some(pending) => self.finish(pending).await,
            None => Ok(()),
        }
    }

    /// Pauses right away; resuming or a manual start is left pending.
    pub fn prepare_toggle(&mut self) -> Result<Option<Pending>, SyncError> {
        match self.state {
            SessionState::Playing => self.pause().map(|_| None),
            SessionState::Paused => Ok(Some(Pending::Resume)),
            SessionState::AwaitingManualStart => self.prepare_manual_start().map(Some),
            from => Err(SyncError::InvalidTransition {
                from,
                action: "toggle playback",
            }),
        }
    }

    /// Adjust the user bias; an active playback moves by the same amount.
    pub fn adjust_bias(&mut self, delta_ms: i64) -> BiasAdjustment {
        let adjustment = self.bias.adjust(delta_ms);
        if adjustment.shift_ms != 0 && self.state.is_active() {
            let shifted = (self.player.current_time() + adjustment.shift_ms as f64 / 1000.0).max(0.0);
            self.player.set_current_time(shifted);
            if self.state == SessionState::Playing {
                self.drift
                    .reset_baseline(self.player.as_ref(), self.clock.now_ms());
            }
        }
        self.status.sync_bias_ms = adjustment.sync_bias_ms;
        self.status.announcement = Some(adjustment.announcement.clone());
        self.status.announcement_seq += 1;
        adjustment
    }

    /// Drop the current attempt and wait for a new match.
    pub fn relisten(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        tracing::info!(from = ?self.state, "re-listening");
        self.discard();
        self.status.clip_id = None;
        self.status.confidence = None;
        self.status.last_error = None;
    }

    pub fn stop(&mut self) {
        if self.state != SessionState::Idle {
            self.discard();
        }
        tracing::debug!("session stopped");
    }

    /// Record a failure from outside the session, e.g. a failed listen.
    pub fn report_error(&mut self, error: SyncError) {
        tracing::warn!("{error}");
        self.status.last_error = Some(error);
    }
}
