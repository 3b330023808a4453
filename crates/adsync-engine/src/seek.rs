use crate::player_trait::PlaybackElement;
use adsync_core::{expected_position_sec, Clock, MatchEvent, PlayerError, SyncBaseline};
use std::time::Duration;

/// Gets the element playing at the right position despite load and start-up
/// latency the wall clock keeps running through.
#[derive(Debug, Clone, Copy)]
pub struct SeekStabilizer {
    playing_timeout: Duration,
}

impl Default for SeekStabilizer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl SeekStabilizer {
    pub fn new(playing_timeout: Duration) -> Self {
        Self { playing_timeout }
    }

    pub fn playing_timeout(&self) -> Duration {
        self.playing_timeout
    }

    /// Wait for the element to know enough about its source to seek.
    pub async fn await_ready(&self, player: &mut dyn PlaybackElement) -> Result<(), PlayerError> {
        player.wait_ready().await?;
        tracing::debug!(element = player.name(), "element ready");
        Ok(())
    }

    /// Position the element where the clip is now, before asking it to play.
    pub fn pre_seek(
        &self,
        player: &mut dyn PlaybackElement,
        clock: &dyn Clock,
        target_ms: f64,
        event: &MatchEvent,
    ) -> f64 {
        let pre_seek_sec = expected_position_sec(target_ms, event, clock.now_ms());
        player.set_current_time(pre_seek_sec);
        tracing::debug!(pre_seek_sec, "pre-seek");
        pre_seek_sec
    }

    /// Start playback, then correct for however long the element took to
    /// become audible. The returned baseline snapshots the corrected position.
    pub async fn start(
        &self,
        player: &mut dyn PlaybackElement,
        clock: &dyn Clock,
        target_ms: f64,
        event: &MatchEvent,
    ) -> Result<SyncBaseline, PlayerError> {
        player.play().await?;

        if tokio::time::timeout(self.playing_timeout, player.wait_playing())
            .await
            .is_err()
        {
            tracing::debug!(timeout = ?self.playing_timeout, "no playing signal, correcting anyway");
        }

        let now_ms = clock.now_ms();
        let corrected_sec = expected_position_sec(target_ms, event, now_ms);
        player.set_current_time(corrected_sec);

        let baseline = SyncBaseline {
            wall_ref_ms: now_ms,
            media_ref_sec: player.current_time(),
        };
        tracing::info!(
            media_sec = baseline.media_ref_sec,
            "playback started"
        );
        Ok(baseline)
    }

    /// Load-to-baseline in one go.
    pub async fn run(
        &self,
        player: &mut dyn PlaybackElement,
        clock: &dyn Clock,
        target_ms: f64,
        event: &MatchEvent,
    ) -> Result<SyncBaseline, PlayerError> {
        self.await_ready(player).await?;
        self.pre_seek(player, clock, target_ms, event);
        self.start(player, clock, target_ms, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_player::SimulatedPlayer;
    use adsync_core::{MediaSource, WallClock};

    fn loaded(player: SimulatedPlayer) -> SimulatedPlayer {
        let mut player = player;
        player.load(&MediaSource {
            clip_id: "demo".to_string(),
            url: "file://demo.mp3".to_string(),
        });
        player
    }

    fn event_at(clock: &WallClock) -> MatchEvent {
        MatchEvent {
            matched_clip_offset_ms: 15000.0,
            listen_start_wall_ms: clock.now_ms() - 2000.0,
            matched_at_wall_ms: clock.now_ms(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_accounts_for_load_and_start_latency() {
        let clock = WallClock::starting_at(100_000.0);
        let event = event_at(&clock);
        let mut player = loaded(
            SimulatedPlayer::new()
                .with_ready_delay(Duration::from_millis(300))
                .with_start_latency(Duration::from_millis(200)),
        );
        let stabilizer = SeekStabilizer::default();

        let baseline = stabilizer
            .run(&mut player, &clock, 17155.0, &event)
            .await
            .unwrap();

        // 300 ms load + 200 ms until audible
        assert!((baseline.wall_ref_ms - 100_500.0).abs() < 1e-6);
        assert!((baseline.media_ref_sec - 17.655).abs() < 1e-6);
        assert!((player.current_time() - 17.655).abs() < 1e-6);
        assert_eq!(player.seek_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_times_out_on_missing_playing_signal() {
        let clock = WallClock::starting_at(0.0);
        let event = MatchEvent {
            matched_clip_offset_ms: 0.0,
            listen_start_wall_ms: 0.0,
            matched_at_wall_ms: 0.0,
        };
        let mut player =
            loaded(SimulatedPlayer::new().with_start_latency(Duration::from_secs(10)));
        let stabilizer = SeekStabilizer::new(Duration::from_millis(500));

        let baseline = stabilizer.start(&mut player, &clock, 1000.0, &event).await.unwrap();
        assert!((baseline.wall_ref_ms - 500.0).abs() < 1e-6);
        assert!((baseline.media_ref_sec - 1.5).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_seek_adds_time_since_match() {
        let clock = WallClock::starting_at(5000.0);
        let event = MatchEvent {
            matched_clip_offset_ms: 0.0,
            listen_start_wall_ms: 3000.0,
            matched_at_wall_ms: 4000.0,
        };
        let mut player = loaded(SimulatedPlayer::new());
        let sec = SeekStabilizer::default().pre_seek(&mut player, &clock, 2000.0, &event);
        assert!((sec - 3.0).abs() < 1e-9);
        assert!((player.current_time() - 3.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_load_failure() {
        let clock = WallClock::starting_at(0.0);
        let event = event_at(&clock);
        let mut player = loaded(SimulatedPlayer::new().with_load_error("decode error"));
        let result = SeekStabilizer::default()
            .run(&mut player, &clock, 0.0, &event)
            .await;
        assert_eq!(result, Err(PlayerError::LoadFailed("decode error".to_string())));
        assert_eq!(player.seek_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_autoplay_blocked_after_pre_seek() {
        let clock = WallClock::starting_at(0.0);
        let event = event_at(&clock);
        let mut player = loaded(SimulatedPlayer::new().with_autoplay(false));
        let result = SeekStabilizer::default()
            .run(&mut player, &clock, 0.0, &event)
            .await;
        assert_eq!(result, Err(PlayerError::AutoplayBlocked));
        assert_eq!(player.seek_count(), 1);
        assert!(player.is_paused());
    }
}
