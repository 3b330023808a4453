use adsync_core::{MediaSource, PlayerError};
use async_trait::async_trait;

/// A media element that plays the audio-description track.
///
/// Positions are in seconds of media time. The engine never observes the
/// live source; everything it knows comes from these calls and the wall clock.
#[async_trait]
pub trait PlaybackElement: Send {
    fn name(&self) -> &str;
    /// Assign a new source. Any current playback stops.
    fn load(&mut self, source: &MediaSource);
    /// Resolves once enough metadata is known to seek reliably.
    async fn wait_ready(&mut self) -> Result<(), PlayerError>;
    /// Request playback. May be refused when no user gesture allowed it.
    async fn play(&mut self) -> Result<(), PlayerError>;
    /// Resolves once the element is audibly producing output, which can lag
    /// [`play`](Self::play) by an unbounded buffering delay. Never resolves
    /// while paused.
    async fn wait_playing(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, sec: f64);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// Record that the user explicitly asked for playback, lifting autoplay
    /// restrictions for subsequent [`play`](Self::play) calls.
    fn grant_user_activation(&mut self) {}
}
