use crate::error::AudioError;
use crate::types::AudioSample;
use async_trait::async_trait;
use std::time::Duration;

/// Something that can record a short listen sample of the room.
#[async_trait]
pub trait SampleSource: Send {
    fn name(&self) -> &str;
    /// Record for `duration` and return what was heard.
    async fn record(&mut self, duration: Duration) -> Result<AudioSample, AudioError>;
}
