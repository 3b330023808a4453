use adsync_core::{AudioError, AudioSample, SampleSource};
use async_trait::async_trait;
use std::time::Duration;

/// Sample source that replays fixed audio in real time.
///
/// Used when no microphone is available and by tests; recording still takes
/// the requested wall-clock time so capture latency is realistic.
#[derive(Debug, Clone)]
pub struct PrerecordedSource {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    record_count: usize,
}

impl PrerecordedSource {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
            record_count: 0,
        }
    }

    pub fn silence(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels)
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

#[async_trait]
impl SampleSource for PrerecordedSource {
    fn name(&self) -> &str {
        "prerecorded"
    }

    async fn record(&mut self, duration: Duration) -> Result<AudioSample, AudioError> {
        tokio::time::sleep(duration).await;
        self.record_count += 1;

        let wanted = (duration.as_secs_f64() * self.sample_rate as f64).round() as usize
            * self.channels as usize;
        let samples = if self.samples.is_empty() {
            vec![0.0; wanted]
        } else {
            self.samples.iter().copied().cycle().take(wanted).collect()
        };

        Ok(AudioSample {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        })
    }
}
