use crate::device::DeviceManager;
use adsync_core::{AudioError, AudioSample, SampleSource};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use std::time::Duration;

/// Records listen samples from a microphone.
///
/// The cpal stream lives on a blocking thread for the length of one recording,
/// so the source itself stays `Send`.
#[derive(Debug, Clone)]
pub struct MicrophoneSource {
    device_name: String,
    sample_rate: u32,
    channels: u16,
    buffer_size: u32,
}

impl MicrophoneSource {
    pub fn new(device_name: &str, sample_rate: u32, channels: u16, buffer_size: u32) -> Self {
        Self {
            device_name: device_name.to_string(),
            sample_rate,
            channels,
            buffer_size,
        }
    }

    pub fn from_config(config: &adsync_core::config::ListenConfig) -> Self {
        Self::new(
            &config.device_name,
            config.sample_rate,
            config.channels,
            config.buffer_size,
        )
    }
}

/// Ring capacity for `duration` of audio plus one second of slack.
pub fn capture_capacity(sample_rate: u32, channels: u16, duration: Duration) -> usize {
    let secs = duration.as_secs_f64() + 1.0;
    (sample_rate as f64 * channels as f64 * secs).ceil() as usize
}

fn record_blocking(
    device_name: &str,
    sample_rate: u32,
    channels: u16,
    buffer_size: u32,
    duration: Duration,
) -> Result<AudioSample, AudioError> {
    let device = DeviceManager::new().get_input_device(device_name)?;
    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Fixed(buffer_size),
    };

    let (mut producer, mut consumer) =
        HeapRb::<f32>::new(capture_capacity(sample_rate, channels, duration)).split();

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Overflow past the slack second is dropped
                producer.push_slice(data);
            },
            |err: cpal::StreamError| {
                tracing::error!("capture stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;
    std::thread::sleep(duration);
    drop(stream);

    let mut samples = vec![0.0f32; consumer.occupied_len()];
    let read = consumer.pop_slice(&mut samples);
    samples.truncate(read);

    Ok(AudioSample {
        samples,
        sample_rate,
        channels,
    })
}

#[async_trait]
impl SampleSource for MicrophoneSource {
    fn name(&self) -> &str {
        &self.device_name
    }

    async fn record(&mut self, duration: Duration) -> Result<AudioSample, AudioError> {
        let device_name = self.device_name.clone();
        let (sample_rate, channels, buffer_size) =
            (self.sample_rate, self.channels, self.buffer_size);

        let sample = tokio::task::spawn_blocking(move || {
            record_blocking(&device_name, sample_rate, channels, buffer_size, duration)
        })
        .await
        .map_err(|e| AudioError::StreamError(e.to_string()))??;

        tracing::debug!(
            device = %self.device_name,
            samples = sample.samples.len(),
            "captured listen sample"
        );
        Ok(sample)
    }
}
