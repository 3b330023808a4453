use adsync_audio::{encode_wav, DeviceManager, MicrophoneSource, PrerecordedSource};
use adsync_core::SampleSource;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_recorded_sample_encodes_to_matcher_format() {
    let tone: Vec<f32> = (0..160).map(|i| (i as f32 / 160.0) - 0.5).collect();
    let mut source = PrerecordedSource::new(tone, 16000, 1);
    let sample = source.record(Duration::from_millis(250)).await.unwrap();

    let wav = encode_wav(&sample).unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, sample.samples.len());
}

#[tokio::test(start_paused = true)]
async fn test_sources_are_interchangeable_behind_trait() {
    let mut sources: Vec<Box<dyn SampleSource>> = vec![
        Box::new(PrerecordedSource::silence(16000, 1)),
        Box::new(MicrophoneSource::new("default", 16000, 1, 1024)),
    ];
    assert_eq!(sources[0].name(), "prerecorded");
    assert_eq!(sources[1].name(), "default");

    let sample = sources[0].record(Duration::from_millis(100)).await.unwrap();
    assert_eq!(sample.samples.len(), 1600);
}

#[test]
#[ignore] // Requires audio hardware
fn test_unknown_device_is_reported() {
    let result = DeviceManager::new().get_input_device("no such microphone");
    assert!(result.is_err());
}
