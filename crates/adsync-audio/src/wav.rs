use adsync_core::{AudioError, AudioSample};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Encode a sample as 16-bit PCM WAV, the upload format the matcher accepts.
pub fn encode_wav(sample: &AudioSample) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: sample.channels,
        sample_rate: sample.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).map_err(|e| AudioError::Encode(e.to_string()))?;
        for &s in &sample.samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| AudioError::Encode(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::Encode(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}
