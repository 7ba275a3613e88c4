/// WAV file reading and writing
use anyhow::{bail, Context, Result};
use automaster_core::{AudioBuffer, AudioFormat, SampleRate};
use std::path::Path;

/// Read a WAV file into an interleaved float buffer
///
/// Integer samples are scaled to [-1, 1).
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("Failed to read {}", path.display()))?,
        hound::SampleFormat::Int => {
            if !(1..=32).contains(&spec.bits_per_sample) {
                bail!("Unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| (f64::from(s) * scale) as f32))
                .collect::<Result<_, _>>()
                .with_context(|| format!("Failed to read {}", path.display()))?
        }
    };

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        samples = samples.len(),
        "Read WAV"
    );

    let format = AudioFormat::new(
        SampleRate::new(spec.sample_rate),
        spec.channels,
        spec.bits_per_sample,
    );
    Ok(AudioBuffer::new(samples, format))
}

/// Write a buffer as 32-bit float WAV
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.format.channels,
        sample_rate: buffer.format.sample_rate.as_hz(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in &buffer.samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finish {}", path.display()))?;

    tracing::debug!(path = %path.display(), frames = buffer.frames(), "Wrote WAV");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_integer_samples_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm16.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in [16_384i16, -16_384, i16::MIN, 0] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.samples, vec![0.5, -0.5, -1.0, 0.0]);
        assert_eq!(buffer.format.sample_rate, SampleRate::CD_QUALITY);
        assert_eq!(buffer.format.channels, 2);
        assert_eq!(buffer.frames(), 2);
    }

    #[test]
    fn float_files_keep_samples_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let buffer = AudioBuffer::new(
            vec![0.25, -0.125, 1.5, -0.0],
            AudioFormat::new(SampleRate::DVD_QUALITY, 1, 32),
        );
        write_wav(&path, &buffer).unwrap();

        let read = read_wav(&path).unwrap();
        assert_eq!(read, buffer);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_wav(&dir.path().join("nope.wav")).unwrap_err();
        assert!(err.to_string().contains("nope.wav"));
    }
}
