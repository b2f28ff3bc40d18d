use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rubato::{FftFixedInOut, Resampler};

use crate::shared::entities::AudioClip;

/// Every clip entering the classifier and transcriber is mono at this rate.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

const RESAMPLE_CHUNK: usize = 1024;

/// Decode a WAV file to f32 samples in [-1, 1], interleaved as stored.
pub fn load_wav(path: impl AsRef<Path>) -> Result<AudioClip> {
    let path = path.as_ref();
    let reader = WavReader::open(path).with_context(|| format!("open wav: {path:?}"))?;
    read_clip(reader)
}

fn read_clip<R: Read>(reader: WavReader<R>) -> Result<AudioClip> {
    let spec = reader.spec();
    if spec.channels == 0 {
        anyhow::bail!("wav with zero channels");
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("read float samples")?,
        SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("read int samples")?
        }
    };

    Ok(AudioClip::new(samples, spec.sample_rate, spec.channels))
}

/// Mixdown to mono by per-frame averaging.
pub fn to_mono(clip: &AudioClip) -> AudioClip {
    if clip.channels <= 1 {
        return clip.clone();
    }

    let channels = clip.channels as usize;
    let mono: Vec<f32> = clip
        .samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    AudioClip::new(mono, clip.sample_rate, 1)
}

/// Resample a mono clip to `target_rate`. Pass-through when the rate already
/// matches.
pub fn resample(clip: &AudioClip, target_rate: u32) -> Result<AudioClip> {
    if clip.sample_rate == target_rate {
        return Ok(clip.clone());
    }
    if clip.channels != 1 {
        anyhow::bail!("resampling requires mono audio, got {} ch", clip.channels);
    }
    if clip.samples.is_empty() {
        return Ok(AudioClip::new(Vec::new(), target_rate, 1));
    }

    let ratio = target_rate as f64 / clip.sample_rate as f64;
    let mut resampler = FftFixedInOut::<f32>::new(
        clip.sample_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        1,
    )
    .context("create resampler")?;

    let mut output = Vec::with_capacity((clip.samples.len() as f64 * ratio) as usize);
    let mut pos = 0;
    loop {
        // The resampler fixes its own chunk length to fit the rate ratio;
        // feed exactly what it asks for.
        let needed = resampler.input_frames_next();
        if pos + needed > clip.samples.len() {
            break;
        }
        let input = vec![clip.samples[pos..pos + needed].to_vec()];
        let processed = resampler.process(&input, None).context("resample chunk")?;
        output.extend_from_slice(&processed[0]);
        pos += needed;
    }

    // Zero-pad the tail chunk and keep only the proportional output.
    if pos < clip.samples.len() {
        let needed = resampler.input_frames_next();
        let tail_len = clip.samples.len() - pos;
        let mut remaining = clip.samples[pos..].to_vec();
        remaining.resize(needed, 0.0);
        let processed = resampler
            .process(&vec![remaining], None)
            .context("resample tail")?;
        let take = (tail_len as f64 * ratio).round() as usize;
        output.extend_from_slice(&processed[0][..take.min(processed[0].len())]);
    }

    Ok(AudioClip::new(output, target_rate, 1))
}

/// Mixdown + resample. The returned clip is mono at [`TARGET_SAMPLE_RATE`].
pub fn normalize(clip: &AudioClip) -> Result<AudioClip> {
    let mono = to_mono(clip);
    let normalized = resample(&mono, TARGET_SAMPLE_RATE)?;
    debug_assert_eq!(normalized.channels, 1);
    debug_assert_eq!(normalized.sample_rate, TARGET_SAMPLE_RATE);
    Ok(normalized)
}

/// Write a mono clip as 16-bit PCM WAV, the format the transcriber accepts.
pub fn write_pcm16_wav(clip: &AudioClip, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if clip.channels != 1 {
        anyhow::bail!("expected mono clip for pcm16 output, got {} ch", clip.channels);
    }
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("create pcm16 wav: {path:?}"))?;
    for &sample in &clip.samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mono_averages_frames() {
        // L=1.0 R=0.0, L=0.5 R=0.5
        let stereo = AudioClip::new(vec![1.0, 0.0, 0.5, 0.5], 16_000, 2);
        let mono = to_mono(&stereo);
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples.len(), 2);
        assert!((mono.samples[0] - 0.5).abs() < 1e-6);
        assert!((mono.samples[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn resample_is_identity_at_target_rate() {
        let clip = AudioClip::new(vec![0.25; 2048], 16_000, 1);
        let out = resample(&clip, 16_000).unwrap();
        assert_eq!(out.sample_rate, 16_000);
        assert_eq!(out.samples.len(), clip.samples.len());
    }

    #[test]
    fn resample_halves_sample_count_from_32k() {
        let clip = AudioClip::new(vec![0.0; 4096], 32_000, 1);
        let out = resample(&clip, 16_000).unwrap();
        assert_eq!(out.sample_rate, 16_000);
        let expected = clip.samples.len() / 2;
        let tolerance = expected / 10;
        assert!(
            out.samples.len().abs_diff(expected) <= tolerance,
            "got {} samples, expected about {}",
            out.samples.len(),
            expected
        );
    }

    #[test]
    fn normalize_upholds_mono_16k_invariant() {
        let clip = AudioClip::new(vec![0.1; 8820], 44_100, 2);
        let out = normalize(&clip).unwrap();
        assert_eq!(out.channels, 1);
        assert_eq!(out.sample_rate, TARGET_SAMPLE_RATE);
    }

    #[test]
    fn pcm16_roundtrip_preserves_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let clip = AudioClip::new(vec![0.0, 0.5, -0.5, 1.0, -1.0], 16_000, 1);
        write_pcm16_wav(&clip, &path).unwrap();

        let back = load_wav(&path).unwrap();
        assert_eq!(back.channels, 1);
        assert_eq!(back.sample_rate, 16_000);
        assert_eq!(back.samples.len(), clip.samples.len());
        for (a, b) in clip.samples.iter().zip(back.samples.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }
}
