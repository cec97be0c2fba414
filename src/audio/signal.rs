//! Signal sources feeding the sound engine

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::f32::consts::PI;
use std::path::Path;

/// A mono sample stream
pub trait Signal: Send {
    /// Next sample in [-1.0, 1.0], or `None` once the source is exhausted
    fn next_sample(&mut self) -> Option<f32>;

    fn sample_rate(&self) -> u32;

    fn name(&self) -> &str;
}

/// Quiet ambient drone: root, fifth and octave with a slow swell.
///
/// The gain is intentionally low so the drone sits under everything else;
/// the renderers amplify what they get by a fixed factor to compensate.
#[derive(Debug, Clone)]
pub struct AmbientTone {
    sample_rate: u32,
    root_hz: f32,
    gain: f32,
    phases: [f32; 3],
    lfo_phase: f32,
}

impl AmbientTone {
    pub const DEFAULT_ROOT_HZ: f32 = 55.0;
    pub const DEFAULT_GAIN: f32 = 0.08;

    const RATIOS: [f32; 3] = [1.0, 1.5, 2.0];
    const WEIGHTS: [f32; 3] = [0.6, 0.25, 0.15];
    const LFO_HZ: f32 = 0.1;

    pub fn new(sample_rate: u32) -> Self {
        Self::with_params(sample_rate, Self::DEFAULT_ROOT_HZ, Self::DEFAULT_GAIN)
    }

    pub fn with_params(sample_rate: u32, root_hz: f32, gain: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            root_hz,
            gain: gain.clamp(0.0, 1.0),
            phases: [0.0; 3],
            lfo_phase: 0.0,
        }
    }

    fn advance(phase: &mut f32, hz: f32, sample_rate: f32) {
        *phase += hz / sample_rate;
        if *phase >= 1.0 {
            *phase -= phase.floor();
        }
    }
}

impl Signal for AmbientTone {
    fn next_sample(&mut self) -> Option<f32> {
        let sr = self.sample_rate as f32;

        let mut mix = 0.0;
        for (i, phase) in self.phases.iter_mut().enumerate() {
            mix += Self::WEIGHTS[i] * (2.0 * PI * *phase).sin();
            Self::advance(phase, self.root_hz * Self::RATIOS[i], sr);
        }

        // Swell between 40% and 100% of the gain
        let swell = 0.7 + 0.3 * (2.0 * PI * self.lfo_phase).sin();
        Self::advance(&mut self.lfo_phase, Self::LFO_HZ, sr);

        Some((mix * swell * self.gain).clamp(-1.0, 1.0))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        "ambient tone"
    }
}

/// Plays back a WAV file once, mixed down to mono
#[derive(Debug, Clone)]
pub struct WavSignal {
    name: String,
    samples: Vec<f32>,
    sample_rate: u32,
    position: usize,
}

impl WavSignal {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .context("Failed to decode float samples")?,
            SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .context("Failed to decode integer samples")?
            }
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wav".to_string());

        Ok(Self::from_samples(name, samples, spec.sample_rate))
    }

    pub fn from_samples(name: impl Into<String>, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            samples,
            sample_rate: sample_rate.max(1),
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl Signal for WavSignal {
    fn next_sample(&mut self) -> Option<f32> {
        let sample = self.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample.clamp(-1.0, 1.0))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_tone_stays_within_gain() {
        let mut tone = AmbientTone::new(48000);
        for _ in 0..48000 {
            let sample = tone.next_sample().unwrap();
            assert!(sample.abs() <= AmbientTone::DEFAULT_GAIN + 1e-6);
        }
    }

    #[test]
    fn test_ambient_tone_is_deterministic() {
        let mut a = AmbientTone::with_params(44100, 110.0, 0.2);
        let mut b = AmbientTone::with_params(44100, 110.0, 0.2);
        for _ in 0..1000 {
            assert_eq!(a.next_sample(), b.next_sample());
        }
    }

    #[test]
    fn test_ambient_tone_is_not_silent() {
        let mut tone = AmbientTone::new(48000);
        let peak = (0..4800)
            .filter_map(|_| tone.next_sample())
            .fold(0.0_f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.01, "peak was {}", peak);
    }

    #[test]
    fn test_wav_signal_exhausts() {
        let mut signal = WavSignal::from_samples("clip", vec![0.1, 2.0], 8000);
        assert_eq!(signal.remaining(), 2);
        assert_eq!(signal.next_sample(), Some(0.1));
        assert_eq!(signal.next_sample(), Some(1.0));
        assert_eq!(signal.next_sample(), None);
        assert_eq!(signal.name(), "clip");
    }

    #[test]
    fn test_wav_signal_reads_file_as_mono() {
        let path = std::env::temp_dir().join(format!("ambiscope-signal-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut signal = WavSignal::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(signal.sample_rate(), 16000);
        assert_eq!(signal.remaining(), 4);
        let first = signal.next_sample().unwrap();
        assert!((first - 0.5).abs() < 0.001, "got {}", first);
    }
}
