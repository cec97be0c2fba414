//! Sound engine: plays a signal and feeds the analysis tap
//!
//! One engine per session, created and owned by whoever drives the
//! visualizer. Nothing here is global; dropping the engine stops playback.

use crate::audio::{Signal, SignalTap};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Frames per output callback the scratch buffer holds without growing
const MONO_SCRATCH_LEN: usize = 8192;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No default output device found")]
    NoOutputDevice,
    #[error("Engine is already running")]
    AlreadyRunning,
    #[error("Unsupported output sample format: {0}")]
    UnsupportedFormat(SampleFormat),
    #[error("Failed to query output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("Failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("Failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("Failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),
}

#[derive(Debug)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

enum Output {
    Device(cpal::Stream),
    Offline,
}

pub struct SoundEngine {
    signal: Arc<Mutex<Box<dyn Signal>>>,
    signal_name: String,
    sample_rate: u32,
    tap: SignalTap,
    muted: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    output: Option<Output>,
    session: u64,
}

impl SoundEngine {
    pub fn new(signal: Box<dyn Signal>) -> Self {
        Self {
            signal_name: signal.name().to_string(),
            sample_rate: signal.sample_rate(),
            signal: Arc::new(Mutex::new(signal)),
            tap: SignalTap::new(),
            muted: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
            failed: Arc::new(AtomicBool::new(false)),
            output: None,
            session: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn signal_name(&self) -> &str {
        &self.signal_name
    }

    /// Bumped on every successful start, so a restart is visible to readers
    /// that never saw the engine stopped
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Sample rate of the default output device, used to build a matching tone
    pub fn default_output_sample_rate() -> Result<u32, EngineError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        Ok(device.default_output_config()?.sample_rate().0)
    }

    /// Start playing through the default output device
    pub fn start_device(&mut self) -> Result<(), EngineError> {
        if self.output.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        if config.sample_rate.0 != self.sample_rate {
            log::warn!(
                "Signal '{}' is {} Hz but the device runs at {} Hz; playback pitch will shift",
                self.signal_name,
                self.sample_rate,
                config.sample_rate.0
            );
        }

        self.reset_flags();

        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&device, &config)?,
            SampleFormat::I16 => self.build_stream::<i16>(&device, &config)?,
            SampleFormat::U16 => self.build_stream::<u16>(&device, &config)?,
            other => return Err(EngineError::UnsupportedFormat(other)),
        };
        stream.play()?;

        log::info!(
            "Playing '{}' on {} ({} Hz, {} ch)",
            self.signal_name,
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            config.sample_rate.0,
            config.channels
        );
        self.output = Some(Output::Device(stream));
        self.session += 1;
        Ok(())
    }

    /// Start without a device; samples are produced by [`SoundEngine::pump`]
    pub fn start_offline(&mut self) -> Result<(), EngineError> {
        if self.output.is_some() {
            return Err(EngineError::AlreadyRunning);
        }
        self.reset_flags();
        log::info!("Rendering '{}' offline at {} Hz", self.signal_name, self.sample_rate);
        self.output = Some(Output::Offline);
        self.session += 1;
        Ok(())
    }

    /// Stop playback and release the tap contents
    pub fn stop(&mut self) {
        if let Some(output) = self.output.take() {
            if let Output::Device(stream) = output {
                if let Err(e) = stream.pause() {
                    log::debug!("Pausing stream on stop failed: {}", e);
                }
            }
            self.tap.clear();
            log::info!("Stopped '{}'", self.signal_name);
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Started, audible and still producing samples
    pub fn is_active(&self) -> bool {
        self.output.is_some()
            && !self.is_muted()
            && !self.exhausted.load(Ordering::Acquire)
            && !self.failed.load(Ordering::Acquire)
    }

    /// The analysis tap, available only while the engine runs
    pub fn tap(&self) -> Option<&SignalTap> {
        self.output.as_ref().map(|_| &self.tap)
    }

    /// Produce up to `n` samples into the tap when running offline.
    ///
    /// Returns how many samples were produced; device-driven engines and
    /// stopped engines produce nothing here.
    pub fn pump(&self, n: usize) -> usize {
        if !matches!(self.output, Some(Output::Offline)) {
            return 0;
        }

        let mut signal = self.signal.lock().unwrap_or_else(|p| p.into_inner());
        let muted = self.is_muted();
        let mut produced = Vec::with_capacity(n);
        for _ in 0..n {
            match signal.next_sample() {
                Some(sample) => produced.push(if muted { 0.0 } else { sample }),
                None => {
                    self.exhausted.store(true, Ordering::Release);
                    break;
                }
            }
        }
        self.tap.push(&produced);
        produced.len()
    }

    fn reset_flags(&self) {
        self.exhausted.store(false, Ordering::Release);
        self.failed.store(false, Ordering::Release);
    }

    fn build_stream<T>(
        &self,
        device: &cpal::Device,
        config: &StreamConfig,
    ) -> Result<cpal::Stream, EngineError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = config.channels.max(1) as usize;
        let signal = self.signal.clone();
        let tap = self.tap.clone();
        let muted = self.muted.clone();
        let exhausted = self.exhausted.clone();
        let failed = self.failed.clone();
        // Scratch for the tap, reused across callbacks
        let mut mono: Vec<f32> = Vec::with_capacity(MONO_SCRATCH_LEN);

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mono.clear();
                let mut signal = signal.lock().unwrap_or_else(|p| p.into_inner());
                let silent = muted.load(Ordering::Acquire);

                for frame in data.chunks_mut(channels) {
                    let sample = if exhausted.load(Ordering::Relaxed) {
                        0.0
                    } else {
                        signal.next_sample().unwrap_or_else(|| {
                            exhausted.store(true, Ordering::Release);
                            0.0
                        })
                    };
                    let out = if silent { 0.0 } else { sample };
                    mono.push(out);
                    for channel in frame.iter_mut() {
                        *channel = T::from_sample(out);
                    }
                }

                tap.push(&mono);
            },
            move |err| {
                log::error!("Output stream error: {}", err);
                failed.store(true, Ordering::Release);
            },
            None,
        )?;

        Ok(stream)
    }

    pub fn list_output_devices() -> Result<Vec<OutputDeviceInfo>, EngineError> {
        let host = cpal::default_host();
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let mut infos = Vec::new();
        for device in host.output_devices()? {
            let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
            let config = device.default_output_config().ok();
            infos.push(OutputDeviceInfo {
                is_default: default_name.as_deref() == Some(name.as_str()),
                sample_rate: config.as_ref().map(|c| c.sample_rate().0),
                channels: config.as_ref().map(|c| c.channels()),
                name,
            });
        }

        Ok(infos)
    }
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
