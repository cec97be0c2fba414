//! Frequency and time-domain analyser
//!
//! Reads the most recent window of samples from a [`SignalTap`] and exposes
//! them as byte snapshots, following the Web Audio analyser conventions:
//! - Blackman window before the FFT
//! - Exponential smoothing of magnitudes between successive reads
//! - Magnitudes mapped from [-100 dB, -30 dB] onto [0, 255]
//! - Time-domain bytes centred on 128

use crate::audio::{SampleBuffer, SignalTap};
use crate::visual::VisualizationMode;
use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use thiserror::Error;

/// Smoothing constant applied in every mode
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;

pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyserError {
    #[error("Analyser is not connected to a signal")]
    NotConnected,
}

/// Result of attaching a tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Attached,
    AlreadyAttached,
}

pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    window: Vec<f32>,
    fft_planner: FftPlanner<f32>,
    prev_magnitudes: Vec<f32>,
    tap: Option<SignalTap>,
}

impl Analyser {
    pub fn new(mode: VisualizationMode) -> Self {
        let fft_size = mode.fft_size();
        Self {
            fft_size,
            smoothing: SMOOTHING_TIME_CONSTANT,
            window: blackman_window(fft_size),
            fft_planner: FftPlanner::new(),
            prev_magnitudes: vec![0.0; fft_size / 2],
            tap: None,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn is_connected(&self) -> bool {
        self.tap.is_some()
    }

    /// Apply the window size for `mode`. Re-applying the current mode is a no-op.
    pub fn configure(&mut self, mode: VisualizationMode) {
        self.smoothing = SMOOTHING_TIME_CONSTANT;

        let fft_size = mode.fft_size();
        if fft_size == self.fft_size {
            return;
        }

        log::debug!("Analyser window {} -> {} ({})", self.fft_size, fft_size, mode);
        self.fft_size = fft_size;
        self.window = blackman_window(fft_size);
        self.prev_magnitudes = vec![0.0; fft_size / 2];
    }

    /// Attach the analysis tap. A second attach of the same tap is accepted
    /// as already satisfied; a different tap replaces the old one.
    pub fn connect(&mut self, tap: &SignalTap) -> Connection {
        if let Some(current) = &self.tap {
            if current.same_ring(tap) {
                log::trace!("Analyser already attached, ignoring reconnect");
                return Connection::AlreadyAttached;
            }
        }

        log::debug!("Analyser attached to signal tap");
        self.tap = Some(tap.clone());
        self.prev_magnitudes.fill(0.0);
        Connection::Attached
    }

    pub fn disconnect(&mut self) {
        if self.tap.take().is_some() {
            log::debug!("Analyser detached from signal tap");
        }
    }

    /// Magnitude per frequency bin, `fft_size / 2` bytes
    pub fn sample_frequency(&mut self) -> Result<SampleBuffer, AnalyserError> {
        let tap = self.tap.as_ref().ok_or(AnalyserError::NotConnected)?;
        let samples = tap.snapshot(self.fft_size);

        let mut spectrum: Vec<Complex<f32>> = samples
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        let fft = self.fft_planner.plan_fft_forward(self.fft_size);
        fft.process(&mut spectrum);

        let scale = 1.0 / self.fft_size as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;

        let bytes = spectrum
            .iter()
            .take(self.fft_size / 2)
            .zip(self.prev_magnitudes.iter_mut())
            .map(|(bin, prev)| {
                let magnitude = bin.norm() * scale;
                let smoothed = self.smoothing * *prev + (1.0 - self.smoothing) * magnitude;
                // Keep the history finite so a NaN sample can't stick around
                *prev = if smoothed.is_finite() { smoothed } else { 0.0 };

                let db = linear_to_decibels(*prev);
                let scaled = 255.0 * (db - MIN_DECIBELS) / range;
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect::<Vec<u8>>();

        Ok(SampleBuffer::from(bytes))
    }

    /// Raw amplitudes for the window, `fft_size` bytes with 128 as zero
    pub fn sample_amplitude(&self) -> Result<SampleBuffer, AnalyserError> {
        let tap = self.tap.as_ref().ok_or(AnalyserError::NotConnected)?;
        let bytes = tap
            .snapshot(self.fft_size)
            .into_iter()
            .map(amplitude_to_byte)
            .collect::<Vec<u8>>();

        Ok(SampleBuffer::from(bytes))
    }
}

/// Map a sample in [-1, 1] onto a byte with 128 as the zero line
pub fn amplitude_to_byte(sample: f32) -> u8 {
    let scaled = (128.0 * (1.0 + sample)).floor();
    if scaled.is_nan() {
        return 128;
    }
    scaled.clamp(0.0, 255.0) as u8
}

fn linear_to_decibels(linear: f32) -> f32 {
    if linear <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * linear.log10()
}

/// Blackman window (alpha = 0.16)
fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;

    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}
