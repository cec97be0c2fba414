//! Frame loop owner
//!
//! Holds the analyser, the mode controller and the canvas size, and drives
//! one sample → render pass per display frame for as long as the engine's
//! signal stays active.

use crate::audio::{Analyser, SampleBuffer, SoundEngine};
use crate::controller::ModeController;
use crate::visual::{self, CanvasSize, DrawCommand, RenderConfig, VisualizationMode};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Handle to the next scheduled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle {
    pub due: Instant,
}

/// Schedules frames at a fixed rate; at most one frame is pending at a time
#[derive(Debug)]
pub struct FrameClock {
    interval: Duration,
    paced: bool,
    next: Option<FrameHandle>,
    frames: u64,
}

impl FrameClock {
    pub fn new(fps: u32, paced: bool) -> Self {
        let fps = fps.max(1);
        Self {
            interval: Duration::from_secs(1) / fps,
            paced,
            next: None,
            frames: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedule the frame after `previous`, or right away when there is none.
    /// Requesting while a frame is already pending keeps the pending one.
    pub fn request(&mut self, previous: Option<Instant>) -> FrameHandle {
        if let Some(pending) = self.next {
            return pending;
        }

        let now = Instant::now();
        let due = match previous {
            // Resync instead of bursting after a stall
            Some(prev) if prev + self.interval >= now => prev + self.interval,
            _ => now,
        };

        let handle = FrameHandle { due };
        self.next = Some(handle);
        handle
    }

    /// Release the pending frame so it can never fire. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.next.take().is_some()
    }

    pub fn is_scheduled(&self) -> bool {
        self.next.is_some()
    }

    /// Block until the pending frame is due and fire it
    pub fn wait(&mut self) -> Option<FrameHandle> {
        let handle = self.next.take()?;
        if self.paced {
            let now = Instant::now();
            if handle.due > now {
                std::thread::sleep(handle.due - now);
            }
        }
        Some(handle)
    }

    /// Frames completed in the current loop
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn advance(&mut self) -> u64 {
        let index = self.frames;
        self.frames += 1;
        index
    }

    fn reset(&mut self) {
        self.next = None;
        self.frames = 0;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub index: u64,
    pub mode: VisualizationMode,
    pub canvas: CanvasSize,
    pub config: RenderConfig,
    pub buffer: SampleBuffer,
    pub commands: Vec<DrawCommand>,
}

pub struct Visualizer {
    analyser: Analyser,
    controller: ModeController,
    canvas: CanvasSize,
    clock: FrameClock,
    running: bool,
    session: u64,
}

impl Visualizer {
    pub fn new(mode: VisualizationMode, canvas: CanvasSize, clock: FrameClock) -> Self {
        Self {
            analyser: Analyser::new(mode),
            controller: ModeController::new(mode),
            canvas,
            clock,
            running: false,
            session: 0,
        }
    }

    pub fn mode(&self) -> VisualizationMode {
        self.controller.mode()
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Switch between bars and waveform; the next frame uses the new window
    pub fn toggle_mode(&mut self) -> VisualizationMode {
        self.controller.toggle(&mut self.analyser)
    }

    pub fn set_mode(&mut self, mode: VisualizationMode) {
        self.controller.set(mode, &mut self.analyser);
    }

    pub fn set_canvas(&mut self, canvas: CanvasSize) {
        if canvas != self.canvas {
            log::debug!("Canvas {:?} -> {:?}", self.canvas, canvas);
        }
        self.canvas = canvas;
    }

    pub fn toggle_expanded(&mut self) -> CanvasSize {
        self.set_canvas(self.canvas.toggled());
        self.canvas
    }

    /// Sample and render a single frame.
    ///
    /// Returns `None` and stops the loop when the signal is inactive. The next
    /// successful frame after that, or the first one after the engine was
    /// restarted, starts a fresh loop at index zero.
    pub fn frame(&mut self, engine: &SoundEngine) -> Option<Frame> {
        let tap = match engine.tap() {
            Some(tap) if engine.is_active() => tap,
            _ => {
                self.halt();
                return None;
            }
        };

        if self.running && self.session != engine.session() {
            log::debug!("Engine restarted, dropping frame loop state");
            self.halt();
        }

        if !self.running {
            log::debug!("Starting frame loop ({})", self.mode());
            self.clock.reset();
            self.running = true;
            self.session = engine.session();
        }

        self.analyser.connect(tap);

        let mode = self.controller.mode();
        let sampled = match mode {
            VisualizationMode::Bars => self.analyser.sample_frequency(),
            VisualizationMode::Waveform => self.analyser.sample_amplitude(),
        };
        let buffer = match sampled {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("Sampling failed: {}", e);
                self.halt();
                return None;
            }
        };

        let config = RenderConfig::for_canvas(self.canvas);
        let commands = visual::render(&buffer, mode, &config);
        let index = self.clock.advance();
        log::trace!("Frame {} ({}, {} commands)", index, mode, commands.len());

        Some(Frame {
            index,
            mode,
            canvas: self.canvas,
            config,
            buffer,
            commands,
        })
    }

    /// Stop requesting frames and detach from the signal
    pub fn halt(&mut self) {
        let released = self.clock.cancel();
        self.analyser.disconnect();
        if self.running {
            log::info!(
                "Frame loop stopped after {} frames{}",
                self.clock.frames(),
                if released { " (pending frame released)" } else { "" }
            );
        }
        self.running = false;
    }

    /// Run frames back to back until the signal goes inactive, `max_frames`
    /// is reached or `on_frame` returns false.
    ///
    /// Offline engines are pumped with one frame's worth of samples before
    /// each frame. The loop is always halted on return, so a later call
    /// starts again at frame zero. Returns the number of frames rendered.
    pub fn run<F>(&mut self, engine: &SoundEngine, max_frames: Option<u64>, mut on_frame: F) -> u64
    where
        F: FnMut(&mut Visualizer, Frame) -> bool,
    {
        let fps = (1.0 / self.clock.interval().as_secs_f64()).round();
        let samples_per_frame = (engine.sample_rate() as f64 / fps.max(1.0)).round() as usize;
        let mut rendered = 0;

        self.clock.request(None);
        while let Some(handle) = self.clock.wait() {
            engine.pump(samples_per_frame);

            let Some(frame) = self.frame(engine) else {
                break;
            };
            rendered += 1;

            let keep_going = on_frame(self, frame) && max_frames.is_none_or(|max| rendered < max);
            if !keep_going {
                break;
            }
            self.clock.request(Some(handle.due));
        }

        self.halt();
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AmbientTone, WavSignal};

    fn offline_engine() -> SoundEngine {
        let mut engine = SoundEngine::new(Box::new(AmbientTone::new(48000)));
        engine.start_offline().unwrap();
        engine
    }

    fn visualizer() -> Visualizer {
        Visualizer::new(
            VisualizationMode::Bars,
            CanvasSize::Compact,
            FrameClock::new(60, false),
        )
    }

    #[test]
    fn test_frame_buffer_follows_mode() {
        let engine = offline_engine();
        engine.pump(1024);
        let mut vis = visualizer();

        let frame = vis.frame(&engine).unwrap();
        assert_eq!(frame.index, 0);
        assert_eq!(frame.buffer.len(), 32);

        vis.toggle_mode();
        let frame = vis.frame(&engine).unwrap();
        assert_eq!(frame.index, 1);
        assert_eq!(frame.mode, VisualizationMode::Waveform);
        assert_eq!(frame.buffer.len(), 256);

        vis.toggle_mode();
        assert_eq!(vis.analyser().fft_size(), 64);
    }

    #[test]
    fn test_inactive_signal_yields_no_frame() {
        let engine = SoundEngine::new(Box::new(AmbientTone::new(48000)));
        let mut vis = visualizer();

        assert!(vis.frame(&engine).is_none());
        assert!(!vis.is_running());
        assert!(!vis.analyser().is_connected());
    }

    #[test]
    fn test_mute_releases_pending_frame() {
        let engine = offline_engine();
        let mut vis = visualizer();
        assert!(vis.frame(&engine).is_some());

        vis.clock.request(None);
        assert!(vis.clock().is_scheduled());

        engine.set_muted(true);
        assert!(vis.frame(&engine).is_none());
        assert!(!vis.clock().is_scheduled());
    }

    #[test]
    fn test_reconnect_restarts_at_frame_zero() {
        let engine = offline_engine();
        let mut vis = visualizer();
        vis.frame(&engine);
        vis.frame(&engine);

        engine.set_muted(true);
        assert!(vis.frame(&engine).is_none());

        engine.set_muted(false);
        assert_eq!(vis.frame(&engine).map(|f| f.index), Some(0));
    }

    #[test]
    fn test_engine_restart_between_frames_starts_fresh() {
        let mut engine = offline_engine();
        engine.pump(1024);
        let mut vis = visualizer();
        vis.frame(&engine);
        vis.frame(&engine);

        engine.stop();
        engine.start_offline().unwrap();
        engine.pump(1024);

        let restarted = vis.frame(&engine).unwrap();
        assert_eq!(restarted.index, 0);

        // No smoothing history carried over from before the stop
        let mut fresh = visualizer();
        let first = fresh.frame(&engine).unwrap();
        assert_eq!(restarted.buffer, first.buffer);
    }

    #[test]
    fn test_second_run_starts_at_frame_zero() {
        let engine = offline_engine();
        let mut vis = visualizer();

        assert_eq!(vis.run(&engine, Some(3), |_, _| true), 3);
        assert!(!vis.is_running());
        assert!(!vis.analyser().is_connected());

        let mut indices = Vec::new();
        vis.run(&engine, None, |_, frame| {
            indices.push(frame.index);
            indices.len() < 2
        });
        assert_eq!(indices, vec![0, 1]);
        assert!(!vis.is_running());
    }

    #[test]
    fn test_canvas_change_applies_next_frame() {
        let engine = offline_engine();
        let mut vis = visualizer();

        assert_eq!(vis.frame(&engine).unwrap().config.height, 40.0);
        assert_eq!(vis.toggle_expanded(), CanvasSize::Expanded);
        let frame = vis.frame(&engine).unwrap();
        assert_eq!((frame.config.width, frame.config.height), (200.0, 80.0));
    }

    #[test]
    fn test_run_respects_frame_budget() {
        let engine = offline_engine();
        let mut vis = visualizer();

        let mut indices = Vec::new();
        let rendered = vis.run(&engine, Some(5), |_, frame| {
            indices.push(frame.index);
            true
        });

        assert_eq!(rendered, 5);
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(!vis.clock().is_scheduled());
    }

    #[test]
    fn test_run_stops_when_signal_ends() {
        // 2000 samples at 48 kHz / 60 fps = 800 per frame: two full frames, then a partial
        let clip = WavSignal::from_samples("clip", vec![0.2; 2000], 48000);
        let mut engine = SoundEngine::new(Box::new(clip));
        engine.start_offline().unwrap();
        let mut vis = visualizer();

        let rendered = vis.run(&engine, None, |_, _| true);
        assert_eq!(rendered, 2);
        assert!(!vis.is_running());
        assert!(!vis.clock().is_scheduled());
    }

    #[test]
    fn test_toggle_inside_run_takes_effect_next_frame() {
        let engine = offline_engine();
        let mut vis = visualizer();

        let mut modes = Vec::new();
        vis.run(&engine, Some(3), |vis, frame| {
            modes.push((frame.mode, frame.buffer.len()));
            if frame.index == 0 {
                vis.toggle_mode();
            }
            true
        });

        assert_eq!(
            modes,
            vec![
                (VisualizationMode::Bars, 32),
                (VisualizationMode::Waveform, 256),
                (VisualizationMode::Waveform, 256),
            ]
        );
    }

    #[test]
    fn test_clock_keeps_single_pending_frame() {
        let mut clock = FrameClock::new(60, false);
        let first = clock.request(None);
        let second = clock.request(None);
        assert_eq!(first, second);

        assert!(clock.cancel());
        assert!(!clock.cancel());
        assert!(clock.wait().is_none());
    }
}
