//! Mode controller: owns the active visualization mode

use crate::audio::Analyser;
use crate::visual::VisualizationMode;

/// Two-state machine, bars <-> waveform.
///
/// Changing mode reconfigures the analyser right away. Since the frame loop
/// is single threaded, a toggle between frames is always seen by the next
/// frame and never by one already in flight.
#[derive(Debug, Default)]
pub struct ModeController {
    mode: VisualizationMode,
}

impl ModeController {
    pub fn new(mode: VisualizationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> VisualizationMode {
        self.mode
    }

    pub fn toggle(&mut self, analyser: &mut Analyser) -> VisualizationMode {
        self.set(self.mode.toggled(), analyser);
        self.mode
    }

    pub fn set(&mut self, mode: VisualizationMode, analyser: &mut Analyser) {
        if mode != self.mode {
            log::info!("Visualization mode: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        analyser.configure(mode);
    }
}
