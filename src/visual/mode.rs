//! Visualization modes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationMode {
    /// 16-bar frequency spectrum
    #[default]
    Bars,
    /// Time-domain trace
    Waveform,
}

impl VisualizationMode {
    /// Analysis window used while this mode is active
    pub fn fft_size(&self) -> usize {
        match self {
            VisualizationMode::Bars => 64,
            VisualizationMode::Waveform => 256,
        }
    }

    /// Length of the buffer sampled each frame in this mode
    pub fn buffer_len(&self) -> usize {
        match self {
            VisualizationMode::Bars => self.fft_size() / 2,
            VisualizationMode::Waveform => self.fft_size(),
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            VisualizationMode::Bars => VisualizationMode::Waveform,
            VisualizationMode::Waveform => VisualizationMode::Bars,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationMode::Bars => "bars",
            VisualizationMode::Waveform => "waveform",
        }
    }
}

impl std::fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
