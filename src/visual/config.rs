//! Per-frame render parameters

use serde::{Deserialize, Serialize};

/// The two canvas sizes the visualizer switches between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasSize {
    #[default]
    Compact,
    Expanded,
}

impl CanvasSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            CanvasSize::Compact => (120, 40),
            CanvasSize::Expanded => (200, 80),
        }
    }

    pub fn from_expanded(expanded: bool) -> Self {
        if expanded {
            CanvasSize::Expanded
        } else {
            CanvasSize::Compact
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            CanvasSize::Compact => CanvasSize::Expanded,
            CanvasSize::Expanded => CanvasSize::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub bar_count: usize,
    /// Gain applied to both renderers to make up for the quiet source
    pub amplification: f32,
    /// Tallest bar as a fraction of the canvas height
    pub max_bar_ratio: f32,
}

impl RenderConfig {
    pub const BAR_COUNT: usize = 16;
    pub const AMPLIFICATION: f32 = 3.0;
    pub const MAX_BAR_RATIO: f32 = 0.9;

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            bar_count: Self::BAR_COUNT,
            amplification: Self::AMPLIFICATION,
            max_bar_ratio: Self::MAX_BAR_RATIO,
        }
    }

    pub fn for_canvas(size: CanvasSize) -> Self {
        let (width, height) = size.dimensions();
        Self::new(width as f32, height as f32)
    }

    pub fn max_bar_height(&self) -> f32 {
        self.height * self.max_bar_ratio
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::for_canvas(CanvasSize::default())
    }
}
