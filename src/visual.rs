//! Rendering: turns one sampled buffer into draw commands
//!
//! Everything in here is pure. The frame loop lives in `visualizer` and the
//! pixel backend in `raster`.

pub mod bars;
pub mod colors;
pub mod command;
mod config;
mod mode;
pub mod waveform;

pub use command::{DrawCommand, Glow, GradientStop, LinearGradient, Paint, Point};
pub use config::{CanvasSize, RenderConfig};
pub use mode::VisualizationMode;

/// Render one frame for the given mode
pub fn render(buffer: &[u8], mode: VisualizationMode, config: &RenderConfig) -> Vec<DrawCommand> {
    match mode {
        VisualizationMode::Bars => bars::render_bars(buffer, config),
        VisualizationMode::Waveform => waveform::render_waveform(buffer, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dispatches_on_mode() {
        let config = RenderConfig::default();
        let buffer = [128u8; 32];

        let bar_frame = render(&buffer, VisualizationMode::Bars, &config);
        assert!(bar_frame.iter().any(|c| matches!(c, DrawCommand::FillRect { .. })));
        assert!(!bar_frame.iter().any(|c| matches!(c, DrawCommand::Polyline { .. })));

        let wave_frame = render(&buffer, VisualizationMode::Waveform, &config);
        assert!(wave_frame.iter().any(|c| matches!(c, DrawCommand::Polyline { .. })));
    }

    #[test]
    fn test_render_is_pure() {
        let config = RenderConfig::for_canvas(CanvasSize::Expanded);
        let buffer: Vec<u8> = (0..256).map(|i| (i % 256) as u8).collect();
        assert_eq!(
            render(&buffer, VisualizationMode::Waveform, &config),
            render(&buffer, VisualizationMode::Waveform, &config)
        );
    }
}
