//! Time-domain trace

use crate::visual::colors::{self, TRACE_GREEN, TRACE_PURPLE, TRACE_RED};
use crate::visual::command::{DrawCommand, Glow, LinearGradient, Paint, Point};
use crate::visual::config::RenderConfig;

const LINE_WIDTH: f32 = 1.5;
const HALO_WIDTH: f32 = 3.0;
const HALO_OPACITY: f32 = 0.35;
const HALO_BLUR: f32 = 8.0;
const MARKER_STRIDE: usize = 8;
const MARKER_THRESHOLD: f32 = 0.1;
const MARKER_RADIUS: f32 = 1.5;

/// Byte sample to a signed value in [-1, 1] after amplification
pub fn amplified_value(sample: u8, amplification: f32) -> f32 {
    let unit = sample as f32 / 128.0 - 1.0;
    (unit * amplification).clamp(-1.0, 1.0)
}

/// One point per sample; byte 128 lands exactly on the vertical centre
pub fn waveform_points(samples: &[u8], config: &RenderConfig) -> Vec<Point> {
    if samples.is_empty() {
        return Vec::new();
    }

    let step = config.width / samples.len() as f32;
    let half = config.height / 2.0;

    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let v = amplified_value(s, config.amplification);
            Point::new(i as f32 * step, half - v * half)
        })
        .collect()
}

/// Every 8th point whose amplified magnitude is above the marker threshold
pub fn peak_markers(samples: &[u8], config: &RenderConfig) -> Vec<Point> {
    waveform_points(samples, config)
        .into_iter()
        .zip(samples.iter())
        .enumerate()
        .filter(|(i, (_, s))| {
            i % MARKER_STRIDE == 0
                && amplified_value(**s, config.amplification).abs() > MARKER_THRESHOLD
        })
        .map(|(_, (point, _))| point)
        .collect()
}

fn trace_gradient(config: &RenderConfig) -> LinearGradient {
    let mid = config.height / 2.0;
    LinearGradient::new(Point::new(0.0, mid), Point::new(config.width, mid))
        .stop(0.0, TRACE_GREEN)
        .stop(0.5, TRACE_PURPLE)
        .stop(1.0, TRACE_RED)
}

fn grid(config: &RenderConfig) -> Vec<DrawCommand> {
    let (w, h) = (config.width, config.height);
    let mut lines = Vec::new();

    for k in [1.0, 3.0] {
        let y = h * k / 4.0;
        lines.push(DrawCommand::Line {
            from: Point::new(0.0, y),
            to: Point::new(w, y),
            color: colors::GRID,
            width: 1.0,
        });
    }

    for k in 1..8 {
        let x = w * k as f32 / 8.0;
        lines.push(DrawCommand::Line {
            from: Point::new(x, 0.0),
            to: Point::new(x, h),
            color: colors::GRID,
            width: 1.0,
        });
    }

    lines.push(DrawCommand::Line {
        from: Point::new(0.0, h / 2.0),
        to: Point::new(w, h / 2.0),
        color: colors::CENTER_LINE,
        width: 1.0,
    });

    lines
}

pub fn render_waveform(samples: &[u8], config: &RenderConfig) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Clear {
        color: colors::BACKGROUND,
    }];
    commands.extend(grid(config));

    let points = waveform_points(samples, config);
    if points.is_empty() {
        return commands;
    }

    let gradient = trace_gradient(config);

    commands.push(DrawCommand::Polyline {
        points: points.clone(),
        paint: Paint::gradient(gradient.clone()),
        width: LINE_WIDTH,
        opacity: 1.0,
        glow: None,
    });
    commands.push(DrawCommand::Polyline {
        points,
        paint: Paint::gradient(gradient.clone()),
        width: HALO_WIDTH,
        opacity: HALO_OPACITY,
        glow: Some(Glow {
            color: TRACE_PURPLE,
            blur: HALO_BLUR,
        }),
    });

    for point in peak_markers(samples, config) {
        let t = if config.width > 0.0 { point.x / config.width } else { 0.0 };
        commands.push(DrawCommand::FillCircle {
            center: point,
            radius: MARKER_RADIUS,
            color: gradient.color_at(t).unwrap_or(TRACE_GREEN),
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::config::CanvasSize;

    fn circles(commands: &[DrawCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillCircle { .. }))
            .count()
    }

    #[test]
    fn test_amplified_values() {
        assert_eq!(amplified_value(128, 3.0), 0.0);
        assert_eq!(amplified_value(192, 3.0), 1.0);
        assert_eq!(amplified_value(64, 3.0), -1.0);
        assert_eq!(amplified_value(0, 3.0), -1.0);
        assert_eq!(amplified_value(255, 3.0), 1.0);
    }

    #[test]
    fn test_expanded_canvas_scenario() {
        let config = RenderConfig::for_canvas(CanvasSize::Expanded);
        let points = waveform_points(&[128, 192, 128, 64], &config);

        let ys: Vec<f32> = points.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![40.0, 0.0, 40.0, 80.0]);

        let xs: Vec<f32> = points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 50.0, 100.0, 150.0]);
    }

    #[test]
    fn test_zero_crossing_is_mid_height() {
        let config = RenderConfig::for_canvas(CanvasSize::Compact);
        let points = waveform_points(&[128], &config);
        assert_eq!(points[0].y, config.height / 2.0);
    }

    #[test]
    fn test_points_stay_on_canvas() {
        let config = RenderConfig::for_canvas(CanvasSize::Compact);
        let samples: Vec<u8> = (0..256).map(|i| i as u8).collect();
        let points = waveform_points(&samples, &config);

        assert_eq!(points.len(), 256);
        for p in &points {
            assert!((0.0..=config.height).contains(&p.y), "y = {}", p.y);
            assert!((0.0..config.width).contains(&p.x), "x = {}", p.x);
        }
    }

    #[test]
    fn test_silence_is_flat_without_markers() {
        let config = RenderConfig::for_canvas(CanvasSize::Expanded);
        let samples = [128u8; 256];

        let points = waveform_points(&samples, &config);
        assert!(points.iter().all(|p| p.y == 40.0));
        assert!(peak_markers(&samples, &config).is_empty());
        assert_eq!(circles(&render_waveform(&samples, &config)), 0);
    }

    #[test]
    fn test_markers_every_eighth_sample() {
        let config = RenderConfig::for_canvas(CanvasSize::Expanded);
        let samples = [192u8; 32];

        let markers = peak_markers(&samples, &config);
        assert_eq!(markers.len(), 4);
        assert_eq!(markers[1].x, 8.0 * 200.0 / 32.0);
    }

    #[test]
    fn test_small_deflection_has_no_marker() {
        // 132 -> (132/128 - 1) * 3 = 0.09375, under the threshold
        let config = RenderConfig::default();
        assert!(peak_markers(&[132u8; 16], &config).is_empty());
        assert_eq!(peak_markers(&[134u8; 16], &config).len(), 2);
    }

    #[test]
    fn test_trace_drawn_twice() {
        let config = RenderConfig::default();
        let commands = render_waveform(&[128; 64], &config);
        let traces: Vec<f32> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { opacity, points, .. } => {
                    assert_eq!(points.len(), 64);
                    Some(*opacity)
                }
                _ => None,
            })
            .collect();
        assert_eq!(traces, vec![1.0, HALO_OPACITY]);
    }

    #[test]
    fn test_empty_buffer_draws_background_only() {
        let config = RenderConfig::default();
        let commands = render_waveform(&[], &config);
        assert!(commands.iter().all(|c| !matches!(c, DrawCommand::Polyline { .. })));
    }
}
