//! Spectrum bars
//!
//! The frequency bins are split into `bar_count` contiguous groups of
//! `floor(len / bar_count)` bins. Bins past the last full group are never
//! read. Each group's mean is amplified, clamped to 255 and mapped onto
//! 0..=90% of the canvas height.

use crate::visual::colors::{self, Rgba};
use crate::visual::command::{DrawCommand, Glow, LinearGradient, Paint, Point};
use crate::visual::config::RenderConfig;

const GLOW_BLUR: f32 = 10.0;
const CAP_HEIGHT: f32 = 2.0;
const BAR_GAP: f32 = 1.0;

/// Amplified, clamped level per bar (0..=255)
pub fn bar_levels(bins: &[u8], config: &RenderConfig) -> Vec<f32> {
    let bar_count = config.bar_count.max(1);
    let group_size = bins.len() / bar_count;

    (0..bar_count)
        .map(|i| {
            if group_size == 0 {
                return 0.0;
            }
            let group = &bins[i * group_size..(i + 1) * group_size];
            let sum: u32 = group.iter().map(|&b| b as u32).sum();
            let mean = sum as f32 / group_size as f32;
            (mean * config.amplification).min(255.0)
        })
        .collect()
}

/// Bar heights in pixels, each in [0, max_bar_height]
pub fn bar_heights(bins: &[u8], config: &RenderConfig) -> Vec<f32> {
    bar_levels(bins, config)
        .into_iter()
        .map(|level| level_to_height(level, config))
        .collect()
}

fn level_to_height(level: f32, config: &RenderConfig) -> f32 {
    level / 255.0 * config.height * config.max_bar_ratio
}

/// Green for the lowest bar through to red for the highest
pub fn bar_hue(index: usize, bar_count: usize) -> f32 {
    if bar_count <= 1 {
        return 120.0;
    }
    120.0 * (1.0 - index as f32 / (bar_count - 1) as f32)
}

/// Louder bars are drawn slightly lighter
fn bar_lightness(level: f32) -> f32 {
    40.0 + 20.0 * (level / 255.0)
}

pub fn render_bars(bins: &[u8], config: &RenderConfig) -> Vec<DrawCommand> {
    let bar_count = config.bar_count.max(1);
    let slot = config.width / bar_count as f32;
    let gap = if slot > 2.0 * BAR_GAP { BAR_GAP } else { 0.0 };
    let bar_width = slot - gap;

    let mut commands = vec![DrawCommand::Clear {
        color: colors::BACKGROUND,
    }];

    for (i, level) in bar_levels(bins, config).into_iter().enumerate() {
        let height = level_to_height(level, config);
        if height <= 0.0 {
            continue;
        }

        let hue = bar_hue(i, bar_count);
        let lightness = bar_lightness(level);
        let x = i as f32 * slot + gap / 2.0;
        let top = config.height - height;

        let body = LinearGradient::new(Point::new(x, config.height), Point::new(x, top))
            .stop(0.0, Rgba::from_hsl(hue, 100.0, lightness - 15.0))
            .stop(1.0, Rgba::from_hsl(hue, 100.0, lightness + 10.0));

        commands.push(DrawCommand::FillRect {
            x,
            y: top,
            width: bar_width,
            height,
            paint: Paint::gradient(body),
            glow: Some(Glow {
                color: Rgba::from_hsl(hue, 100.0, lightness),
                blur: GLOW_BLUR,
            }),
        });

        commands.push(DrawCommand::FillRect {
            x,
            y: top,
            width: bar_width,
            height: height.min(CAP_HEIGHT),
            paint: Paint::solid(Rgba::from_hsl(hue, 100.0, (lightness + 25.0).min(90.0))),
            glow: None,
        });
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::config::CanvasSize;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_sixteen_heights_within_range() {
        let config = RenderConfig::for_canvas(CanvasSize::Compact);
        let bins: Vec<u8> = (0..32).map(|i| (i * 8) as u8).collect();
        let heights = bar_heights(&bins, &config);

        assert_eq!(heights.len(), 16);
        for h in heights {
            assert!((0.0..=config.max_bar_height()).contains(&h), "height {}", h);
        }
    }

    #[test]
    fn test_all_zero_bins() {
        let config = RenderConfig::for_canvas(CanvasSize::Compact);
        let heights = bar_heights(&[0; 32], &config);
        assert!(heights.iter().all(|&h| h == 0.0));

        // Only the background is drawn
        assert_eq!(render_bars(&[0; 32], &config).len(), 1);
    }

    #[test]
    fn test_all_max_bins_clamp_at_ninety_percent() {
        let config = RenderConfig::for_canvas(CanvasSize::Expanded);
        let heights = bar_heights(&[255; 32], &config);
        assert!(heights.iter().all(|&h| approx(h, 72.0)));
    }

    #[test]
    fn test_compact_canvas_third_level_fills_bar() {
        // 85 * 3 = 255, so every bar reaches 0.9 * 40
        let config = RenderConfig::for_canvas(CanvasSize::Compact);
        let heights = bar_heights(&[85; 32], &config);
        assert_eq!(heights.len(), 16);
        assert!(heights.iter().all(|&h| approx(h, 36.0)), "{:?}", heights);
    }

    #[test]
    fn test_group_means_are_amplified() {
        let config = RenderConfig::new(160.0, 100.0);
        let mut bins = vec![0u8; 32];
        bins[0] = 10;
        bins[1] = 20;

        let levels = bar_levels(&bins, &config);
        assert!(approx(levels[0], 45.0));
        assert!(levels[1..].iter().all(|&l| l == 0.0));
    }

    #[test]
    fn test_remainder_bins_are_ignored() {
        let config = RenderConfig::default();
        let mut bins = vec![0u8; 35];
        bins[32..].fill(255);

        assert!(bar_heights(&bins, &config).iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_short_buffer_renders_flat() {
        let config = RenderConfig::default();
        let heights = bar_heights(&[200; 8], &config);
        assert_eq!(heights, vec![0.0; 16]);
    }

    #[test]
    fn test_heights_monotonic_in_level() {
        let config = RenderConfig::default();
        let heights: Vec<f32> = (0..=255u8)
            .map(|v| bar_heights(&[v; 32], &config)[0])
            .collect();
        assert!(heights.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_hue_runs_green_to_red() {
        assert_eq!(bar_hue(0, 16), 120.0);
        assert_eq!(bar_hue(15, 16), 0.0);
        assert!(bar_hue(8, 16) < bar_hue(7, 16));
    }

    #[test]
    fn test_bar_commands_have_glow_and_cap() {
        let config = RenderConfig::default();
        let commands = render_bars(&[85; 32], &config);

        // background + (body, cap) per bar
        assert_eq!(commands.len(), 1 + 16 * 2);
        match &commands[1] {
            DrawCommand::FillRect { glow, height, .. } => {
                assert_eq!(glow.map(|g| g.blur), Some(10.0));
                assert!(approx(*height, 36.0));
            }
            other => panic!("unexpected command {:?}", other),
        }
        match &commands[2] {
            DrawCommand::FillRect { height, glow, .. } => {
                assert_eq!(*height, 2.0);
                assert!(glow.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
