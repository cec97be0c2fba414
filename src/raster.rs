//! tiny-skia backend for draw commands

use crate::visual::colors::Rgba;
use crate::visual::{DrawCommand, Glow, Paint, Point, RenderConfig};
use crate::visualizer::Frame;
use anyhow::Context;
use std::path::Path;
use thiserror::Error;
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, PathBuilder, Pixmap, Rect, SpreadMode, Stroke, Transform,
};

/// Passes used to fake a blur
const GLOW_LAYERS: usize = 5;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Invalid canvas size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Allocate a canvas matching `config` and draw `commands` on it
pub fn render_commands(
    config: &RenderConfig,
    commands: &[DrawCommand],
) -> Result<Pixmap, RasterError> {
    let width = config.width.round().max(0.0) as u32;
    let height = config.height.round().max(0.0) as u32;
    let mut pixmap =
        Pixmap::new(width, height).ok_or(RasterError::InvalidSize { width, height })?;
    draw(&mut pixmap, commands);
    Ok(pixmap)
}

pub fn render_frame(frame: &Frame) -> Result<Pixmap, RasterError> {
    render_commands(&frame.config, &frame.commands)
}

pub fn save_png(pixmap: &Pixmap, path: &Path) -> anyhow::Result<()> {
    pixmap
        .save_png(path)
        .with_context(|| format!("Failed to write PNG: {}", path.display()))
}

/// Replay commands in order onto the pixmap
pub fn draw(pixmap: &mut Pixmap, commands: &[DrawCommand]) {
    for command in commands {
        match command {
            DrawCommand::Clear { color } => pixmap.fill(to_color(*color)),
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
                paint,
                glow,
            } => {
                if let Some(glow) = glow {
                    draw_rect_glow(pixmap, *x, *y, *width, *height, glow);
                }
                fill_rect(pixmap, *x, *y, *width, *height, paint);
            }
            DrawCommand::Line {
                from,
                to,
                color,
                width,
            } => {
                let paint = solid_paint(*color);
                stroke_points(pixmap, &[*from, *to], &paint, *width);
            }
            DrawCommand::Polyline {
                points,
                paint,
                width,
                opacity,
                glow,
            } => {
                if let Some(glow) = glow {
                    draw_line_glow(pixmap, points, *width, glow);
                }
                let paint = to_paint(paint, *opacity);
                stroke_points(pixmap, points, &paint, *width);
            }
            DrawCommand::FillCircle {
                center,
                radius,
                color,
            } => {
                let Some(circle) = PathBuilder::from_circle(center.x, center.y, *radius) else {
                    continue;
                };
                pixmap.fill_path(
                    &circle,
                    &solid_paint(*color),
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
    }
}

fn to_color(color: Rgba) -> Color {
    let [r, g, b, a] = color.to_rgba8();
    Color::from_rgba8(r, g, b, a)
}

fn solid_paint(color: Rgba) -> tiny_skia::Paint<'static> {
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(to_color(color));
    paint.anti_alias = true;
    paint
}

fn to_paint(paint: &Paint, opacity: f32) -> tiny_skia::Paint<'static> {
    let opacity = opacity.clamp(0.0, 1.0);
    match paint {
        Paint::Solid { color } => solid_paint(color.with_alpha(color.a * opacity)),
        Paint::Gradient { gradient } => {
            let stops = gradient
                .stops
                .iter()
                .map(|s| {
                    let color = s.color.with_alpha(s.color.a * opacity);
                    tiny_skia::GradientStop::new(s.offset, to_color(color))
                })
                .collect();

            let shader = tiny_skia::LinearGradient::new(
                tiny_skia::Point::from_xy(gradient.start.x, gradient.start.y),
                tiny_skia::Point::from_xy(gradient.end.x, gradient.end.y),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            );

            match shader {
                Some(shader) => {
                    let mut paint = tiny_skia::Paint::default();
                    paint.shader = shader;
                    paint.anti_alias = true;
                    paint
                }
                // Degenerate gradient (zero length or no stops): fall back to its first color
                None => {
                    let fallback = gradient
                        .stops
                        .first()
                        .map(|s| s.color)
                        .unwrap_or(Rgba::from_rgb8(0, 0, 0));
                    solid_paint(fallback.with_alpha(fallback.a * opacity))
                }
            }
        }
    }
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, width: f32, height: f32, paint: &Paint) {
    let Some(rect) = Rect::from_xywh(x, y, width, height) else {
        return;
    };
    pixmap.fill_rect(rect, &to_paint(paint, 1.0), Transform::identity(), None);
}

fn draw_rect_glow(pixmap: &mut Pixmap, x: f32, y: f32, width: f32, height: f32, glow: &Glow) {
    // Widest, faintest layer first
    for i in (1..=GLOW_LAYERS).rev() {
        let spread = glow.blur * i as f32 / GLOW_LAYERS as f32;
        let alpha = glow.color.a * 0.12 * (1.0 - i as f32 / (GLOW_LAYERS as f32 + 1.0));

        let Some(rect) = Rect::from_xywh(
            x - spread / 2.0,
            y - spread / 2.0,
            width + spread,
            height + spread,
        ) else {
            continue;
        };

        let paint = solid_paint(glow.color.with_alpha(alpha));
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

fn draw_line_glow(pixmap: &mut Pixmap, points: &[Point], width: f32, glow: &Glow) {
    for i in (1..=GLOW_LAYERS).rev() {
        let layer_width = width + glow.blur * i as f32 / GLOW_LAYERS as f32;
        let alpha = glow.color.a * 0.1 * (1.0 - i as f32 / (GLOW_LAYERS as f32 + 1.0));
        let paint = solid_paint(glow.color.with_alpha(alpha));
        stroke_points(pixmap, points, &paint, layer_width);
    }
}

fn stroke_points(pixmap: &mut Pixmap, points: &[Point], paint: &tiny_skia::Paint, width: f32) {
    let [first, rest @ ..] = points else {
        return;
    };
    if rest.is_empty() {
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, paint, &stroke, Transform::identity(), None);
}
