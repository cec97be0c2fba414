//! Draw commands issued by the renderers
//!
//! Renderers never touch a surface directly; they describe the frame as a
//! list of commands that a backend (see `raster`) replays in order.

use crate::visual::colors::Rgba;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    pub fn stop(mut self, offset: f32, color: Rgba) -> Self {
        self.stops.push(GradientStop {
            offset: offset.clamp(0.0, 1.0),
            color,
        });
        self
    }

    /// Color at `t` along the gradient, stops assumed sorted by offset
    pub fn color_at(&self, t: f32) -> Option<Rgba> {
        let first = self.stops.first()?;
        if t <= first.offset {
            return Some(first.color);
        }

        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                let local = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
                return Some(a.color.lerp(b.color, local));
            }
        }

        self.stops.last().map(|s| s.color)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Paint {
    Solid { color: Rgba },
    Gradient { gradient: LinearGradient },
}

impl Paint {
    pub fn solid(color: Rgba) -> Self {
        Paint::Solid { color }
    }

    pub fn gradient(gradient: LinearGradient) -> Self {
        Paint::Gradient { gradient }
    }
}

/// Soft halo drawn behind a shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Glow {
    pub color: Rgba,
    pub blur: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        color: Rgba,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        paint: Paint,
        glow: Option<Glow>,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        width: f32,
    },
    Polyline {
        points: Vec<Point>,
        paint: Paint,
        width: f32,
        opacity: f32,
        glow: Option<Glow>,
    },
    FillCircle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
}
