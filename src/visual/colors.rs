//! Colors used by the renderers

use serde::Serialize;

/// Straight (non-premultiplied) RGBA, each channel in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Hue in degrees, saturation and lightness in percent
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = (saturation / 100.0).clamp(0.0, 1.0);
        let l = (lightness / 100.0).clamp(0.0, 1.0);

        if s == 0.0 {
            return Self { r: l, g: l, b: l, a: 1.0 };
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Self {
            r: hue_to_channel(p, q, h + 1.0 / 3.0),
            g: hue_to_channel(p, q, h),
            b: hue_to_channel(p, q, h - 1.0 / 3.0),
            a: 1.0,
        }
    }

    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

pub const BACKGROUND: Rgba = Rgba::from_rgb8(10, 10, 15);
pub const GRID: Rgba = Rgba::from_rgb8(0, 255, 65).with_alpha(0.08);
pub const CENTER_LINE: Rgba = Rgba::from_rgb8(0, 255, 65).with_alpha(0.25);

// Waveform trace gradient, left to right
pub const TRACE_GREEN: Rgba = Rgba::from_rgb8(0, 255, 65);
pub const TRACE_PURPLE: Rgba = Rgba::from_rgb8(168, 85, 247);
pub const TRACE_RED: Rgba = Rgba::from_rgb8(255, 56, 96);
