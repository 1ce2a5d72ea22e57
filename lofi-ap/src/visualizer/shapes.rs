//! Vector output of the visualizer
//!
//! Each style turns one frequency snapshot into a list of shapes in pixel
//! coordinates (origin top-left, y down). Silence (every bin zero) renders an
//! idle pattern so a frame is never empty.

use std::f32::consts::PI;

use serde::Serialize;

/// Drawing surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shape {
    /// Filled rectangle
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        alpha: f32,
    },
    /// Stroked path, optionally closed and filled
    Path {
        points: Vec<(f32, f32)>,
        closed: bool,
        line_width: f32,
        stroke_alpha: f32,
        fill_alpha: Option<f32>,
    },
}

/// Magnitude drawn for every bin of a silent bar or circle frame
const IDLE_MAGNITUDE: f32 = 2.0;

pub fn is_silence(data: &[u8]) -> bool {
    data.iter().all(|&v| v == 0)
}

/// Mirrored bars growing up from the bottom edge
pub fn bars(data: &[u8], viewport: Viewport, sensitivity: f32, opacity: f32) -> Vec<Shape> {
    let silent = is_silence(data);
    let (cx, _) = viewport.center();
    let h = viewport.height;
    let bar_width = (viewport.width / data.len().max(1) as f32) * 2.5;

    let mut shapes = Vec::with_capacity(data.len() * 2 + 1);
    let mut offset = 0.0;
    for &v in data {
        let value = if silent { IDLE_MAGNITUDE } else { v as f32 };
        let bar_height = (value / 255.0) * (h * 0.4) * sensitivity;
        let alpha = (0.3 + value / 512.0) * opacity;
        let y = h - bar_height;

        shapes.push(Shape::Rect {
            x: cx + offset,
            y,
            width: bar_width,
            height: bar_height,
            alpha,
        });
        shapes.push(Shape::Rect {
            x: cx - offset - bar_width,
            y,
            width: bar_width,
            height: bar_height,
            alpha,
        });
        offset += bar_width + 1.0;
    }

    if silent {
        shapes.push(Shape::Rect {
            x: 0.0,
            y: h - 2.0,
            width: viewport.width,
            height: 2.0,
            alpha: 0.5 * opacity,
        });
    }
    shapes
}

/// Symmetric line through the lower two thirds of the spectrum
///
/// The path runs from the highest visible bin at the left edge to the
/// center, then back out to the right edge.
pub fn wave(data: &[u8], viewport: Viewport, sensitivity: f32, opacity: f32, time_ms: f64) -> Vec<Shape> {
    const STEP: usize = 2;
    let silent = is_silence(data);
    let (cx, cy) = viewport.center();
    let visible = data.len() as f32 / 1.5;
    let x_step = (viewport.width / 2.0) / (visible / STEP as f32).max(1.0);
    let last = (visible.floor() as usize).min(data.len().saturating_sub(1));

    let point = |i: usize, side: f32| {
        let v = if silent { 0.0 } else { data[i] as f32 / 255.0 };
        let y_offset = v * (viewport.height / 3.0) * sensitivity;
        let idle = if silent {
            ((i as f64 * 0.1 + time_ms * 0.002).sin() * 5.0) as f32
        } else {
            0.0
        };
        let x = cx + side * (i / STEP) as f32 * x_step;
        let y = cy + if i % 4 < 2 { y_offset } else { -y_offset } + idle;
        (x, y)
    };

    let mut points = Vec::new();
    if !data.is_empty() {
        let mut i = last as isize;
        while i >= 0 {
            points.push(point(i as usize, -1.0));
            i -= STEP as isize;
        }
        let mut i = 0;
        while (i as f32) < visible {
            points.push(point(i, 1.0));
            i += STEP;
        }
    }

    vec![Shape::Path {
        points,
        closed: false,
        line_width: 3.0,
        stroke_alpha: opacity,
        fill_alpha: None,
    }]
}

/// Closed radial outline mirrored about the vertical axis
///
/// The base radius breathes with the average magnitude; each bin pushes its
/// point outward. The top ten bins are left out.
pub fn circle(data: &[u8], viewport: Viewport, sensitivity: f32, opacity: f32, scale: f32) -> Vec<Shape> {
    let silent = is_silence(data);
    let (cx, cy) = viewport.center();

    let avg = if data.is_empty() {
        0.0
    } else {
        data.iter().map(|&v| v as f32).sum::<f32>() / data.len() as f32
    };
    let breathing = (avg / 255.0) * 20.0 * sensitivity;
    let base = (viewport.height * 0.15).max(135.0) * scale + breathing;

    let len = data.len().saturating_sub(10).max(2);
    let radius = |i: usize| {
        let amp = if silent {
            IDLE_MAGNITUDE
        } else {
            data.get(i).copied().unwrap_or(0) as f32
        };
        base + (amp / 255.0) * 60.0 * sensitivity
    };
    let angle = |i: usize| PI * i as f32 / (len - 1) as f32;

    let mut points = Vec::with_capacity(len * 2);
    for i in 0..len {
        let r = radius(i);
        points.push((cx + r * angle(i).sin(), cy + r * angle(i).cos()));
    }
    for i in (0..len).rev() {
        let r = radius(i);
        points.push((cx - r * angle(i).sin(), cy + r * angle(i).cos()));
    }

    vec![Shape::Path {
        points,
        closed: true,
        line_width: 3.0,
        stroke_alpha: opacity,
        fill_alpha: Some(0.1 * opacity),
    }]
}
