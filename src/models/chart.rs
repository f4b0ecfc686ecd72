//! Chart geometry and drawing command models

/// A position on the canvas, in pixels from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Colour with channels in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// Space reserved around the plot for labels and title
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Horizontal anchoring of a text command relative to its position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Center,
}

/// One immutable drawing primitive.
///
/// A rendered chart is a `Vec<DrawCommand>` replayed in order; it always
/// starts with a [`DrawCommand::Clear`] of the whole canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
        color: Rgba,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        width: f64,
    },
    Polyline {
        points: Vec<Point>,
        color: Rgba,
        width: f64,
    },
    /// Filled circle
    Circle {
        center: Point,
        radius: f64,
        color: Rgba,
    },
    Text {
        at: Point,
        text: String,
        size: f64,
        color: Rgba,
        /// Clockwise, in degrees
        rotation: f64,
        anchor: TextAnchor,
    },
}

/// Pixel mapping for one render call.
///
/// X is by sample index (evenly spaced), Y is by rate over the padded range,
/// larger rates higher up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
    pub plot_width: f64,
    pub plot_height: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    /// Margin added above the maximum and below the minimum
    pub rate_padding: f64,
    pub point_count: usize,
}

impl ChartGeometry {
    /// Top of the Y scale
    pub fn scale_max(&self) -> f64 {
        self.max_rate + self.rate_padding
    }

    /// Bottom of the Y scale
    pub fn scale_min(&self) -> f64 {
        self.min_rate - self.rate_padding
    }

    pub fn scale_span(&self) -> f64 {
        self.scale_max() - self.scale_min()
    }

    pub fn plot_bottom(&self) -> f64 {
        self.height - self.padding.bottom
    }

    pub fn plot_right(&self) -> f64 {
        self.width - self.padding.right
    }

    pub fn x_for_index(&self, index: usize) -> f64 {
        let steps = self.point_count.saturating_sub(1).max(1) as f64;
        self.padding.left + index as f64 * self.plot_width / steps
    }

    pub fn y_for_rate(&self, rate: f64) -> f64 {
        self.padding.top + (self.scale_max() - rate) * self.plot_height / self.scale_span()
    }
}
