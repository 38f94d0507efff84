//! SVG bar charts for panel comparisons and binding profiles.
use crate::compare::PanelEntry;
use crate::scan::ScanPoint;
use std::path::Path;
use svg::node::element::{Element, Line, Rectangle};
use svg::{Document, Node};

pub const CHART_TITLE: &str = "TF Binding Prediction";
/// Predictions are log(x + 1) scaled and fall in this range in practice.
pub const Y_RANGE: (f32, f32) = (0.0, 7.0);

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const MAX_X_LABELS: usize = 12;
const BAR_FILL: &str = "#636efa";

#[derive(Debug, Clone)]
struct Bar {
    label: String,
    /// `None` keeps the slot but draws nothing.
    value: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct BarChart {
    title: String,
    x_label: String,
    y_label: String,
    y_range: (f32, f32),
    bars: Vec<Bar>,
}

impl BarChart {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            x_label: String::new(),
            y_label: String::new(),
            y_range: Y_RANGE,
            bars: Vec::new(),
        }
    }

    pub fn x_label(mut self, label: &str) -> Self {
        self.x_label = label.to_string();
        self
    }

    pub fn y_label(mut self, label: &str) -> Self {
        self.y_label = label.to_string();
        self
    }

    /// Reversed bounds are swapped; non-finite bounds leave the range unchanged.
    pub fn y_range(mut self, min: f32, max: f32) -> Self {
        if min.is_finite() && max.is_finite() {
            self.y_range = (min.min(max), min.max(max));
        }
        self
    }

    pub fn bar(mut self, label: impl Into<String>, value: Option<f32>) -> Self {
        self.bars.push(Bar {
            label: label.into(),
            value,
        });
        self
    }

    /// One bar per TF; failed entries leave an empty slot.
    pub fn panel(entries: &[PanelEntry]) -> Self {
        entries.iter().fold(
            Self::new(CHART_TITLE).x_label("TF").y_label("Prediction"),
            |chart, entry| chart.bar(entry.tf.as_str(), entry.prediction()),
        )
    }

    pub fn profile(points: &[ScanPoint]) -> Self {
        points.iter().fold(
            Self::new(CHART_TITLE)
                .x_label("Position to Promoter (bp)")
                .y_label("Predicted Binding, log (x + 1) scaled"),
            |chart, p| chart.bar(p.relative_position.to_string(), Some(p.prediction)),
        )
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    fn y_to_px(&self, value: f32) -> f64 {
        let (lo, hi) = self.y_range;
        let frac = ((value.clamp(lo, hi) - lo) / (hi - lo).max(f32::EPSILON)) as f64;
        HEIGHT - MARGIN_BOTTOM - frac * (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM)
    }

    pub fn to_document(&self) -> Document {
        let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let baseline = HEIGHT - MARGIN_BOTTOM;
        let mut doc = Document::new()
            .set("width", WIDTH)
            .set("height", HEIGHT)
            .set("viewBox", (0, 0, WIDTH as i32, HEIGHT as i32))
            .add(
                Rectangle::new()
                    .set("width", WIDTH)
                    .set("height", HEIGHT)
                    .set("fill", "white"),
            )
            .add(text(WIDTH / 2.0, MARGIN_TOP / 2.0 + 6.0, &self.title, "middle", 18));

        // y axis with one tick per unit
        let (lo, hi) = self.y_range;
        let mut tick = lo.ceil();
        while tick <= hi {
            let y = self.y_to_px(tick);
            doc = doc
                .add(
                    Line::new()
                        .set("x1", MARGIN_LEFT)
                        .set("x2", WIDTH - MARGIN_RIGHT)
                        .set("y1", y)
                        .set("y2", y)
                        .set("stroke", "#e5ecf6"),
                )
                .add(text(MARGIN_LEFT - 8.0, y + 4.0, &format!("{tick}"), "end", 11));
            tick += 1.0;
        }
        doc = doc.add(
            Line::new()
                .set("x1", MARGIN_LEFT)
                .set("x2", WIDTH - MARGIN_RIGHT)
                .set("y1", baseline)
                .set("y2", baseline)
                .set("stroke", "black"),
        );

        if !self.bars.is_empty() {
            let slot = plot_width / self.bars.len() as f64;
            let label_every = self.bars.len().div_ceil(MAX_X_LABELS);
            for (i, bar) in self.bars.iter().enumerate() {
                let x = MARGIN_LEFT + i as f64 * slot;
                if let Some(value) = bar.value {
                    let top = self.y_to_px(value);
                    doc = doc.add(
                        Rectangle::new()
                            .set("x", x + slot * 0.1)
                            .set("y", top)
                            .set("width", slot * 0.8)
                            .set("height", baseline - top)
                            .set("fill", BAR_FILL),
                    );
                }
                if i % label_every == 0 {
                    let label = text(x + slot / 2.0, baseline + 16.0, &bar.label, "middle", 11);
                    doc = doc.add(label);
                }
            }
        }

        let mut y_title = text(20.0, HEIGHT / 2.0, &self.y_label, "middle", 13);
        y_title.assign("transform", format!("rotate(-90 20 {})", HEIGHT / 2.0));
        doc.add(text(
            MARGIN_LEFT + plot_width / 2.0,
            HEIGHT - 20.0,
            &self.x_label,
            "middle",
            13,
        ))
        .add(y_title)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        svg::save(path, &self.to_document())
    }
}

fn text(x: f64, y: f64, content: &str, anchor: &str, size: u32) -> Element {
    let mut el = Element::new("text");
    el.assign("x", x);
    el.assign("y", y);
    el.assign("text-anchor", anchor);
    el.assign("font-family", "sans-serif");
    el.assign("font-size", size);
    el.append(svg::node::Text::new(content));
    el
}
