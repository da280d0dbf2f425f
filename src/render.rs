use std::path::PathBuf;

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::color::{Marker, StyleCycle};
use crate::data::normalize::SCALE_MAX;

pub const Y_TITLE: &str = "Normalized chi2";

// ---------------------------------------------------------------------------
// Chart request – everything a renderer needs for one figure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveStyle {
    /// Colour/marker rotation index.
    pub slot: usize,
    pub line: LineKind,
    pub markers: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotCurve {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub style: CurveStyle,
}

/// One figure: curves, x-axis title, optional x span, destination file.
/// The y axis is always `[0, 10]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub curves: Vec<PlotCurve>,
    pub x_title: String,
    pub x_limits: Option<(f64, f64)>,
    pub dest: PathBuf,
}

impl ChartRequest {
    /// X span: the configured limits, else the extent of all curves.
    pub fn x_span(&self) -> (f64, f64) {
        let (lo, hi) = self.x_limits.unwrap_or_else(|| {
            self.curves
                .iter()
                .flat_map(|c| c.x.iter().copied())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                })
        });
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        if lo == hi {
            (lo - 0.5, hi + 0.5)
        } else {
            (lo, hi)
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer seam
// ---------------------------------------------------------------------------

/// Turns one [`ChartRequest`] into one figure file.
pub trait ChartRenderer {
    fn render(&self, request: &ChartRequest) -> Result<()>;

    /// File extension of the figures this renderer writes.
    fn extension(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Renders with `plotters` to PNG or SVG.
pub struct PlottersRenderer {
    pub format: ImageFormat,
    pub size: (u32, u32),
    styles: StyleCycle,
}

impl PlottersRenderer {
    pub fn new(format: ImageFormat) -> Self {
        Self {
            format,
            size: (900, 700),
            styles: StyleCycle::default(),
        }
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, request: &ChartRequest) -> Result<()> {
        let dest = &request.dest;
        let drawn = match self.format {
            ImageFormat::Png => {
                let root = BitMapBackend::new(dest, self.size).into_drawing_area();
                draw_chart(&root, request, &self.styles)
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(dest, self.size).into_drawing_area();
                draw_chart(&root, request, &self.styles)
            }
        };
        drawn.with_context(|| format!("rendering {}", dest.display()))?;

        log::info!("Saved {}", dest.display());
        Ok(())
    }

    fn extension(&self) -> &str {
        self.format.extension()
    }
}

// Marker outlines in pixel offsets; y grows downwards.
const TRIANGLE_UP: [(i32, i32); 3] = [(0, -5), (5, 4), (-5, 4)];
const TRIANGLE_DOWN: [(i32, i32); 3] = [(0, 5), (5, -4), (-5, -4)];
const DIAMOND: [(i32, i32); 4] = [(0, -5), (5, 0), (0, 5), (-5, 0)];
const PLUS: [(i32, i32); 12] = [
    (-1, -4),
    (1, -4),
    (1, -1),
    (4, -1),
    (4, 1),
    (1, 1),
    (1, 4),
    (-1, 4),
    (-1, 1),
    (-4, 1),
    (-4, -1),
    (-1, -1),
];
const STAR: [(i32, i32); 10] = [
    (0, -6),
    (1, -2),
    (6, -2),
    (2, 1),
    (4, 5),
    (0, 2),
    (-4, 5),
    (-2, 1),
    (-6, -2),
    (-1, -2),
];

/// Outline that returns to its first point.
fn closed(points: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut path = points.to_vec();
    path.extend(points.first().copied());
    path
}

fn draw_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    request: &ChartRequest,
    styles: &StyleCycle,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (x_lo, x_hi) = request.x_span();
    let mut chart = ChartBuilder::on(root)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_lo..x_hi, 0.0..SCALE_MAX)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(request.x_title.as_str())
        .y_desc(Y_TITLE)
        .draw()?;

    for curve in &request.curves {
        let color = styles.color(curve.style.slot);
        let line_style = color.stroke_width(2);
        let points: Vec<(f64, f64)> =
            curve.x.iter().copied().zip(curve.y.iter().copied()).collect();

        let mut series = match curve.style.line {
            LineKind::Solid => chart.draw_series(LineSeries::new(points.clone(), line_style))?,
            LineKind::Dashed => {
                chart.draw_series(DashedLineSeries::new(points.clone(), 10, 6, line_style))?
            }
        };
        series.label(curve.label.as_str()).legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
        });

        if curve.style.markers {
            let marker = styles.marker(curve.style.slot);
            let shape = if marker.is_filled() {
                color.filled()
            } else {
                color.stroke_width(1)
            };
            let at = points.iter().map(|&p| EmptyElement::at(p));
            match marker {
                Marker::FilledCircle | Marker::OpenCircle => {
                    chart.draw_series(at.map(|e| e + Circle::new((0, 0), 4, shape)))?;
                }
                Marker::FilledSquare | Marker::OpenSquare => {
                    chart.draw_series(at.map(|e| e + Rectangle::new([(-4, -4), (4, 4)], shape)))?;
                }
                Marker::FilledTriangleUp => {
                    chart.draw_series(at.map(|e| e + Polygon::new(TRIANGLE_UP.to_vec(), shape)))?;
                }
                Marker::OpenTriangleUp => {
                    let path = closed(&TRIANGLE_UP);
                    chart.draw_series(at.map(|e| e + PathElement::new(path.clone(), shape)))?;
                }
                Marker::FilledTriangleDown => {
                    chart.draw_series(at.map(|e| e + Polygon::new(TRIANGLE_DOWN.to_vec(), shape)))?;
                }
                Marker::OpenDiamond => {
                    let path = closed(&DIAMOND);
                    chart.draw_series(at.map(|e| e + PathElement::new(path.clone(), shape)))?;
                }
                Marker::OpenCross => {
                    let path = closed(&PLUS);
                    chart.draw_series(at.map(|e| e + PathElement::new(path.clone(), shape)))?;
                }
                Marker::FilledStar => {
                    chart.draw_series(at.map(|e| e + Polygon::new(STAR.to_vec(), shape)))?;
                }
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Records requests instead of drawing them.
    #[derive(Default)]
    pub struct RecordingRenderer {
        pub requests: RefCell<Vec<ChartRequest>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, request: &ChartRequest) -> Result<()> {
            self.requests.borrow_mut().push(request.clone());
            Ok(())
        }

        fn extension(&self) -> &str {
            "png"
        }
    }
}
