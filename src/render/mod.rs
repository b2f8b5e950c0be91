// src/render/mod.rs

pub mod colormap;
pub mod projection;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};
use tracing::{debug, warn};

use crate::config::{Config, ProjectionParams};
use crate::extract::CaseTable;
use crate::scale::LogScale;
use crate::shapes::ShapeRecord;
use projection::LambertConformal;

/// Samples taken along each edge of the geodetic extent when fitting the
/// projected viewport; the projected rectangle has curved edges.
const EXTENT_EDGE_SAMPLES: u32 = 64;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unusable canvas geometry {width}x{height}")]
    Canvas { width: u32, height: u32 },
    #[error("viewport extent collapses to a point")]
    DegenerateExtent,
    #[error("encoding PNG: {message}")]
    Encode { message: String },
    #[error("writing {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rendering knobs, split out of `Config` so the renderer can be driven
/// directly in tests.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub metric_column: String,
    pub extent: [f64; 4],
    pub projection: ProjectionParams,
    pub figure_size_in: [f64; 2],
    pub dpi: f64,
    pub pad_inches: f64,
    pub line_width_pt: f64,
}

impl RenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            metric_column: config.metric_column.clone(),
            extent: config.extent,
            projection: config.projection.clone(),
            figure_size_in: config.figure_size_in,
            dpi: config.dpi,
            pad_inches: config.pad_inches,
            line_width_pt: config.line_width_pt,
        }
    }
}

/// Finished map plus the region names that had no table row.
#[derive(Debug)]
pub struct RenderReport {
    pub pixmap: Pixmap,
    pub misses: Vec<String>,
}

/// Projected-meters → screen-pixels mapping for one render pass.
struct Viewport {
    min_x: f64,
    min_y: f64,
    scale: f64,
    off_x: f64,
    off_y: f64,
    height_px: f64,
}

impl Viewport {
    /// Fit the projected extent into the canvas, preserving aspect and
    /// honoring the padding margin on all sides.
    fn fit(
        proj: &LambertConformal,
        extent: [f64; 4],
        width_px: f64,
        height_px: f64,
        pad_px: f64,
    ) -> Result<Self, RenderError> {
        let lon_min = extent[0].min(extent[1]);
        let lon_max = extent[0].max(extent[1]);
        let lat_min = extent[2].min(extent[3]);
        let lat_max = extent[2].max(extent[3]);

        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for step in 0..=EXTENT_EDGE_SAMPLES {
            let t = f64::from(step) / f64::from(EXTENT_EDGE_SAMPLES);
            let lon = lon_min + (lon_max - lon_min) * t;
            let lat = lat_min + (lat_max - lat_min) * t;
            for (x, y) in [
                proj.project(lon, lat_min),
                proj.project(lon, lat_max),
                proj.project(lon_min, lat),
                proj.project(lon_max, lat),
            ] {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        let span_x = max_x - min_x;
        let span_y = max_y - min_y;
        let content_w = width_px - 2.0 * pad_px;
        let content_h = height_px - 2.0 * pad_px;
        if !(span_x > 0.0 && span_y > 0.0) {
            return Err(RenderError::DegenerateExtent);
        }
        if !(content_w > 0.0 && content_h > 0.0) {
            return Err(RenderError::Canvas {
                width: width_px as u32,
                height: height_px as u32,
            });
        }

        let scale = (content_w / span_x).min(content_h / span_y);
        Ok(Self {
            min_x,
            min_y,
            scale,
            off_x: (width_px - span_x * scale) / 2.0,
            off_y: (height_px - span_y * scale) / 2.0,
            height_px,
        })
    }

    /// Screen pixels, y flipped so north is up.
    fn to_pixel(&self, (x, y): (f64, f64)) -> (f32, f32) {
        let px = (x - self.min_x) * self.scale + self.off_x;
        let py = self.height_px - ((y - self.min_y) * self.scale + self.off_y);
        (px as f32, py as f32)
    }
}

/// Paint every shape whose name has a table row; report the rest as misses.
/// A miss never aborts the render.
pub fn render_choropleth(
    table: &CaseTable,
    scale: &LogScale,
    shapes: &[ShapeRecord],
    opts: &RenderOptions,
) -> Result<RenderReport, RenderError> {
    let width = (opts.figure_size_in[0] * opts.dpi).round() as u32;
    let height = (opts.figure_size_in[1] * opts.dpi).round() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Canvas { width, height })?;
    pixmap.fill(Color::from_rgba8(255, 255, 255, 255));

    let proj = LambertConformal::new(&opts.projection);
    let viewport = Viewport::fit(
        &proj,
        opts.extent,
        f64::from(width),
        f64::from(height),
        opts.pad_inches * opts.dpi,
    )?;

    let mut fill = Paint::default();
    fill.anti_alias = true;
    let mut edge = Paint::default();
    edge.set_color_rgba8(0, 0, 0, 255);
    edge.anti_alias = true;
    let stroke = Stroke {
        width: (opts.line_width_pt / 72.0 * opts.dpi) as f32,
        ..Stroke::default()
    };

    let mut misses = Vec::new();
    for shape in shapes {
        let Some(value) = table.metric(&shape.name, &opts.metric_column) else {
            warn!(name = %shape.name, "no table row for shape");
            misses.push(shape.name.clone());
            continue;
        };

        let Some(path) = shape_path(shape, &proj, &viewport) else {
            debug!(name = %shape.name, "shape has no drawable ring");
            continue;
        };

        let color = colormap::sample(scale.intensity(value));
        fill.set_color_rgba8(color.r, color.g, color.b, 255);
        pixmap.fill_path(&path, &fill, FillRule::EvenOdd, Transform::identity(), None);
        pixmap.stroke_path(&path, &edge, &stroke, Transform::identity(), None);
    }

    Ok(RenderReport { pixmap, misses })
}

/// All rings of one shape as a single path; even-odd fill keeps the holes.
fn shape_path(
    shape: &ShapeRecord,
    proj: &LambertConformal,
    viewport: &Viewport,
) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for ring in &shape.rings {
        let mut points = ring
            .iter()
            .map(|&(lon, lat)| viewport.to_pixel(proj.project(lon, lat)));
        let Some((x, y)) = points.next() else {
            continue;
        };
        pb.move_to(x, y);
        for (x, y) in points {
            pb.line_to(x, y);
        }
        pb.close();
    }
    pb.finish()
}

/// Write the composited figure once; any failure here is fatal.
pub fn save_png(pixmap: &Pixmap, path: &Path) -> Result<(), RenderError> {
    let bytes = pixmap.encode_png().map_err(|e| RenderError::Encode {
        message: e.to_string(),
    })?;
    fs::write(path, bytes).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}
