//! Built-in artifact families and their capture backends.
//!
//! Three families ship by default: 2-D charts, rendered tables (polars
//! frames), and 3-D scenes. Each backend treats the actual encoding as an
//! opaque render step; charts and scenes rasterize through the `image`
//! crate, tables snapshot through CSV.

use std::any::Any;
use std::collections::BTreeMap;
use std::io::Cursor;

use figrev_model::{DataItem, FigrevError, ImageFormat, Result};
use image::{Rgba, RgbaImage};
use polars::prelude::{CsvReadOptions, CsvWriter, DataFrame, SerReader, SerWriter};
use serde::{Deserialize, Serialize};

use crate::backend::{Artifact, CaptureBackend, RenderOptions, Rendered};

fn encode_png(img: RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| FigrevError::render(format!("png encode: {e}")))?;
    Ok(bytes.into_inner())
}

fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 255, 255, 255]))
}

fn plot_dot(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    for dy in -1..=1 {
        for dx in -1..=1 {
            let px = x + dx;
            let py = y + dy;
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Scale data coordinates into the pixel rectangle, with a fixed margin.
fn project(
    values: impl Iterator<Item = (f64, f64)>,
    width: u32,
    height: u32,
) -> Vec<(i64, i64)> {
    let points: Vec<(f64, f64)> = values.collect();
    if points.is_empty() {
        return Vec::new();
    }
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in &points {
        min_x = min_x.min(*x);
        max_x = max_x.max(*x);
        min_y = min_y.min(*y);
        max_y = max_y.max(*y);
    }
    let span_x = (max_x - min_x).max(f64::EPSILON);
    let span_y = (max_y - min_y).max(f64::EPSILON);
    let margin = 8.0;
    let usable_w = (width as f64 - 2.0 * margin).max(1.0);
    let usable_h = (height as f64 - 2.0 * margin).max(1.0);

    points
        .into_iter()
        .map(|(x, y)| {
            let px = margin + (x - min_x) / span_x * usable_w;
            // Flip y: data grows up, pixels grow down.
            let py = margin + (1.0 - (y - min_y) / span_y) * usable_h;
            (px as i64, py as i64)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// A 2-D chart: a point series with an optional title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub title: Option<String>,
    pub points: Vec<(f64, f64)>,
    /// RGBA series color.
    pub color: [u8; 4],
    /// False for a bare trace displayed outside any figure container.
    container: bool,
}

impl ChartArtifact {
    /// Chart living inside a figure container.
    pub fn figure(points: Vec<(f64, f64)>) -> Self {
        Self {
            title: None,
            points,
            color: [31, 119, 180, 255],
            container: true,
        }
    }

    /// Bare trace with no enclosing container object.
    pub fn bare(points: Vec<(f64, f64)>) -> Self {
        Self {
            container: false,
            ..Self::figure(points)
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn to_svg(&self, width: u32, height: u32) -> String {
        let mut body = String::new();
        for (x, y) in project(self.points.iter().copied(), width, height) {
            body.push_str(&format!(
                "<circle cx=\"{x}\" cy=\"{y}\" r=\"2\" fill=\"rgb({},{},{})\"/>",
                self.color[0], self.color[1], self.color[2]
            ));
        }
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\">{body}</svg>"
        )
    }
}

impl Artifact for ChartArtifact {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn has_parent_container(&self) -> bool {
        self.container
    }
}

/// Capture backend for [`ChartArtifact`].
#[derive(Debug)]
pub struct ChartBackend;

impl CaptureBackend for ChartBackend {
    fn name(&self) -> &'static str {
        "chart"
    }

    fn detect(&self, artifact: &dyn Artifact) -> bool {
        artifact.as_any().is::<ChartArtifact>()
    }

    fn render(
        &self,
        artifact: &dyn Artifact,
        formats: &[ImageFormat],
        options: &RenderOptions,
    ) -> Result<BTreeMap<ImageFormat, Rendered>> {
        let chart = downcast::<ChartArtifact>(artifact, self.name())?;
        let mut out = BTreeMap::new();
        for format in formats {
            match format {
                ImageFormat::Png => {
                    let mut img = blank_canvas(options.width, options.height);
                    let color = Rgba(chart.color);
                    for (x, y) in project(chart.points.iter().copied(), options.width, options.height)
                    {
                        plot_dot(&mut img, x, y, color);
                    }
                    out.insert(
                        ImageFormat::Png,
                        Rendered {
                            data: encode_png(img)?,
                            width: Some(options.width),
                            height: Some(options.height),
                        },
                    );
                }
                ImageFormat::Svg => {
                    out.insert(
                        ImageFormat::Svg,
                        Rendered {
                            data: chart.to_svg(options.width, options.height).into_bytes(),
                            width: Some(options.width),
                            height: Some(options.height),
                        },
                    );
                }
                ImageFormat::Html | ImageFormat::Snapshot => {}
            }
        }
        Ok(out)
    }

    fn title(&self, artifact: &dyn Artifact) -> Option<String> {
        artifact
            .as_any()
            .downcast_ref::<ChartArtifact>()
            .and_then(|chart| chart.title.clone())
    }

    fn snapshot(&self, artifact: &dyn Artifact) -> Result<Vec<u8>> {
        let chart = downcast::<ChartArtifact>(artifact, self.name())?;
        serde_json::to_vec(chart).map_err(|e| FigrevError::Serde(e.to_string()))
    }

    fn restore(&self, payload: &[u8]) -> Result<Box<dyn Artifact>> {
        let chart: ChartArtifact = serde_json::from_slice(payload)
            .map_err(|e| FigrevError::snapshot_restore(format!("chart payload: {e}")))?;
        Ok(Box::new(chart))
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// A rendered table backed by a polars frame.
#[derive(Debug, Clone)]
pub struct TableArtifact {
    pub name: String,
    pub frame: DataFrame,
}

impl TableArtifact {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

impl Artifact for TableArtifact {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Serialize a frame to CSV bytes.
pub fn frame_to_csv(frame: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut frame = frame.clone();
    CsvWriter::new(&mut buffer)
        .finish(&mut frame)
        .map_err(|e| FigrevError::Serde(format!("table csv: {e}")))?;
    Ok(buffer)
}

/// Capture backend for [`TableArtifact`].
#[derive(Debug)]
pub struct TableBackend;

impl CaptureBackend for TableBackend {
    fn name(&self) -> &'static str {
        "table"
    }

    fn detect(&self, artifact: &dyn Artifact) -> bool {
        artifact.as_any().is::<TableArtifact>()
    }

    fn render(
        &self,
        artifact: &dyn Artifact,
        formats: &[ImageFormat],
        options: &RenderOptions,
    ) -> Result<BTreeMap<ImageFormat, Rendered>> {
        let table = downcast::<TableArtifact>(artifact, self.name())?;
        let mut out = BTreeMap::new();
        if !formats.contains(&ImageFormat::Png) {
            return Ok(out);
        }

        // Draw a cell grid; content rendering is the viewer's concern.
        let mut img = blank_canvas(options.width, options.height);
        let (w, h) = (img.width(), img.height());
        let rows = table.frame.height() as u32 + 1;
        let cols = (table.frame.width() as u32).max(1);
        let grid = Rgba([180, 180, 180, 255]);
        for r in 0..=rows {
            let y = (r * h.saturating_sub(1) / rows).min(h - 1);
            for x in 0..w {
                img.put_pixel(x, y, grid);
            }
        }
        for c in 0..=cols {
            let x = (c * w.saturating_sub(1) / cols).min(w - 1);
            for y in 0..h {
                img.put_pixel(x, y, grid);
            }
        }
        out.insert(
            ImageFormat::Png,
            Rendered {
                data: encode_png(img)?,
                width: Some(w),
                height: Some(h),
            },
        );
        Ok(out)
    }

    fn title(&self, artifact: &dyn Artifact) -> Option<String> {
        artifact
            .as_any()
            .downcast_ref::<TableArtifact>()
            .filter(|table| !table.name.is_empty())
            .map(|table| table.name.clone())
    }

    fn data_items(&self, artifact: &dyn Artifact) -> Vec<DataItem> {
        let Some(table) = artifact.as_any().downcast_ref::<TableArtifact>() else {
            return Vec::new();
        };
        vec![DataItem::Table {
            name: table.name.clone(),
            frame: table.frame.clone(),
        }]
    }

    fn snapshot(&self, artifact: &dyn Artifact) -> Result<Vec<u8>> {
        let table = downcast::<TableArtifact>(artifact, self.name())?;
        let csv = frame_to_csv(&table.frame)?;
        let blob = TableSnapshot {
            name: table.name.clone(),
            csv,
        };
        serde_json::to_vec(&blob).map_err(|e| FigrevError::Serde(e.to_string()))
    }

    fn restore(&self, payload: &[u8]) -> Result<Box<dyn Artifact>> {
        let blob: TableSnapshot = serde_json::from_slice(payload)
            .map_err(|e| FigrevError::snapshot_restore(format!("table payload: {e}")))?;
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(blob.csv))
            .finish()
            .map_err(|e| FigrevError::snapshot_restore(format!("table csv: {e}")))?;
        Ok(Box::new(TableArtifact::new(blob.name, frame)))
    }
}

#[derive(Serialize, Deserialize)]
struct TableSnapshot {
    name: String,
    csv: Vec<u8>,
}

// ---------------------------------------------------------------------------
// 3-D scenes
// ---------------------------------------------------------------------------

/// A 3-D point scene; the interactive variant ships the raw vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneArtifact {
    pub title: Option<String>,
    pub vertices: Vec<[f64; 3]>,
}

impl SceneArtifact {
    pub fn new(vertices: Vec<[f64; 3]>) -> Self {
        Self {
            title: None,
            vertices,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl Artifact for SceneArtifact {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capture backend for [`SceneArtifact`]; interactive-capable.
#[derive(Debug)]
pub struct SceneBackend;

impl CaptureBackend for SceneBackend {
    fn name(&self) -> &'static str {
        "scene"
    }

    fn detect(&self, artifact: &dyn Artifact) -> bool {
        artifact.as_any().is::<SceneArtifact>()
    }

    fn render(
        &self,
        artifact: &dyn Artifact,
        formats: &[ImageFormat],
        options: &RenderOptions,
    ) -> Result<BTreeMap<ImageFormat, Rendered>> {
        let scene = downcast::<SceneArtifact>(artifact, self.name())?;
        let mut out = BTreeMap::new();
        if !formats.contains(&ImageFormat::Png) {
            return Ok(out);
        }

        // Orthographic projection onto the x/y plane; depth darkens the dot.
        let mut img = blank_canvas(options.width, options.height);
        let max_z = scene
            .vertices
            .iter()
            .map(|v| v[2].abs())
            .fold(f64::EPSILON, f64::max);
        let projected = project(
            scene.vertices.iter().map(|v| (v[0], v[1])),
            options.width,
            options.height,
        );
        for (vertex, (x, y)) in scene.vertices.iter().zip(projected) {
            let shade = (200.0 * (1.0 - vertex[2].abs() / max_z)) as u8;
            plot_dot(&mut img, x, y, Rgba([shade, shade, shade, 255]));
        }
        out.insert(
            ImageFormat::Png,
            Rendered {
                data: encode_png(img)?,
                width: Some(options.width),
                height: Some(options.height),
            },
        );
        Ok(out)
    }

    fn supports_interactive(&self) -> bool {
        true
    }

    fn render_interactive(&self, artifact: &dyn Artifact) -> Option<String> {
        let scene = artifact.as_any().downcast_ref::<SceneArtifact>()?;
        let vertices = serde_json::to_string(&scene.vertices).ok()?;
        Some(format!(
            "<div class=\"scene-view\" data-vertices='{vertices}'></div>"
        ))
    }

    fn title(&self, artifact: &dyn Artifact) -> Option<String> {
        artifact
            .as_any()
            .downcast_ref::<SceneArtifact>()
            .and_then(|scene| scene.title.clone())
    }

    fn snapshot(&self, artifact: &dyn Artifact) -> Result<Vec<u8>> {
        let scene = downcast::<SceneArtifact>(artifact, self.name())?;
        serde_json::to_vec(scene).map_err(|e| FigrevError::Serde(e.to_string()))
    }

    fn restore(&self, payload: &[u8]) -> Result<Box<dyn Artifact>> {
        let scene: SceneArtifact = serde_json::from_slice(payload)
            .map_err(|e| FigrevError::snapshot_restore(format!("scene payload: {e}")))?;
        Ok(Box::new(scene))
    }
}

fn downcast<'a, T: 'static>(artifact: &'a dyn Artifact, backend: &str) -> Result<&'a T> {
    artifact.as_any().downcast_ref::<T>().ok_or_else(|| {
        FigrevError::capture(format!("backend '{backend}' asked to render a foreign artifact"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};

    #[test]
    fn chart_renders_requested_formats() {
        let chart = ChartArtifact::figure(vec![(0.0, 0.0), (1.0, 1.0)]);
        let rendered = ChartBackend
            .render(
                &chart,
                &[ImageFormat::Png, ImageFormat::Svg],
                &RenderOptions::sized(64, 48),
            )
            .expect("render chart");
        assert_eq!(rendered.len(), 2);
        let png = &rendered[&ImageFormat::Png];
        assert_eq!(png.width, Some(64));
        assert_eq!(png.height, Some(48));
        assert!(String::from_utf8_lossy(&rendered[&ImageFormat::Svg].data).contains("<svg"));
    }

    #[test]
    fn distinct_options_produce_distinct_bytes() {
        let chart = ChartArtifact::figure(vec![(0.0, 0.0), (1.0, 2.0)]);
        let small = ChartBackend
            .render(&chart, &[ImageFormat::Png], &RenderOptions::sized(32, 32))
            .expect("small render");
        let large = ChartBackend
            .render(&chart, &[ImageFormat::Png], &RenderOptions::sized(128, 128))
            .expect("large render");
        assert_ne!(
            small[&ImageFormat::Png].data,
            large[&ImageFormat::Png].data
        );
    }

    #[test]
    fn chart_snapshot_round_trips() {
        let chart = ChartArtifact::figure(vec![(1.0, 2.0)]).with_title("Growth");
        let payload = ChartBackend.snapshot(&chart).expect("snapshot");
        let restored = ChartBackend.restore(&payload).expect("restore");
        let restored = restored
            .as_any()
            .downcast_ref::<ChartArtifact>()
            .expect("chart back");
        assert_eq!(restored, &chart);
    }

    #[test]
    fn table_snapshot_round_trips() {
        let frame = DataFrame::new(vec![
            Series::new("dose".into(), vec![1i64, 2, 3]).into(),
        ])
        .unwrap();
        let table = TableArtifact::new("doses", frame);
        let payload = TableBackend.snapshot(&table).expect("snapshot");
        let restored = TableBackend.restore(&payload).expect("restore");
        let restored = restored
            .as_any()
            .downcast_ref::<TableArtifact>()
            .expect("table back");
        assert_eq!(restored.name, "doses");
        assert_eq!(restored.frame.height(), 3);
    }

    #[test]
    fn scene_is_interactive() {
        let scene = SceneArtifact::new(vec![[0.0, 0.0, 0.5], [1.0, 1.0, -0.5]]);
        assert!(SceneBackend.supports_interactive());
        let html = SceneBackend
            .render_interactive(&scene)
            .expect("interactive html");
        assert!(html.contains("scene-view"));
    }
}
