//! Drawing an hour × date matrix as a PNG heatmap.

use crate::config::RenderConfig;
use crate::heatmap::axis::{hour_ticks, month_ticks};
use crate::heatmap::color_scale::ColorScale;
use crate::heatmap::error::HeatmapError;
use crate::matrix::hour_date_matrix::{HourDateMatrix, HOURS};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};

const TICK_LENGTH: i32 = 8;
const LEGEND_GAP: i32 = 40;
const LEGEND_WIDTH: i32 = 40;

/// Where a rendered heatmap goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    File(PathBuf),
    /// A kept temporary PNG; its path is logged and returned for viewing.
    Display,
}

/// Renders `matrix` with `scale` and returns the path of the written PNG.
///
/// Hour 0 is the top row. Month abbreviations mark the first day of each month on
/// the x axis, every sixth hour is labeled on the y axis, and the legend labels
/// every other boundary of the scale.
pub fn render_heatmap(
    matrix: &HourDateMatrix,
    scale: &ColorScale,
    title: &str,
    value_label: &str,
    target: &RenderTarget,
    config: &RenderConfig,
) -> Result<PathBuf, HeatmapError> {
    let path = match target {
        RenderTarget::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| HeatmapError::OutputDir(parent.to_path_buf(), e))?;
            }
            path.clone()
        }
        RenderTarget::Display => tempfile::Builder::new()
            .prefix("climate_heatmap_")
            .suffix(".png")
            .tempfile()
            .map_err(HeatmapError::TempFile)?
            .into_temp_path()
            .keep()?,
    };

    let (_, columns) = matrix.shape();
    info!(
        "Rendering '{}' ({} dates, {} color bins) to {}",
        title,
        columns,
        scale.bins(),
        path.display()
    );
    draw(&path, matrix, scale, title, value_label, config)?;

    if *target == RenderTarget::Display {
        info!("Heatmap ready for viewing at {}", path.display());
    }
    Ok(path)
}

/// Pixel bounds of the cell grid.
struct PlotArea {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl PlotArea {
    fn new(config: &RenderConfig) -> Self {
        let width = config.width as i32 - (config.margin_left + config.margin_right) as i32;
        let height = config.height as i32 - (config.margin_top + config.margin_bottom) as i32;
        Self {
            left: config.margin_left as i32,
            top: config.margin_top as i32,
            width: width.max(1),
            height: height.max(1),
        }
    }

    fn right(&self) -> i32 {
        self.left + self.width
    }

    fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Offset of the `index`-th of `count` equal slices of `extent`.
    fn slice(extent: i32, index: usize, count: usize) -> i32 {
        (index as i64 * extent as i64 / count.max(1) as i64) as i32
    }
}

fn drawing_err<E: std::fmt::Display>(e: E) -> HeatmapError {
    HeatmapError::Drawing(e.to_string())
}

fn draw(
    path: &Path,
    matrix: &HourDateMatrix,
    scale: &ColorScale,
    title: &str,
    value_label: &str,
    config: &RenderConfig,
) -> Result<(), HeatmapError> {
    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_err)?;
    let area = PlotArea::new(config);

    draw_cells(&root, &area, matrix, scale)?;
    root.draw(&Rectangle::new(
        [(area.left, area.top), (area.right(), area.bottom())],
        BLACK.stroke_width(1),
    ))
    .map_err(drawing_err)?;

    let font = config.font_family.as_str();
    let title_style = (font, config.title_font_size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    root.draw_text(
        title,
        &title_style,
        (config.width as i32 / 2, area.top / 2),
    )
    .map_err(drawing_err)?;

    draw_axes(&root, &area, matrix, config)?;
    draw_legend(&root, &area, scale, value_label, config)?;

    root.present().map_err(drawing_err)
}

fn draw_cells(
    root: &DrawingArea<BitMapBackend, Shift>,
    area: &PlotArea,
    matrix: &HourDateMatrix,
    scale: &ColorScale,
) -> Result<(), HeatmapError> {
    let (_, columns) = matrix.shape();
    for hour in 0..HOURS {
        let Some(row) = matrix.row(hour) else {
            continue;
        };
        let y0 = area.top + PlotArea::slice(area.height, hour, HOURS);
        let y1 = area.top + PlotArea::slice(area.height, hour + 1, HOURS);
        for (column, value) in row.iter().enumerate() {
            let x0 = area.left + PlotArea::slice(area.width, column, columns);
            let x1 = area.left + PlotArea::slice(area.width, column + 1, columns);
            root.draw(&Rectangle::new(
                [(x0, y0), (x1, y1)],
                scale.color(*value).filled(),
            ))
            .map_err(drawing_err)?;
        }
    }
    Ok(())
}

fn draw_axes(
    root: &DrawingArea<BitMapBackend, Shift>,
    area: &PlotArea,
    matrix: &HourDateMatrix,
    config: &RenderConfig,
) -> Result<(), HeatmapError> {
    let font = config.font_family.as_str();
    let (_, columns) = matrix.shape();

    let x_style = (font, config.tick_font_size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (column, label) in month_ticks(matrix.dates()) {
        let x = area.left + PlotArea::slice(area.width, 2 * column + 1, 2 * columns);
        root.draw(&PathElement::new(
            vec![(x, area.bottom()), (x, area.bottom() + TICK_LENGTH)],
            BLACK,
        ))
        .map_err(drawing_err)?;
        root.draw_text(&label, &x_style, (x, area.bottom() + 2 * TICK_LENGTH))
            .map_err(drawing_err)?;
    }

    let y_style = (font, config.tick_font_size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (hour, label) in hour_ticks() {
        let y = area.top + PlotArea::slice(area.height, 2 * hour + 1, 2 * HOURS);
        root.draw(&PathElement::new(
            vec![(area.left - TICK_LENGTH, y), (area.left, y)],
            BLACK,
        ))
        .map_err(drawing_err)?;
        root.draw_text(&label, &y_style, (area.left - 2 * TICK_LENGTH, y))
            .map_err(drawing_err)?;
    }
    Ok(())
}

fn draw_legend(
    root: &DrawingArea<BitMapBackend, Shift>,
    area: &PlotArea,
    scale: &ColorScale,
    value_label: &str,
    config: &RenderConfig,
) -> Result<(), HeatmapError> {
    let font = config.font_family.as_str();
    let left = area.right() + LEGEND_GAP;
    let right = left + LEGEND_WIDTH;
    let bins = scale.bins();

    // lowest bin at the bottom
    for bin in 0..bins {
        let y0 = area.bottom() - PlotArea::slice(area.height, bin + 1, bins);
        let y1 = area.bottom() - PlotArea::slice(area.height, bin, bins);
        root.draw(&Rectangle::new(
            [(left, y0), (right, y1)],
            scale.bin_color(bin).filled(),
        ))
        .map_err(drawing_err)?;
    }
    root.draw(&Rectangle::new(
        [(left, area.top), (right, area.bottom())],
        BLACK.stroke_width(1),
    ))
    .map_err(drawing_err)?;

    let tick_style = (font, config.tick_font_size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    for (index, value) in scale.legend_labels().into_iter().enumerate() {
        let boundary = index * 2;
        let y = area.bottom() - PlotArea::slice(area.height, boundary, bins);
        root.draw(&PathElement::new(
            vec![(right, y), (right + TICK_LENGTH, y)],
            BLACK,
        ))
        .map_err(drawing_err)?;
        root.draw_text(
            &value.to_string(),
            &tick_style,
            (right + 2 * TICK_LENGTH, y),
        )
        .map_err(drawing_err)?;
    }

    let label_style = (font, config.label_font_size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Bottom));
    root.draw_text(value_label, &label_style, (left, area.top - TICK_LENGTH))
        .map_err(drawing_err)?;
    Ok(())
}
