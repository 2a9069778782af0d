use crate::fonts::{FontSet, SizedFont};
use crate::layout::{Align, Cell, Page, RowSource};
use crate::layout::TextMeasure;

use super::{DrawCommand, FontWeight, Rgb, font_for};

pub(super) const BORDER_WIDTH: f32 = 0.5;

/// Visual parameters for drawing a laid-out table page.
pub(super) struct TableStyle {
    pub(super) font_size: f32,
    pub(super) header_font_size: f32,
    pub(super) cell_padding: f32,
    pub(super) header_fill: Rgb,
}

/// Baseline that vertically centers one line of `size` text in a band.
fn centered_baseline(band_top: f32, band_height: f32, size: f32) -> f32 {
    band_top + band_height / 2.0 + size * 0.35
}

fn aligned_x(cell: &Cell, text_w: f32, padding: f32) -> f32 {
    match cell.align {
        Align::Left => cell.x + padding,
        Align::Center => cell.x + (cell.width - text_w) / 2.0,
        Align::Right => cell.x + cell.width - padding - text_w,
    }
}

fn draw_cell_text(
    cell: &Cell,
    origin_x: f32,
    row_top: f32,
    weight: FontWeight,
    size: f32,
    style: &TableStyle,
    fonts: &FontSet,
    out: &mut Vec<DrawCommand>,
) {
    let measure = SizedFont {
        font: font_for(fonts, weight),
        size,
    };
    for (band, line) in cell.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let text_w = measure.text_width(line);
        let band_top = row_top + band as f32 * cell.band_height;
        out.push(DrawCommand::Text {
            x: origin_x + aligned_x(cell, text_w, style.cell_padding),
            baseline: centered_baseline(band_top, cell.band_height, size),
            text: line.clone(),
            weight,
            size,
        });
    }
}

/// Emit draw commands for one page of the table whose top-left corner is at (`origin_x`, `origin_y`).
///
/// `fill_for` picks the background of each body cell (`None` leaves it white).
pub(super) fn draw_table_page(
    page: &Page,
    origin_x: f32,
    origin_y: f32,
    style: &TableStyle,
    fonts: &FontSet,
    fill_for: impl Fn(RowSource, usize) -> Option<Rgb>,
    out: &mut Vec<DrawCommand>,
) {
    for cell in &page.header {
        out.push(DrawCommand::FillRect {
            x: origin_x + cell.x,
            y: origin_y,
            width: cell.width,
            height: cell.height,
            color: style.header_fill,
        });
    }
    for cell in &page.header {
        draw_cell_text(
            cell,
            origin_x,
            origin_y,
            FontWeight::Bold,
            style.header_font_size,
            style,
            fonts,
            out,
        );
        out.push(DrawCommand::StrokeRect {
            x: origin_x + cell.x,
            y: origin_y,
            width: cell.width,
            height: cell.height,
            line_width: BORDER_WIDTH,
        });
    }

    for row in &page.body {
        let row_top = origin_y + row.y;
        let weight = match row.source {
            RowSource::Totals => FontWeight::Bold,
            RowSource::Body(_) => FontWeight::Regular,
        };
        log::debug!(
            "TABLE row={:?} top={row_top:.2} h={:.2}",
            row.source,
            row.height
        );

        for cell in &row.cells {
            if let Some(color) = fill_for(row.source, cell.column) {
                out.push(DrawCommand::FillRect {
                    x: origin_x + cell.x,
                    y: row_top,
                    width: cell.width,
                    height: cell.height,
                    color,
                });
            }
        }
        for cell in &row.cells {
            draw_cell_text(cell, origin_x, row_top, weight, style.font_size, style, fonts, out);
            out.push(DrawCommand::StrokeRect {
                x: origin_x + cell.x,
                y: row_top,
                width: cell.width,
                height: cell.height,
                line_width: BORDER_WIDTH,
            });
        }
    }
}
