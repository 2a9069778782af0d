//! Table layout: resolves column widths, wraps the flexible column and paginates rows.
//!
//! The output is declarative. Coordinates are in points relative to the
//! top-left corner of the table area on each page, growing downwards; the
//! renderer decides where that area sits on the physical page.

use std::borrow::Cow;

use thiserror::Error;

/// Text width oracle for the active font and size.
pub trait TextMeasure {
    fn text_width(&self, text: &str) -> f32;
}

impl<F: Fn(&str) -> f32> TextMeasure for F {
    fn text_width(&self, text: &str) -> f32 {
        self(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColumnWidth {
    Fixed(f32),
    /// Absorbs whatever width the fixed columns leave.
    Flexible,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub label: String,
    pub width: ColumnWidth,
    pub align: Align,
}

impl ColumnSpec {
    pub fn fixed(label: impl Into<String>, width: f32, align: Align) -> Self {
        ColumnSpec {
            label: label.into(),
            width: ColumnWidth::Fixed(width),
            align,
        }
    }

    pub fn flexible(label: impl Into<String>) -> Self {
        ColumnSpec {
            label: label.into(),
            width: ColumnWidth::Flexible,
            align: Align::Left,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Width the grid must fill exactly.
    pub page_width: f32,
    /// Height of the table area on every page, header included.
    pub page_height: f32,
    pub header_height: f32,
    /// Space already used above the table on the first page.
    pub first_page_offset: f32,
    pub min_row_height: f32,
    pub line_height: f32,
    /// Horizontal space inside a cell not available to text (both sides together).
    pub text_inset: f32,
    /// When set, a single token wider than the flexible column is cut to this
    /// many characters (ellipsis included) instead of overflowing.
    pub max_token_chars: Option<usize>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            page_width: 539.0,
            page_height: 786.0,
            header_height: 18.0,
            first_page_offset: 0.0,
            min_row_height: 16.0,
            line_height: 11.0,
            text_inset: 4.0,
            max_token_chars: None,
        }
    }
}

/// One input row; `cells[i]` belongs to column `i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowData {
    pub cells: Vec<String>,
}

impl RowData {
    pub fn new<S: Into<String>>(cells: impl IntoIterator<Item = S>) -> Self {
        RowData {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowSource {
    /// Index into the `rows` slice passed to [`layout`].
    Body(usize),
    Totals,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedColumn {
    pub label: String,
    pub x: f32,
    pub width: f32,
    pub align: Align,
    pub flexible: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub column: usize,
    pub x: f32,
    pub width: f32,
    pub height: f32,
    pub align: Align,
    /// One entry per band; fixed cells always hold exactly one line.
    pub lines: Vec<String>,
    pub band_height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedRow {
    pub source: RowSource,
    /// Top edge, measured from the top of the table area (header included).
    pub y: f32,
    pub height: f32,
    pub cells: Vec<Cell>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub header: Vec<Cell>,
    pub body: Vec<RenderedRow>,
}

impl Page {
    /// Distance from the top of the table area to the bottom of the last row.
    pub fn bottom(&self) -> f32 {
        let header_h = self.header.first().map_or(0.0, |c| c.height);
        self.body
            .last()
            .map_or(header_h, |row| row.y + row.height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableLayout {
    pub columns: Vec<ResolvedColumn>,
    pub pages: Vec<Page>,
}

impl TableLayout {
    pub fn total_width(&self) -> f32 {
        self.columns.iter().map(|c| c.width).sum()
    }

    pub fn flexible_column(&self) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.flexible)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("no flexible column configured")]
    NoFlexibleColumn,
    #[error("{0} flexible columns configured, exactly one is allowed")]
    MultipleFlexibleColumns(usize),
    #[error("fixed columns need {fixed}pt but the page is only {page_width}pt wide")]
    FixedColumnsTooWide { fixed: f32, page_width: f32 },
    #[error("header row ({header_height}pt) leaves no room on a {page_height}pt page")]
    HeaderTooTall { header_height: f32, page_height: f32 },
}

/// Resolve column positions. The flexible column gets `page_width - sum(fixed)`.
pub fn resolve_columns(
    columns: &[ColumnSpec],
    page_width: f32,
) -> Result<Vec<ResolvedColumn>, LayoutError> {
    let flexible_count = columns
        .iter()
        .filter(|c| c.width == ColumnWidth::Flexible)
        .count();
    match flexible_count {
        0 => return Err(LayoutError::NoFlexibleColumn),
        1 => {}
        n => return Err(LayoutError::MultipleFlexibleColumns(n)),
    }

    let fixed: f32 = columns
        .iter()
        .filter_map(|c| match c.width {
            ColumnWidth::Fixed(w) => Some(w),
            ColumnWidth::Flexible => None,
        })
        .sum();
    if fixed >= page_width {
        return Err(LayoutError::FixedColumnsTooWide { fixed, page_width });
    }
    let flexible_width = page_width - fixed;

    let mut x = 0.0f32;
    Ok(columns
        .iter()
        .map(|spec| {
            let (width, flexible) = match spec.width {
                ColumnWidth::Fixed(w) => (w, false),
                ColumnWidth::Flexible => (flexible_width, true),
            };
            let col = ResolvedColumn {
                label: spec.label.clone(),
                x,
                width,
                align: spec.align,
                flexible,
            };
            x += width;
            col
        })
        .collect())
}

/// Cut a token that cannot fit on a line to `max_chars` characters, ellipsis included.
fn fit_token<'a>(
    token: &'a str,
    avail_width: f32,
    measure: &dyn TextMeasure,
    max_chars: Option<usize>,
) -> Cow<'a, str> {
    let Some(max) = max_chars else {
        return Cow::Borrowed(token);
    };
    if token.chars().count() <= max || measure.text_width(token) <= avail_width {
        return Cow::Borrowed(token);
    }
    let mut cut: String = token.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    Cow::Owned(cut)
}

/// Greedy word wrap of `text` into lines no wider than `avail_width`.
///
/// Text that already fits comes back unchanged as a single line. A token wider
/// than the line is never split mid-word; it sits alone on its own line unless
/// `max_token_chars` truncates it.
pub fn wrap_text(
    text: &str,
    avail_width: f32,
    measure: &dyn TextMeasure,
    max_token_chars: Option<usize>,
) -> Vec<String> {
    if measure.text_width(text) <= avail_width {
        return vec![text.to_string()];
    }

    let space_w = measure.text_width(" ");
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut line_w = 0.0f32;

    for word in text.split_whitespace() {
        let word = fit_token(word, avail_width, measure, max_token_chars);
        let word_w = measure.text_width(&word);
        if current.is_empty() {
            current.push_str(&word);
            line_w = word_w;
            continue;
        }
        let needed = line_w + space_w + word_w;
        if needed > avail_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(&word);
            line_w = word_w;
        } else {
            current.push(' ');
            current.push_str(&word);
            line_w = needed;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn build_cells(
    row: &RowData,
    columns: &[ResolvedColumn],
    config: &LayoutConfig,
    measure: &dyn TextMeasure,
) -> (Vec<Cell>, f32) {
    let mut wrapped: Vec<Vec<String>> = Vec::with_capacity(columns.len());
    let mut max_lines = 1usize;
    for (i, col) in columns.iter().enumerate() {
        let text = row.cells.get(i).map(String::as_str).unwrap_or("");
        let lines = if col.flexible {
            let avail = (col.width - config.text_inset).max(0.0);
            wrap_text(text, avail, measure, config.max_token_chars)
        } else {
            vec![text.to_string()]
        };
        max_lines = max_lines.max(lines.len());
        wrapped.push(lines);
    }

    let height = config
        .min_row_height
        .max(max_lines as f32 * config.line_height);

    let cells = columns
        .iter()
        .zip(wrapped)
        .enumerate()
        .map(|(i, (col, lines))| Cell {
            column: i,
            x: col.x,
            width: col.width,
            height,
            align: col.align,
            band_height: height / lines.len() as f32,
            lines,
        })
        .collect();
    (cells, height)
}

fn header_cells(columns: &[ResolvedColumn], header_height: f32) -> Vec<Cell> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| Cell {
            column: i,
            x: col.x,
            width: col.width,
            height: header_height,
            align: Align::Center,
            lines: vec![col.label.clone()],
            band_height: header_height,
        })
        .collect()
}

/// Slack allowed when a row exactly fills the remaining space, in points.
pub const FIT_TOLERANCE: f64 = 1e-3;

/// Lay out `rows` (then the optional `totals` row) across as many pages as needed.
///
/// Every page starts with the column header. A row is placed while
/// `running + height <= page_height - header_height`, within
/// [`FIT_TOLERANCE`]; the first page also subtracts `first_page_offset`.
/// Rows are never split. When the offset leaves no room for the first row,
/// page 1 carries neither header nor rows and the table starts on page 2.
pub fn layout(
    columns: &[ColumnSpec],
    rows: &[RowData],
    totals: Option<&RowData>,
    config: &LayoutConfig,
    measure: &dyn TextMeasure,
) -> Result<TableLayout, LayoutError> {
    let resolved = resolve_columns(columns, config.page_width)?;
    if config.header_height >= config.page_height {
        return Err(LayoutError::HeaderTooTall {
            header_height: config.header_height,
            page_height: config.page_height,
        });
    }

    let header = header_cells(&resolved, config.header_height);
    let full_capacity = config.page_height - config.header_height;
    let new_page = || Page {
        header: header.clone(),
        body: Vec::new(),
    };

    let mut pages: Vec<Page> = Vec::new();
    let mut page = new_page();
    let mut capacity = f64::from(full_capacity - config.first_page_offset.max(0.0));
    // Summed in f64 so a run of fractional heights does not drift past the page.
    let mut running = 0.0f64;

    let sources = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (RowSource::Body(i), r))
        .chain(totals.map(|t| (RowSource::Totals, t)));

    for (source, row) in sources {
        let (cells, height) = build_cells(row, &resolved, config, measure);

        if running + f64::from(height) > capacity + FIT_TOLERANCE {
            if !page.body.is_empty() || capacity < f64::from(full_capacity) {
                let mut done = std::mem::replace(&mut page, new_page());
                if done.body.is_empty() {
                    done.header.clear();
                }
                pages.push(done);
                capacity = f64::from(full_capacity);
                running = 0.0;
            }
            if f64::from(height) > capacity + FIT_TOLERANCE {
                log::warn!(
                    "row {source:?} is {height:.1}pt tall but a page only holds {capacity:.1}pt; placing it anyway"
                );
            }
        }

        log::debug!("LAYOUT page={} row={source:?} h={height:.2} y={running:.2}", pages.len() + 1);
        page.body.push(RenderedRow {
            source,
            y: config.header_height + running as f32,
            height,
            cells,
        });
        running += f64::from(height);
    }
    pages.push(page);

    Ok(TableLayout {
        columns: resolved,
        pages,
    })
}
