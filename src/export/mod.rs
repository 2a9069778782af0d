//! Invoice export: turns an [`Invoice`] plus session [`Branding`] into draw
//! commands, then into PDF bytes.

mod table;

use crate::config::PageSetup;
use crate::currency::money;
use crate::error::{Error, ImageError};
use crate::fonts::{FontEntry, FontSet, SizedFont};
use crate::images::{self, PreparedImage};
use crate::import;
use crate::layout::{self, Align, ColumnSpec, LayoutConfig, RowData, RowSource, TextMeasure};
use crate::model::{Branding, ImageUpload, Invoice};
use crate::totals::{self, Totals};

use table::{TableStyle, draw_table_page};

pub type Rgb = [u8; 3];

pub const HEADER_FILL: Rgb = [200, 220, 255];
pub const PROFIT_FILL: Rgb = [198, 239, 206];
pub const LOSS_FILL: Rgb = [255, 199, 206];

pub const COLUMN_LABELS: [&str; 8] = [
    "Page",
    "Product",
    "Qty",
    "Unit-Catalog",
    "Total-Catalog",
    "Unit-List",
    "Total-List",
    "Profit",
];
const PROFIT_COLUMN: usize = 7;

pub const TITLE_PREFIX: &str = "INVOICE: ";
pub const CLIENT_LABEL: &str = "CLIENT: ";
pub const DATE_LABEL: &str = "PAYMENT DATE: ";
pub const TOTALS_LABEL: &str = "TOTALS";
pub const PAYMENT_LABEL: &str = "PAYMENT: ";
pub const PAYMENT_PLACEHOLDER: &str = "Payment details available on request";

const TITLE_SIZE: f32 = 16.0;
const SUMMARY_SIZE: f32 = 11.0;
const FOOTER_SIZE: f32 = 8.0;
const FOOTER_RESERVE: f32 = 16.0;
const LOGO_WIDTH: f32 = 94.0;
const LOGO_MAX_HEIGHT: f32 = 70.0;
const PAYMENT_LOGO_MAX: (f32, f32) = (80.0, 36.0);
const QR_SIZE: f32 = 85.0;
/// Gap between the QR code and the right margin.
const QR_RIGHT_OFFSET: f32 = 10.0;
const BLOCK_GAP: f32 = 10.0;
const CELL_PADDING: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Logo,
    PaymentLogo,
    PaymentQr,
}

/// One drawing operation. Coordinates are points from the page's top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
    },
    Text {
        x: f32,
        baseline: f32,
        text: String,
        weight: FontWeight,
        size: f32,
    },
    Image {
        role: ImageRole,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// An image that was provided but left out of the document.
#[derive(Debug)]
pub struct OmittedImage {
    pub role: ImageRole,
    pub name: String,
    pub error: ImageError,
}

/// The full drawing of an invoice, page by page.
pub struct Composition {
    pub page_width: f32,
    pub page_height: f32,
    pub title: String,
    pub pages: Vec<Vec<DrawCommand>>,
    pub images: Vec<(ImageRole, PreparedImage)>,
    pub omitted_images: Vec<OmittedImage>,
    pub totals: Totals,
}

impl Composition {
    /// All text drawn in `weight`, in drawing order.
    pub fn texts(&self, weight: FontWeight) -> impl Iterator<Item = &str> {
        self.pages.iter().flatten().filter_map(move |cmd| match cmd {
            DrawCommand::Text { text, weight: w, .. } if *w == weight => Some(text.as_str()),
            _ => None,
        })
    }
}

pub struct ExportOptions {
    pub page: PageSetup,
    pub fonts: FontSet,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            page: PageSetup::default(),
            fonts: FontSet::builtin(),
        }
    }
}

pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
    pub omitted_images: Vec<OmittedImage>,
    pub totals: Totals,
}

pub fn invoice_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::fixed(COLUMN_LABELS[0], 30.0, Align::Center),
        ColumnSpec::flexible(COLUMN_LABELS[1]),
        ColumnSpec::fixed(COLUMN_LABELS[2], 28.0, Align::Right),
        ColumnSpec::fixed(COLUMN_LABELS[3], 64.0, Align::Right),
        ColumnSpec::fixed(COLUMN_LABELS[4], 66.0, Align::Right),
        ColumnSpec::fixed(COLUMN_LABELS[5], 58.0, Align::Right),
        ColumnSpec::fixed(COLUMN_LABELS[6], 60.0, Align::Right),
        ColumnSpec::fixed(COLUMN_LABELS[7], 60.0, Align::Right),
    ]
}

/// Shading for profit cells.
pub fn profit_fill(profit: impl Into<i128>) -> Rgb {
    if profit.into() >= 0 { PROFIT_FILL } else { LOSS_FILL }
}

/// `Invoice_<client>.pdf` with path-hostile characters replaced.
pub fn suggested_file_name(invoice: &Invoice) -> String {
    let client: String = invoice
        .client_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Invoice_{client}.pdf")
}

fn prepare_slot(
    role: ImageRole,
    upload: Option<&ImageUpload>,
    images: &mut Vec<(ImageRole, PreparedImage)>,
    omitted: &mut Vec<OmittedImage>,
) {
    let Some(upload) = upload else {
        return;
    };
    match images::prepare(upload) {
        Ok(img) => images.push((role, img)),
        Err(error) => {
            log::warn!("omitting {role:?} image {}: {error}", upload.name);
            omitted.push(OmittedImage {
                role,
                name: upload.name.clone(),
                error,
            });
        }
    }
}

fn find_image(images: &[(ImageRole, PreparedImage)], role: ImageRole) -> Option<&PreparedImage> {
    images.iter().find(|(r, _)| *r == role).map(|(_, img)| img)
}

fn text_cmd(x: f32, baseline: f32, text: impl Into<String>, weight: FontWeight, size: f32) -> DrawCommand {
    DrawCommand::Text {
        x,
        baseline,
        text: text.into(),
        weight,
        size,
    }
}

fn font_for(fonts: &FontSet, weight: FontWeight) -> &FontEntry {
    match weight {
        FontWeight::Regular => &fonts.regular,
        FontWeight::Bold => &fonts.bold,
    }
}

/// Build the draw commands for `invoice`.
///
/// Fails with [`Error::ClientNameRequired`] before doing any work when the
/// client name is blank. Rows without a product name are left out.
pub fn compose(
    invoice: &Invoice,
    branding: &Branding,
    options: &ExportOptions,
) -> Result<Composition, Error> {
    if !invoice.has_client() {
        return Err(Error::ClientNameRequired);
    }

    let page = &options.page;
    let fonts = &options.fonts;
    let content_width = page.width - 2.0 * page.margin;
    let bottom_limit = page.height - page.margin - FOOTER_RESERVE;

    let mut images: Vec<(ImageRole, PreparedImage)> = Vec::new();
    let mut omitted: Vec<OmittedImage> = Vec::new();
    prepare_slot(ImageRole::Logo, branding.logo.as_ref(), &mut images, &mut omitted);
    prepare_slot(ImageRole::PaymentLogo, branding.payment_logo.as_ref(), &mut images, &mut omitted);
    prepare_slot(ImageRole::PaymentQr, branding.payment_qr.as_ref(), &mut images, &mut omitted);

    let mut first: Vec<DrawCommand> = Vec::new();
    let mut cursor = page.margin;

    // Logo
    if let Some(logo) = find_image(&images, ImageRole::Logo) {
        let (w, h) = logo.fit_within(LOGO_WIDTH, LOGO_MAX_HEIGHT);
        first.push(DrawCommand::Image {
            role: ImageRole::Logo,
            x: page.margin,
            y: cursor,
            width: w,
            height: h,
        });
        cursor += h + BLOCK_GAP;
    }

    // Title
    let title = format!("{TITLE_PREFIX}{}", branding.magazine_name.trim());
    let title_w = SizedFont { font: &fonts.bold, size: TITLE_SIZE }.text_width(&title);
    first.push(text_cmd(
        page.margin + ((content_width - title_w) / 2.0).max(0.0),
        cursor + fonts.bold.ascent(TITLE_SIZE),
        title,
        FontWeight::Bold,
        TITLE_SIZE,
    ));
    cursor += fonts.bold.line_height(TITLE_SIZE) + BLOCK_GAP;

    // Client / date summary
    let summary_baseline = cursor + fonts.regular.ascent(SUMMARY_SIZE);
    first.push(text_cmd(
        page.margin,
        summary_baseline,
        format!("{CLIENT_LABEL}{}", invoice.client_name.trim()),
        FontWeight::Regular,
        SUMMARY_SIZE,
    ));
    first.push(text_cmd(
        page.margin + content_width / 2.0,
        summary_baseline,
        format!("{DATE_LABEL}{}", invoice.payment_date.format("%Y-%m-%d")),
        FontWeight::Regular,
        SUMMARY_SIZE,
    ));
    cursor += fonts.regular.line_height(SUMMARY_SIZE) + BLOCK_GAP;

    // Table
    let items: Vec<_> = invoice.exportable_items().collect();
    let totals = totals::compute(items.iter().copied());
    let rows: Vec<RowData> = items
        .iter()
        .zip(&totals.rows)
        .map(|(item, t)| {
            RowData::new([
                item.page_ref.clone(),
                item.product_name.trim().to_string(),
                item.quantity().to_string(),
                money(item.catalog_unit_price()),
                money(t.catalog_total),
                money(item.list_unit_price()),
                money(t.list_total),
                money(t.profit),
            ])
        })
        .collect();
    let totals_row = RowData::new([
        String::new(),
        TOTALS_LABEL.to_string(),
        String::new(),
        String::new(),
        money(totals.catalog_sum),
        String::new(),
        money(totals.list_sum),
        money(totals.profit_sum),
    ]);

    let line_height = fonts.regular.line_height(page.font_size);
    let table_cfg = LayoutConfig {
        page_width: content_width,
        page_height: bottom_limit - page.margin,
        header_height: (line_height + 2.0 * CELL_PADDING).max(16.0),
        first_page_offset: cursor - page.margin,
        min_row_height: (line_height + 2.0 * CELL_PADDING).max(16.0),
        line_height,
        text_inset: 2.0 * CELL_PADDING,
        max_token_chars: page.max_token_chars,
    };
    let measure = SizedFont {
        font: &fonts.regular,
        size: page.font_size,
    };
    let table_layout = layout::layout(
        &invoice_columns(),
        &rows,
        Some(&totals_row),
        &table_cfg,
        &measure,
    )?;

    let style = TableStyle {
        font_size: page.font_size,
        header_font_size: (page.font_size - 1.5).max(5.0),
        cell_padding: CELL_PADDING,
        header_fill: HEADER_FILL,
    };
    let fill_for = |source: RowSource, column: usize| match (source, column) {
        (RowSource::Body(i), PROFIT_COLUMN) => Some(profit_fill(totals.rows[i].profit)),
        (RowSource::Totals, PROFIT_COLUMN) => Some(profit_fill(totals.profit_sum)),
        (RowSource::Totals, _) => Some(HEADER_FILL),
        (RowSource::Body(_), _) => None,
    };

    let mut pages: Vec<Vec<DrawCommand>> = Vec::new();
    let mut table_bottom = page.margin;
    for (pi, tpage) in table_layout.pages.iter().enumerate() {
        let mut cmds = if pi == 0 {
            std::mem::take(&mut first)
        } else {
            Vec::new()
        };
        let origin_y = if pi == 0 { cursor } else { page.margin };
        draw_table_page(tpage, page.margin, origin_y, &style, fonts, fill_for, &mut cmds);
        table_bottom = origin_y + tpage.bottom();
        pages.push(cmds);
    }

    // Payment block
    let account_line = match branding.payment_account() {
        Some(account) => format!("{PAYMENT_LABEL}{account}"),
        None => PAYMENT_PLACEHOLDER.to_string(),
    };
    let payment_logo = find_image(&images, ImageRole::PaymentLogo)
        .map(|img| img.fit_within(PAYMENT_LOGO_MAX.0, PAYMENT_LOGO_MAX.1));
    let has_qr = find_image(&images, ImageRole::PaymentQr).is_some();
    let text_block_h = payment_logo.map_or(0.0, |(_, h)| h + 4.0)
        + fonts.regular.line_height(SUMMARY_SIZE);
    let block_h = if has_qr { text_block_h.max(QR_SIZE) } else { text_block_h };

    let mut block_top = table_bottom + BLOCK_GAP * 2.0;
    if block_top + block_h > bottom_limit {
        log::debug!("payment block does not fit below the table; starting a new page");
        pages.push(Vec::new());
        block_top = page.margin;
    }
    let last_index = pages.len() - 1;
    let last = &mut pages[last_index];
    let mut y = block_top;
    if let Some((w, h)) = payment_logo {
        last.push(DrawCommand::Image {
            role: ImageRole::PaymentLogo,
            x: page.margin,
            y,
            width: w,
            height: h,
        });
        y += h + 4.0;
    }
    last.push(text_cmd(
        page.margin,
        y + fonts.regular.ascent(SUMMARY_SIZE),
        account_line,
        FontWeight::Regular,
        SUMMARY_SIZE,
    ));
    if has_qr {
        last.push(DrawCommand::Image {
            role: ImageRole::PaymentQr,
            x: page.width - page.margin - QR_RIGHT_OFFSET - QR_SIZE,
            y: block_top,
            width: QR_SIZE,
            height: QR_SIZE,
        });
    }

    // Footer
    let total_pages = pages.len();
    for (i, cmds) in pages.iter_mut().enumerate() {
        let label = format!("Page {} of {}", i + 1, total_pages);
        let w = SizedFont { font: &fonts.regular, size: FOOTER_SIZE }.text_width(&label);
        cmds.push(text_cmd(
            page.margin + (content_width - w) / 2.0,
            page.height - page.margin,
            label,
            FontWeight::Regular,
            FOOTER_SIZE,
        ));
    }

    log::info!(
        "composed invoice for {:?}: {} rows, {} pages, {} images ({} omitted)",
        invoice.client_name.trim(),
        rows.len(),
        total_pages,
        images.len(),
        omitted.len(),
    );

    Ok(Composition {
        page_width: page.width,
        page_height: page.height,
        title: format!("Invoice {}", invoice.client_name.trim()),
        pages,
        images,
        omitted_images: omitted,
        totals,
    })
}

/// Export `invoice` as PDF bytes. Nothing is produced when the client name is blank.
pub fn export(
    invoice: &Invoice,
    branding: &Branding,
    options: &ExportOptions,
) -> Result<ExportedDocument, Error> {
    let t0 = std::time::Instant::now();
    let composition = compose(invoice, branding, options)?;
    let t_compose = t0.elapsed();

    let payload = import::embed_payload(invoice)?;
    let bytes = crate::pdf::render(&composition, &options.fonts, Some(payload.as_slice()))?;

    log::debug!(
        "Timing: compose={:.1}ms, render={:.1}ms (output {} bytes)",
        t_compose.as_secs_f64() * 1000.0,
        (t0.elapsed() - t_compose).as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(ExportedDocument {
        bytes,
        pages: composition.pages.len(),
        omitted_images: composition.omitted_images,
        totals: composition.totals,
    })
}
