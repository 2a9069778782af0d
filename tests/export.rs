mod common;

use magazine_invoice::export::{
    self, COLUMN_LABELS, DrawCommand, FontWeight, HEADER_FILL, ImageRole, LOSS_FILL,
    PAYMENT_PLACEHOLDER, PROFIT_FILL, compose,
};
use magazine_invoice::{Branding, Error, ExportOptions, ImageError, ImageUpload, LineItem};

fn fills(pages: &[Vec<DrawCommand>], color: [u8; 3]) -> usize {
    pages
        .iter()
        .flatten()
        .filter(|c| matches!(c, DrawCommand::FillRect { color: fill, .. } if *fill == color))
        .count()
}

#[test]
fn blank_client_blocks_export() {
    let _ = env_logger::try_init();
    for name in ["", "   "] {
        let mut invoice = common::sample_invoice();
        invoice.client_name = name.to_string();
        let result = export::export(&invoice, &Branding::default(), &ExportOptions::default());
        assert!(matches!(result, Err(Error::ClientNameRequired)), "{name:?}");
        assert!(matches!(
            compose(&invoice, &Branding::default(), &ExportOptions::default()),
            Err(Error::ClientNameRequired)
        ));
    }
}

#[test]
fn document_structure() {
    let invoice = common::sample_invoice();
    let c = compose(&invoice, &Branding::default(), &ExportOptions::default()).unwrap();
    assert_eq!(c.pages.len(), 1);
    assert_eq!(c.title, "Invoice Acme Ltd");

    let bold: Vec<_> = c.texts(FontWeight::Bold).collect();
    assert_eq!(bold[0], "INVOICE: Revista Ejemplo");
    for label in COLUMN_LABELS {
        assert!(bold.contains(&label), "missing header {label}");
    }
    let totals_at = bold.iter().position(|t| *t == "TOTALS").unwrap();
    assert_eq!(&bold[totals_at + 1..], ["$2.500", "$2.100", "$400"]);

    let regular: Vec<_> = c.texts(FontWeight::Regular).collect();
    assert_eq!(regular[0], "CLIENT: Acme Ltd");
    assert_eq!(regular[1], "PAYMENT DATE: 2024-03-15");
    for cell in ["Full page advert", "$1.000", "$2.000", "$800", "$1.600", "$0"] {
        assert!(regular.contains(&cell), "missing cell {cell}");
    }
    assert!(regular.contains(&PAYMENT_PLACEHOLDER));
    assert_eq!(regular.last(), Some(&"Page 1 of 1"));
}

#[test]
fn blank_product_rows_are_not_exported() {
    let mut invoice = common::sample_invoice();
    invoice.push_row(LineItem::new("99", "").with_prices(10, 10_000, 1));
    let c = compose(&invoice, &Branding::default(), &ExportOptions::default()).unwrap();
    let regular: Vec<_> = c.texts(FontWeight::Regular).collect();
    assert!(!regular.contains(&"99"));
    assert!(!regular.contains(&"$10.000"));
    assert_eq!(c.totals.rows.len(), 2);
    assert_eq!(c.totals.catalog_sum, 2500);
    // Still editable.
    assert_eq!(invoice.line_items().len(), 3);
}

#[test]
fn shading_follows_profit_sign() {
    let invoice = common::sample_invoice();
    let c = compose(&invoice, &Branding::default(), &ExportOptions::default()).unwrap();
    // Two rows plus the totals cell, all non-negative.
    assert_eq!(fills(&c.pages, PROFIT_FILL), 3);
    assert_eq!(fills(&c.pages, LOSS_FILL), 0);
    // Eight header cells plus seven non-profit totals cells.
    assert_eq!(fills(&c.pages, HEADER_FILL), 15);

    let mut losing = common::sample_invoice();
    losing.push_row(LineItem::new("20", "Discounted insert").with_prices(2, 100, 700));
    let c = compose(&losing, &Branding::default(), &ExportOptions::default()).unwrap();
    assert_eq!(c.totals.profit_sum, -800);
    // The losing row and the negative totals cell.
    assert_eq!(fills(&c.pages, LOSS_FILL), 2);
    assert_eq!(fills(&c.pages, PROFIT_FILL), 2);
    assert!(c.texts(FontWeight::Bold).any(|t| t == "$-800"));
}

#[test]
fn long_tables_repeat_header_and_number_pages() {
    let invoice = common::invoice_with_rows(80);
    let c = compose(&invoice, &Branding::default(), &ExportOptions::default()).unwrap();
    let n = c.pages.len();
    assert!(n >= 2);

    let header_pages = c
        .pages
        .iter()
        .filter(|page| {
            page.iter().any(|cmd| {
                matches!(cmd, DrawCommand::Text { text, weight: FontWeight::Bold, .. } if text == "Product")
            })
        })
        .count();
    assert!(header_pages >= 2);

    for (i, page) in c.pages.iter().enumerate() {
        let footer = format!("Page {} of {}", i + 1, n);
        assert!(
            page.iter()
                .any(|cmd| matches!(cmd, DrawCommand::Text { text, .. } if *text == footer)),
            "page {} lacks its footer",
            i + 1
        );
    }
    let rows = c
        .texts(FontWeight::Regular)
        .filter(|t| t.starts_with("Product "))
        .count();
    assert_eq!(rows, 80);
}

#[test]
fn payment_block_stays_inside_the_page() {
    let options = ExportOptions::default();
    let mut branding = Branding::default();
    branding.payment_account = Some("  ES12 3456 7890  ".to_string());
    branding.payment_qr = Some(ImageUpload::new("qr.png", common::png_bytes(40, 40, false)));

    let bottom_limit = options.page.height - options.page.margin;
    for n in [1, 20, 38, 39, 40, 41, 42, 43, 44, 60, 90] {
        let invoice = common::invoice_with_rows(n);
        let c = compose(&invoice, &branding, &options).unwrap();
        let last = c.pages.last().unwrap();
        let qr = last
            .iter()
            .find_map(|cmd| match cmd {
                DrawCommand::Image {
                    role: ImageRole::PaymentQr,
                    x,
                    y,
                    width,
                    height,
                } => Some((*x, *y, *width, *height)),
                _ => None,
            })
            .expect("qr on last page");
        assert!(qr.1 + qr.3 <= bottom_limit, "{n} rows: qr bottom {}", qr.1 + qr.3);
        assert!(qr.0 + qr.2 < options.page.width - options.page.margin);
        assert!(last.iter().any(
            |cmd| matches!(cmd, DrawCommand::Text { text, .. } if text == "PAYMENT: ES12 3456 7890")
        ));
    }
}

#[test]
fn bad_images_are_omitted_and_reported() {
    let _ = env_logger::try_init();
    let mut truncated_png = common::png_bytes(30, 30, false);
    truncated_png.truncate(40);

    let branding = Branding {
        logo: Some(ImageUpload::new("logo.png", common::png_bytes(200, 100, true))),
        payment_logo: Some(ImageUpload::new("bank.gif", b"GIF89a not really".to_vec())),
        payment_qr: Some(ImageUpload::new("qr.png", truncated_png)),
        ..Branding::new("Revista Norte")
    };
    let doc = export::export(&common::sample_invoice(), &branding, &ExportOptions::default()).unwrap();

    assert_eq!(doc.omitted_images.len(), 2);
    let bank = &doc.omitted_images[0];
    assert_eq!(bank.role, ImageRole::PaymentLogo);
    assert_eq!(bank.name, "bank.gif");
    assert!(matches!(bank.error, ImageError::Unsupported));
    assert_eq!(doc.omitted_images[1].role, ImageRole::PaymentQr);
    assert!(matches!(doc.omitted_images[1].error, ImageError::Decode(_)));

    assert!(doc.bytes.starts_with(b"%PDF"));
    assert!(common::contains(&doc.bytes, b"/SMask"));
    assert_eq!(common::count(&doc.bytes, b"/Subtype /Image"), 2);
}

#[test]
fn missing_images_are_not_errors() {
    let doc = export::export(&common::sample_invoice(), &Branding::default(), &ExportOptions::default())
        .unwrap();
    assert!(doc.omitted_images.is_empty());
    assert!(!common::contains(&doc.bytes, b"/Subtype /Image"));
}

#[test]
fn logo_keeps_aspect_ratio() {
    let branding = Branding {
        logo: Some(ImageUpload::new("logo.jpg", common::jpeg_bytes(188, 47))),
        ..Branding::default()
    };
    let c = compose(&common::sample_invoice(), &branding, &ExportOptions::default()).unwrap();
    let (w, h) = c.pages[0]
        .iter()
        .find_map(|cmd| match cmd {
            DrawCommand::Image {
                role: ImageRole::Logo,
                width,
                height,
                ..
            } => Some((*width, *height)),
            _ => None,
        })
        .unwrap();
    assert!((w / h - 4.0).abs() < 1e-3);

    let doc = export::export(&common::sample_invoice(), &branding, &ExportOptions::default()).unwrap();
    assert!(common::contains(&doc.bytes, b"/DCTDecode"));
}

#[test]
fn pdf_metadata_and_payload() {
    let doc = export::export(&common::sample_invoice(), &Branding::default(), &ExportOptions::default())
        .unwrap();
    assert_eq!(doc.pages, 1);
    assert_eq!(doc.totals.profit_sum, 400);
    assert!(common::contains(&doc.bytes, b"Invoice Acme Ltd"));
    assert!(common::contains(&doc.bytes, b"magazine-invoice"));
    assert!(common::contains(&doc.bytes, b"/InvoiceData"));
    assert_eq!(common::count(&doc.bytes, b"INVOICE-DATA;base64,"), 1);
    assert!(common::contains(&doc.bytes, b"/Helvetica-Bold"));
}

#[test]
fn file_name_is_sanitized() {
    let mut invoice = common::sample_invoice();
    assert_eq!(export::suggested_file_name(&invoice), "Invoice_Acme_Ltd.pdf");
    invoice.client_name = " Díaz/Hijos ".to_string();
    assert_eq!(export::suggested_file_name(&invoice), "Invoice_Díaz_Hijos.pdf");
}
