mod common;

use magazine_invoice::import::{
    FALLBACK_CLIENT, ImportSource, ImportWarning, embed_payload, extract_embedded, import_document,
    parse_text,
};
use magazine_invoice::{Branding, ExportOptions, LineItem, export};

const EXTRACTED: &str = "\
INVOICE: Revista Ejemplo
CLIENT: Acme Ltd PAYMENT DATE: 2024-03-15
Page Product Qty Unit-Catalog Total-Catalog Unit-List Total-List Profit
12 Full page advert 2 $1.000 $2.000 $800 $1.600 $400
14 Quarter page 1 $500 $500 $500 $500 $0
TOTALS $2.500 $2.100 $400
Payment details available on request
Page 1 of 1
";

#[test]
fn exported_pdf_round_trips() {
    let _ = env_logger::try_init();
    let mut invoice = common::sample_invoice();
    invoice.push_row(LineItem::new("", "   "));
    let doc = export(&invoice, &Branding::default(), &ExportOptions::default()).unwrap();

    let report = import_document(&doc.bytes);
    assert_eq!(report.source, ImportSource::Embedded);
    assert!(report.warnings.is_empty());
    // Blank rows survive the side channel; only the rendered table drops them.
    assert_eq!(report.invoice, invoice);
}

#[test]
fn payload_is_found_anywhere_in_the_bytes() {
    let invoice = common::sample_invoice();
    let mut bytes = b"%PDF-1.7\n1 0 obj\n<< /Length 10 >>\nstream\n".to_vec();
    bytes.extend(embed_payload(&invoice).unwrap());
    bytes.extend(b"\nendstream\nendobj\n");
    assert_eq!(extract_embedded(&bytes), Some(invoice));
    assert_eq!(extract_embedded(b"%PDF-1.7 nothing here"), None);
}

#[test]
fn text_scrape_recovers_rows() {
    let report = parse_text(EXTRACTED);
    assert_eq!(report.source, ImportSource::Text);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let invoice = report.invoice;
    assert_eq!(invoice.client_name, "Acme Ltd");
    assert_eq!(invoice.payment_date, common::date(2024, 3, 15));
    assert_eq!(invoice.line_items(), common::sample_invoice().line_items());
}

#[test]
fn text_scrape_accepts_four_amounts_and_negative_profit() {
    let text = "CLIENT: Norte SA\n\
                3 Back cover special 2 $100 $200 $700 $1.400 $-1.200\n\
                4 Insert 5 $10 $50 $1 $5\n";
    let report = parse_text(text);
    let rows = report.invoice.line_items();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].product_name, "Back cover special");
    assert_eq!(rows[0].quantity(), 2);
    assert_eq!(rows[0].list_unit_price(), 700);
    assert_eq!(rows[1].page_ref, "4");
    assert_eq!(rows[1].catalog_unit_price(), 10);
    assert_eq!(report.warnings, [ImportWarning::MissingPaymentDate]);
}

#[test]
fn inconsistent_profit_is_reported() {
    let text = "CLIENT: X PAYMENT DATE: 2024-01-01\n1 Ad 1 $100 $100 $40 $40 $99\n";
    let report = parse_text(text);
    assert_eq!(report.invoice.line_items().len(), 1);
    assert_eq!(
        report.warnings,
        [ImportWarning::ProfitMismatch {
            line: 2,
            listed: 99,
            computed: 60
        }]
    );
}

#[test]
fn unrecognized_input_falls_back_to_blank_invoice() {
    for input in [&b"just some notes"[..], &[0xff, 0xfe, 0x00, 0x81][..], &b""[..]] {
        let report = import_document(input);
        assert_eq!(report.source, ImportSource::Fallback);
        assert_eq!(report.invoice.client_name, FALLBACK_CLIENT);
        assert_eq!(report.invoice.line_items(), [LineItem::default()]);
        assert!(report.warnings.contains(&ImportWarning::NothingRecognized));
    }
}

#[test]
fn corrupt_payload_is_a_warning() {
    let bytes = b"INVOICE-DATA;base64,bm90IGpzb24=\nCLIENT: Still Here\n";
    let report = import_document(bytes);
    assert_eq!(report.source, ImportSource::Text);
    assert_eq!(report.invoice.client_name, "Still Here");
    assert_eq!(report.warnings[0], ImportWarning::UnreadableEmbeddedData);
}

#[test]
fn invalid_date_is_reported() {
    let report = parse_text("CLIENT: Y PAYMENT DATE: 2024-02-30\n");
    assert_eq!(report.invoice.client_name, "Y");
    assert_eq!(
        report.warnings,
        [ImportWarning::InvalidPaymentDate("2024-02-30".to_string())]
    );
}

#[test]
fn rows_without_client_or_page_ref() {
    let text = "Full page advert 2 $1.000 $2.000 $800 $1.600 $400\n\
                p7 Inside cover 1 $500 $500 $500 $500 $0\n";
    let report = parse_text(text);
    assert_eq!(report.source, ImportSource::Text);
    assert_eq!(report.invoice.client_name, FALLBACK_CLIENT);
    assert!(report.warnings.contains(&ImportWarning::MissingClient));

    let rows = report.invoice.line_items();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].page_ref, "");
    assert_eq!(rows[0].product_name, "Full page advert");
    assert_eq!(rows[0].catalog_unit_price(), 1000);
    assert_eq!(rows[1].page_ref, "p7");
    assert_eq!(rows[1].product_name, "Inside cover");
}
