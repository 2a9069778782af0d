pub mod config;
pub mod currency;
mod error;
pub mod export;
pub mod fonts;
pub mod images;
pub mod import;
pub mod layout;
pub mod model;
mod pdf;
pub mod session;
pub mod totals;

pub use error::{CoercionError, Error, ImageError};
pub use export::{ExportOptions, ExportedDocument, export, suggested_file_name};
pub use import::{ImportReport, ImportSource, ImportWarning, import_document};
pub use model::{Branding, ImageUpload, Invoice, LineItem};
pub use pdf::PAYLOAD_KEY;
pub use session::{InvoiceId, InvoiceSession};

use std::path::Path;
use std::time::Instant;

/// Export `invoice` and write it to `output`.
pub fn export_invoice_to_file(
    invoice: &Invoice,
    branding: &Branding,
    options: &ExportOptions,
    output: &Path,
) -> Result<ExportedDocument, Error> {
    let t0 = Instant::now();

    let doc = export::export(invoice, branding, options)?;
    let t_export = t0.elapsed();

    std::fs::write(output, &doc.bytes).map_err(|e| Error::io(output, e))?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: export={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes, {} pages)",
        t_export.as_secs_f64() * 1000.0,
        (t_total - t_export).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        doc.bytes.len(),
        doc.pages,
    );

    Ok(doc)
}

/// Read an invoice from a JSON file.
pub fn read_invoice(path: &Path) -> Result<Invoice, Error> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Import an exported PDF or extracted text file.
pub fn import_file(path: &Path) -> Result<ImportReport, Error> {
    let t0 = Instant::now();
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let report = import::import_document(&bytes);
    log::info!(
        "Timing: import={:.1}ms ({:?}, {} warnings)",
        t0.elapsed().as_secs_f64() * 1000.0,
        report.source,
        report.warnings.len(),
    );
    Ok(report)
}
