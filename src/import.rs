//! Re-import of exported invoices.
//!
//! Exported PDFs carry the invoice as base64 JSON after [`PAYLOAD_MARKER`].
//! Documents without it (or plain extracted text) are scraped line by line.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::currency::parse_grouped;
use crate::error::Error;
use crate::model::{Invoice, LineItem, today};

pub const PAYLOAD_MARKER: &str = "INVOICE-DATA;base64,";
pub const FALLBACK_CLIENT: &str = "Imported invoice";

static CLIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)CLIENT:[ \t]*(.*?)[ \t]*(?:PAYMENT DATE:|$)").expect("client pattern")
});
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PAYMENT DATE:\s*(\d{4}-\d{2}-\d{2})").expect("date pattern")
});
static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    let amount = r"\$(-?[\d.]+)";
    Regex::new(&format!(
        r"^\s*(?:(\S*\d\S*)\s+)?(.+?)\s+(\d+)\s+{amount}\s+{amount}\s+{amount}\s+{amount}(?:\s+{amount})?\s*$"
    ))
    .expect("row pattern")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportSource {
    /// Structured data embedded at export time.
    Embedded,
    /// Scraped from document text.
    Text,
    /// Nothing usable; a blank invoice was produced.
    Fallback,
}

/// Informational notes about an import. None of them stop the import.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    #[error("no invoice data recognized; created a blank invoice")]
    NothingRecognized,
    #[error("embedded invoice data is present but unreadable")]
    UnreadableEmbeddedData,
    #[error("no client name found")]
    MissingClient,
    #[error("no payment date found; using today")]
    MissingPaymentDate,
    #[error("payment date {0:?} is not a valid date; using today")]
    InvalidPaymentDate(String),
    #[error("line {line}: amounts do not parse")]
    UnreadableRow { line: usize },
    #[error("line {line}: listed profit {listed} differs from computed {computed}")]
    ProfitMismatch {
        line: usize,
        listed: i64,
        computed: i64,
    },
}

#[derive(Debug)]
pub struct ImportReport {
    pub invoice: Invoice,
    pub source: ImportSource,
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    fn fallback(mut warnings: Vec<ImportWarning>) -> Self {
        warnings.push(ImportWarning::NothingRecognized);
        let mut invoice = Invoice::new(today());
        invoice.client_name = FALLBACK_CLIENT.to_string();
        ImportReport {
            invoice,
            source: ImportSource::Fallback,
            warnings,
        }
    }
}

/// Marker followed by the base64 encoded JSON of `invoice`.
pub fn embed_payload(invoice: &Invoice) -> Result<Vec<u8>, Error> {
    let json = serde_json::to_vec(invoice)?;
    let mut out = PAYLOAD_MARKER.as_bytes().to_vec();
    out.extend_from_slice(STANDARD.encode(json).as_bytes());
    Ok(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')
}

fn decode_embedded(bytes: &[u8]) -> Result<Option<Invoice>, ()> {
    let Some(start) = find(bytes, PAYLOAD_MARKER.as_bytes()) else {
        return Ok(None);
    };
    let rest = &bytes[start + PAYLOAD_MARKER.len()..];
    let end = rest
        .iter()
        .position(|&b| !is_base64_byte(b))
        .unwrap_or(rest.len());
    let json = STANDARD.decode(&rest[..end]).map_err(|e| {
        log::debug!("embedded invoice data is not base64: {e}");
    })?;
    let invoice = serde_json::from_slice(&json).map_err(|e| {
        log::debug!("embedded invoice data is not an invoice: {e}");
    })?;
    Ok(Some(invoice))
}

/// The invoice embedded by [`embed_payload`], if `bytes` contains a readable one.
pub fn extract_embedded(bytes: &[u8]) -> Option<Invoice> {
    decode_embedded(bytes).ok().flatten()
}

/// Scrape an invoice from document text.
///
/// A row's leading token is its page ref only when it contains a digit.
pub fn parse_text(text: &str) -> ImportReport {
    let mut warnings = Vec::new();

    let client = CLIENT_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|c| !c.is_empty());

    let date = match DATE_RE.captures(text) {
        Some(c) => match NaiveDate::parse_from_str(&c[1], "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                warnings.push(ImportWarning::InvalidPaymentDate(c[1].to_string()));
                None
            }
        },
        None => None,
    };

    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let Some(caps) = ROW_RE.captures(line) else {
            continue;
        };
        let amounts: Option<Vec<i64>> = (4..=8)
            .filter_map(|i| caps.get(i))
            .map(|m| parse_grouped(m.as_str()))
            .collect();
        let (Some(amounts), Ok(quantity)) = (amounts, caps[3].parse::<i64>()) else {
            warnings.push(ImportWarning::UnreadableRow { line: line_no });
            continue;
        };

        let page_ref = caps.get(1).map_or("", |m| m.as_str());
        let item = LineItem::new(page_ref, caps[2].trim()).with_prices(quantity, amounts[0], amounts[2]);
        let computed = item.quantity() * (item.catalog_unit_price() - item.list_unit_price());
        if let Some(&listed) = amounts.get(4)
            && listed != computed
        {
            warnings.push(ImportWarning::ProfitMismatch {
                line: line_no,
                listed,
                computed,
            });
        }
        items.push(item);
    }

    if client.is_none() && date.is_none() && items.is_empty() {
        return ImportReport::fallback(warnings);
    }
    if client.is_none() {
        warnings.push(ImportWarning::MissingClient);
    }
    if date.is_none() && !warnings.iter().any(|w| matches!(w, ImportWarning::InvalidPaymentDate(_))) {
        warnings.push(ImportWarning::MissingPaymentDate);
    }

    log::info!("scraped {} rows from text ({} warnings)", items.len(), warnings.len());
    ImportReport {
        invoice: Invoice::from_parts(
            client.unwrap_or_else(|| FALLBACK_CLIENT.to_string()),
            date.unwrap_or_else(today),
            items,
        ),
        source: ImportSource::Text,
        warnings,
    }
}

/// Import from an exported PDF or from extracted text. Never fails.
pub fn import_document(bytes: &[u8]) -> ImportReport {
    let mut warnings = Vec::new();
    match decode_embedded(bytes) {
        Ok(Some(invoice)) => {
            log::info!("imported embedded invoice for {:?}", invoice.client_name);
            return ImportReport {
                invoice,
                source: ImportSource::Embedded,
                warnings,
            };
        }
        Ok(None) => {}
        Err(()) => warnings.push(ImportWarning::UnreadableEmbeddedData),
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let mut report = parse_text(text);
            warnings.append(&mut report.warnings);
            report.warnings = warnings;
            report
        }
        Err(_) => {
            log::warn!("document has no embedded invoice and is not text; creating a blank invoice");
            ImportReport::fallback(warnings)
        }
    }
}
