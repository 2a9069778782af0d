use std::path::PathBuf;

use thiserror::Error;

use crate::layout::LayoutError;
use crate::session::InvoiceId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("a client name is required before the invoice can be exported")]
    ClientNameRequired,

    #[error("table layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("font error: {0}")]
    Font(String),

    #[error("no invoice with id {0} in this session")]
    UnknownInvoice(InvoiceId),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why an uploaded image was left out of a document.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("unsupported image format (only PNG and JPEG are accepted)")]
    Unsupported,

    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

/// A value handed to the currency formatter that is not a whole amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot read {input:?} as an amount")]
pub struct CoercionError {
    pub input: String,
}
