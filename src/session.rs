use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::export::{self, ExportOptions, ExportedDocument};
use crate::import::{self, ImportReport};
use crate::model::{Branding, Invoice, today};

/// Handle for an invoice within one [`InvoiceSession`]. Never reused after removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvoiceId(u64);

impl InvoiceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// All invoices being edited, plus the branding they share.
pub struct InvoiceSession {
    branding: Branding,
    invoices: BTreeMap<InvoiceId, Invoice>,
    next_id: u64,
}

impl Default for InvoiceSession {
    fn default() -> Self {
        InvoiceSession::new(Branding::default())
    }
}

impl InvoiceSession {
    pub fn new(branding: Branding) -> Self {
        InvoiceSession {
            branding,
            invoices: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Open a blank invoice dated today.
    pub fn new_invoice(&mut self) -> InvoiceId {
        self.insert(Invoice::new(today()))
    }

    pub fn insert(&mut self, invoice: Invoice) -> InvoiceId {
        let id = InvoiceId(self.next_id);
        self.next_id += 1;
        self.invoices.insert(id, invoice);
        log::debug!("session: opened invoice {id}");
        id
    }

    pub fn get(&self, id: InvoiceId) -> Option<&Invoice> {
        self.invoices.get(&id)
    }

    pub fn get_mut(&mut self, id: InvoiceId) -> Option<&mut Invoice> {
        self.invoices.get_mut(&id)
    }

    pub fn remove(&mut self, id: InvoiceId) -> Option<Invoice> {
        let removed = self.invoices.remove(&id);
        if removed.is_some() {
            log::debug!("session: closed invoice {id}");
        }
        removed
    }

    /// Ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = InvoiceId> + '_ {
        self.invoices.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    pub fn branding(&self) -> &Branding {
        &self.branding
    }

    pub fn set_branding(&mut self, branding: Branding) {
        self.branding = branding;
    }

    pub fn export(&self, id: InvoiceId, options: &ExportOptions) -> Result<ExportedDocument, Error> {
        let invoice = self.get(id).ok_or(Error::UnknownInvoice(id))?;
        export::export(invoice, &self.branding, options)
    }

    /// Import a document as a new invoice in this session.
    pub fn import(&mut self, bytes: &[u8]) -> (InvoiceId, ImportReport) {
        let report = import::import_document(bytes);
        let id = self.insert(report.invoice.clone());
        (id, report)
    }
}
