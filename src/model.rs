use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Largest quantity accepted at the edit boundary.
pub const MAX_QUANTITY: i64 = 100_000;
/// Largest unit price accepted at the edit boundary.
/// With `MAX_QUANTITY` every row total stays exact in `i64`.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// One product row on an invoice.
///
/// Prices are whole currency units. Totals are never stored; see
/// [`crate::totals::RowTotals::of`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LineItemRecord")]
pub struct LineItem {
    pub page_ref: String,
    pub product_name: String,
    quantity: i64,
    catalog_unit_price: i64,
    list_unit_price: i64,
}

/// Unchecked wire shape of a [`LineItem`]; converted through the same clamps as the setters.
#[derive(Deserialize)]
#[serde(default)]
struct LineItemRecord {
    page_ref: String,
    product_name: String,
    quantity: i64,
    catalog_unit_price: i64,
    list_unit_price: i64,
}

impl Default for LineItemRecord {
    fn default() -> Self {
        LineItemRecord {
            page_ref: String::new(),
            product_name: String::new(),
            quantity: 1,
            catalog_unit_price: 0,
            list_unit_price: 0,
        }
    }
}

impl From<LineItemRecord> for LineItem {
    fn from(r: LineItemRecord) -> Self {
        let mut item = LineItem::new(r.page_ref, r.product_name);
        item.set_quantity(r.quantity);
        item.set_catalog_unit_price(r.catalog_unit_price);
        item.set_list_unit_price(r.list_unit_price);
        item
    }
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem {
            page_ref: String::new(),
            product_name: String::new(),
            quantity: 1,
            catalog_unit_price: 0,
            list_unit_price: 0,
        }
    }
}

fn clamp_price(value: i64) -> i64 {
    value.clamp(0, MAX_UNIT_PRICE)
}

impl LineItem {
    pub fn new(page_ref: impl Into<String>, product_name: impl Into<String>) -> Self {
        LineItem {
            page_ref: page_ref.into(),
            product_name: product_name.into(),
            ..LineItem::default()
        }
    }

    /// Builder-style helper used when the numbers are known up front.
    pub fn with_prices(mut self, quantity: i64, catalog_unit_price: i64, list_unit_price: i64) -> Self {
        self.set_quantity(quantity);
        self.set_catalog_unit_price(catalog_unit_price);
        self.set_list_unit_price(list_unit_price);
        self
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn catalog_unit_price(&self) -> i64 {
        self.catalog_unit_price
    }

    pub fn list_unit_price(&self) -> i64 {
        self.list_unit_price
    }

    /// Quantities below 1 are raised to 1.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity.clamp(1, MAX_QUANTITY);
    }

    /// Negative prices are clamped to 0.
    pub fn set_catalog_unit_price(&mut self, price: i64) {
        self.catalog_unit_price = clamp_price(price);
    }

    pub fn set_list_unit_price(&mut self, price: i64) {
        self.list_unit_price = clamp_price(price);
    }

    /// True when the row has no product name and is left out of exported documents.
    pub fn is_blank(&self) -> bool {
        self.product_name.trim().is_empty()
    }
}

/// One editable invoice. The row list is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InvoiceRecord")]
pub struct Invoice {
    pub client_name: String,
    pub payment_date: NaiveDate,
    line_items: Vec<LineItem>,
}

#[derive(Deserialize)]
struct InvoiceRecord {
    #[serde(default)]
    client_name: String,
    #[serde(default = "today")]
    payment_date: NaiveDate,
    #[serde(default)]
    line_items: Vec<LineItem>,
}

impl From<InvoiceRecord> for Invoice {
    fn from(r: InvoiceRecord) -> Self {
        Invoice::from_parts(r.client_name, r.payment_date, r.line_items)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl Default for Invoice {
    fn default() -> Self {
        Invoice::new(today())
    }
}

impl Invoice {
    /// A blank invoice with a single default row.
    pub fn new(payment_date: NaiveDate) -> Self {
        Invoice {
            client_name: String::new(),
            payment_date,
            line_items: vec![LineItem::default()],
        }
    }

    /// Assemble an invoice, inserting a default row when `line_items` is empty.
    pub fn from_parts(
        client_name: impl Into<String>,
        payment_date: NaiveDate,
        mut line_items: Vec<LineItem>,
    ) -> Self {
        if line_items.is_empty() {
            line_items.push(LineItem::default());
        }
        Invoice {
            client_name: client_name.into(),
            payment_date,
            line_items,
        }
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn row(&self, index: usize) -> Option<&LineItem> {
        self.line_items.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut LineItem> {
        self.line_items.get_mut(index)
    }

    /// Append a default row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.line_items.push(LineItem::default());
        self.line_items.len() - 1
    }

    /// Append a filled row and return its index.
    pub fn push_row(&mut self, item: LineItem) -> usize {
        self.line_items.push(item);
        self.line_items.len() - 1
    }

    /// Remove row `index`. Removing the only row leaves a fresh default row behind.
    pub fn remove_row(&mut self, index: usize) -> Option<LineItem> {
        if index >= self.line_items.len() {
            return None;
        }
        let removed = self.line_items.remove(index);
        if self.line_items.is_empty() {
            self.line_items.push(LineItem::default());
        }
        Some(removed)
    }

    pub fn remove_last_row(&mut self) -> Option<LineItem> {
        let last = self.line_items.len().checked_sub(1)?;
        self.remove_row(last)
    }

    /// Rows that appear in an exported document (non-blank product name), in order.
    pub fn exportable_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|item| !item.is_blank())
    }

    pub fn has_client(&self) -> bool {
        !self.client_name.trim().is_empty()
    }

    /// Title shown for the invoice while it is being edited.
    pub fn display_title(&self, ordinal: usize) -> String {
        if self.has_client() {
            self.client_name.trim().to_string()
        } else {
            format!("Invoice {ordinal}")
        }
    }
}

/// An uploaded image kept in memory until export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub name: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        ImageUpload {
            name: name.into(),
            data,
        }
    }
}

/// Session-wide branding and payment details shared by every invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branding {
    pub magazine_name: String,
    pub logo: Option<ImageUpload>,
    pub payment_account: Option<String>,
    pub payment_logo: Option<ImageUpload>,
    pub payment_qr: Option<ImageUpload>,
}

pub const DEFAULT_MAGAZINE_NAME: &str = "Revista Ejemplo";

impl Default for Branding {
    fn default() -> Self {
        Branding {
            magazine_name: DEFAULT_MAGAZINE_NAME.to_string(),
            logo: None,
            payment_account: None,
            payment_logo: None,
            payment_qr: None,
        }
    }
}

impl Branding {
    pub fn new(magazine_name: impl Into<String>) -> Self {
        Branding {
            magazine_name: magazine_name.into(),
            ..Branding::default()
        }
    }

    /// Payment account text, `None` when unset or blank.
    pub fn payment_account(&self) -> Option<&str> {
        self.payment_account
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
