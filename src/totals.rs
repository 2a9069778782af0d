use crate::model::LineItem;

/// Derived amounts for one line item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowTotals {
    pub catalog_total: i64,
    pub list_total: i64,
    pub profit: i64,
}

impl RowTotals {
    pub fn of(item: &LineItem) -> Self {
        let catalog_total = item.quantity() * item.catalog_unit_price();
        let list_total = item.quantity() * item.list_unit_price();
        RowTotals {
            catalog_total,
            list_total,
            profit: catalog_total - list_total,
        }
    }
}

/// Per-row totals plus aggregate sums over the same rows.
///
/// A single row always fits `i64` under the edit clamps; the sums are `i128`
/// so no number of rows can overflow them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub rows: Vec<RowTotals>,
    pub catalog_sum: i128,
    pub list_sum: i128,
    pub profit_sum: i128,
}

impl Totals {
    pub fn profit_is_negative(&self) -> bool {
        self.profit_sum < 0
    }
}

/// Compute totals for `items` in order. Pure; safe to call on every edit.
pub fn compute<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Totals {
    let mut totals = Totals::default();
    for item in items {
        let row = RowTotals::of(item);
        totals.catalog_sum += i128::from(row.catalog_total);
        totals.list_sum += i128::from(row.list_total);
        totals.profit_sum += i128::from(row.profit);
        totals.rows.push(row);
    }
    totals
}
