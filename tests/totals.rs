mod common;

use magazine_invoice::currency::format;
use magazine_invoice::model::{MAX_QUANTITY, MAX_UNIT_PRICE};
use magazine_invoice::totals::{self, RowTotals};
use magazine_invoice::{Invoice, LineItem};

#[test]
fn row_totals_are_exact() {
    let cases = [
        (1, 0, 0),
        (3, 1999, 2001),
        (7, 123_456_789, 98_765_432),
        (MAX_QUANTITY, MAX_UNIT_PRICE, 0),
        (MAX_QUANTITY, 0, MAX_UNIT_PRICE),
    ];
    for (q, cat, list) in cases {
        let item = LineItem::new("1", "x").with_prices(q, cat, list);
        let t = RowTotals::of(&item);
        assert_eq!(t.catalog_total, q * cat);
        assert_eq!(t.list_total, q * list);
        assert_eq!(t.profit, t.catalog_total - t.list_total);
    }
}

#[test]
fn negative_profit_is_kept() {
    let item = LineItem::new("3", "Loss leader").with_prices(3, 100, 250);
    let t = RowTotals::of(&item);
    assert_eq!(t.profit, -450);
    assert!(totals::compute([&item]).profit_is_negative());
}

#[test]
fn empty_input_sums_to_zero() {
    let t = totals::compute(std::iter::empty());
    assert!(t.rows.is_empty());
    assert_eq!((t.catalog_sum, t.list_sum, t.profit_sum), (0, 0, 0));
}

#[test]
fn sums_match_rows() {
    let invoice = common::invoice_with_rows(25);
    let t = totals::compute(invoice.line_items());
    assert_eq!(t.rows.len(), 25);
    assert_eq!(t.catalog_sum, t.rows.iter().map(|r| i128::from(r.catalog_total)).sum::<i128>());
    assert_eq!(t.list_sum, t.rows.iter().map(|r| i128::from(r.list_total)).sum::<i128>());
    assert_eq!(t.profit_sum, t.rows.iter().map(|r| i128::from(r.profit)).sum::<i128>());
}

#[test]
fn sums_at_the_clamp_bounds_do_not_overflow() {
    let rich = LineItem::new("1", "Max").with_prices(MAX_QUANTITY, MAX_UNIT_PRICE, 0);
    let poor = LineItem::new("2", "Min").with_prices(MAX_QUANTITY, 0, MAX_UNIT_PRICE);
    let rows: Vec<_> = std::iter::repeat_n(rich, 200)
        .chain(std::iter::repeat_n(poor, 300))
        .collect();
    let t = totals::compute(&rows);

    let row_max = i128::from(MAX_QUANTITY) * i128::from(MAX_UNIT_PRICE);
    assert_eq!(t.catalog_sum, 200 * row_max);
    assert_eq!(t.list_sum, 300 * row_max);
    assert_eq!(t.profit_sum, -100 * row_max);
    assert!(t.profit_sum < i128::from(i64::MIN));
    assert_eq!(format(t.catalog_sum), "20.000.000.000.000.000.000");
}

#[test]
fn scenario_sample_invoice_totals() {
    let invoice = common::sample_invoice();
    let t = totals::compute(invoice.exportable_items());
    assert_eq!(t.catalog_sum, 2500);
    assert_eq!(t.list_sum, 2100);
    assert_eq!(t.profit_sum, 400);
    assert_eq!(format(t.catalog_sum), "2.500");
    assert_eq!(format(t.list_sum), "2.100");
    assert_eq!(format(t.profit_sum), "400");
}

#[test]
fn blank_rows_are_excluded_from_sums() {
    let mut invoice = common::sample_invoice();
    invoice.push_row(LineItem::new("99", "   ").with_prices(10, 10_000, 1));
    assert_eq!(invoice.line_items().len(), 3);

    let t = totals::compute(invoice.exportable_items());
    assert_eq!(t.rows.len(), 2);
    assert_eq!(t.catalog_sum, 2500);
}

#[test]
fn removing_last_row_leaves_default_row() {
    let mut invoice = Invoice::from_parts(
        "Client",
        common::date(2024, 5, 1),
        vec![LineItem::new("1", "Only").with_prices(4, 10, 5)],
    );
    let removed = invoice.remove_last_row();
    assert_eq!(removed.map(|r| r.product_name), Some("Only".to_string()));
    assert_eq!(invoice.line_items().len(), 1);
    assert_eq!(invoice.line_items()[0], LineItem::default());

    // And again: still exactly one row.
    invoice.remove_row(0);
    assert_eq!(invoice.line_items().len(), 1);
    assert!(invoice.remove_row(5).is_none());
}

#[test]
fn edits_are_clamped() {
    let mut item = LineItem::default();
    assert_eq!(item.quantity(), 1);
    item.set_quantity(0);
    assert_eq!(item.quantity(), 1);
    item.set_quantity(-7);
    assert_eq!(item.quantity(), 1);
    item.set_quantity(MAX_QUANTITY + 1);
    assert_eq!(item.quantity(), MAX_QUANTITY);
    item.set_catalog_unit_price(-5);
    assert_eq!(item.catalog_unit_price(), 0);
    item.set_list_unit_price(i64::MAX);
    assert_eq!(item.list_unit_price(), MAX_UNIT_PRICE);
}

#[test]
fn json_input_goes_through_the_clamps() {
    let json = r#"{
        "client_name": "Json Co",
        "payment_date": "2024-02-29",
        "line_items": [
            {"page_ref": "1", "product_name": "Bad", "quantity": 0, "catalog_unit_price": -3, "list_unit_price": 7}
        ]
    }"#;
    let invoice: Invoice = serde_json::from_str(json).unwrap();
    let row = &invoice.line_items()[0];
    assert_eq!(row.quantity(), 1);
    assert_eq!(row.catalog_unit_price(), 0);
    assert_eq!(row.list_unit_price(), 7);

    let empty: Invoice = serde_json::from_str(r#"{"client_name": "X", "line_items": []}"#).unwrap();
    assert_eq!(empty.line_items().len(), 1);
}
