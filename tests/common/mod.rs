#![allow(dead_code)]

use std::io::Cursor;

use chrono::NaiveDate;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use magazine_invoice::{Invoice, LineItem};

/// Every character is `advance` points wide.
pub fn fixed_measure(advance: f32) -> impl Fn(&str) -> f32 {
    move |s: &str| s.chars().count() as f32 * advance
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Two priced rows: 2 x 1000/800 and 1 x 500/500.
pub fn sample_invoice() -> Invoice {
    Invoice::from_parts(
        "Acme Ltd",
        date(2024, 3, 15),
        vec![
            LineItem::new("12", "Full page advert").with_prices(2, 1000, 800),
            LineItem::new("14", "Quarter page").with_prices(1, 500, 500),
        ],
    )
}

pub fn invoice_with_rows(n: usize) -> Invoice {
    let items = (0..n)
        .map(|i| LineItem::new(format!("{}", i + 1), format!("Product {i}")).with_prices(1, 100, 50))
        .collect();
    Invoice::from_parts("Bulk Client", date(2024, 1, 2), items)
}

pub fn png_bytes(width: u32, height: u32, translucent: bool) -> Vec<u8> {
    let img = RgbaImage::from_pixel(
        width,
        height,
        Rgba([30, 120, 200, if translucent { 128 } else { 255 }]),
    );
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).expect("encode jpeg");
    out.into_inner()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
