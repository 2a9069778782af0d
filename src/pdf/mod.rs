use std::collections::{HashMap, HashSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Error;
use crate::export::{Composition, DrawCommand, FontWeight, ImageRole, Rgb};
use crate::fonts::{FontEntry, FontSet};
use crate::images::{PixelData, PreparedImage};

/// Catalog key of the stream carrying the embedded invoice data.
pub const PAYLOAD_KEY: &[u8] = b"InvoiceData";
pub const CREATOR: &str = "magazine-invoice";

struct RegisteredFont<'a> {
    entry: &'a FontEntry,
    font_ref: Ref,
    char_to_gid: Option<HashMap<char, u16>>,
}

fn used_chars(composition: &Composition, weight: FontWeight) -> HashSet<char> {
    composition
        .texts(weight)
        .flat_map(str::chars)
        .collect()
}

fn set_fill(content: &mut Content, color: Rgb) {
    content.set_fill_rgb(
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
    );
}

fn embed_image(
    pdf: &mut Pdf,
    img: &PreparedImage,
    alloc: &mut impl FnMut() -> Ref,
) -> Ref {
    let xobj_ref = alloc();
    let (w, h) = (img.pixel_width as i32, img.pixel_height as i32);
    match &img.pixels {
        PixelData::Dct { data, gray } => {
            let mut xobj = pdf.image_xobject(xobj_ref, data);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            if *gray {
                xobj.color_space().device_gray();
            } else {
                xobj.color_space().device_rgb();
            }
            xobj.bits_per_component(8);
        }
        PixelData::Flate { rgb, alpha } => {
            let smask_ref = alpha.as_ref().map(|alpha| {
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w);
                mask.height(h);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask_ref
            });

            let mut xobj = pdf.image_xobject(xobj_ref, rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    xobj_ref
}

fn draw_page(
    content: &mut Content,
    commands: &[DrawCommand],
    page_height: f32,
    regular: &RegisteredFont,
    bold: &RegisteredFont,
    image_names: &HashMap<ImageRole, String>,
) {
    for cmd in commands {
        match cmd {
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => {
                content.save_state();
                set_fill(content, *color);
                content.rect(*x, page_height - y - height, *width, *height);
                content.fill_nonzero();
                content.restore_state();
            }
            DrawCommand::StrokeRect {
                x,
                y,
                width,
                height,
                line_width,
            } => {
                content.save_state();
                content.set_line_width(*line_width);
                content.set_stroke_rgb(0.0, 0.0, 0.0);
                content.rect(*x, page_height - y - height, *width, *height);
                content.stroke();
                content.restore_state();
            }
            DrawCommand::Text {
                x,
                baseline,
                text,
                weight,
                size,
            } => {
                let font = match weight {
                    FontWeight::Regular => regular,
                    FontWeight::Bold => bold,
                };
                let bytes = font.entry.encode(text, font.char_to_gid.as_ref());
                content.set_fill_rgb(0.0, 0.0, 0.0);
                content
                    .begin_text()
                    .set_font(Name(font.entry.pdf_name.as_bytes()), *size)
                    .next_line(*x, page_height - baseline)
                    .show(Str(&bytes))
                    .end_text();
            }
            DrawCommand::Image {
                role,
                x,
                y,
                width,
                height,
            } => {
                let Some(name) = image_names.get(role) else {
                    log::debug!("no XObject for {role:?}; skipping");
                    continue;
                };
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, page_height - y - height]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
        }
    }
}

/// Serialize a composition. `payload` is stored uncompressed and linked from the catalog.
pub fn render(
    composition: &Composition,
    fonts: &FontSet,
    payload: Option<&[u8]>,
) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: fonts
    let regular_ref = alloc();
    let regular = RegisteredFont {
        entry: &fonts.regular,
        font_ref: regular_ref,
        char_to_gid: fonts.regular.register(
            &mut pdf,
            regular_ref,
            &mut alloc,
            &used_chars(composition, FontWeight::Regular),
        ),
    };
    let bold_ref = alloc();
    let bold = RegisteredFont {
        entry: &fonts.bold,
        font_ref: bold_ref,
        char_to_gid: fonts.bold.register(
            &mut pdf,
            bold_ref,
            &mut alloc,
            &used_chars(composition, FontWeight::Bold),
        ),
    };
    let t_fonts = t0.elapsed();

    // Phase 2: images
    let mut image_names: HashMap<ImageRole, String> = HashMap::new();
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    for (role, img) in &composition.images {
        let xobj_ref = embed_image(&mut pdf, img, &mut alloc);
        let name = format!("Im{}", image_xobjects.len() + 1);
        image_names.insert(*role, name.clone());
        image_xobjects.push((name, xobj_ref));
    }
    let t_images = t0.elapsed();

    // Phase 3: page content
    let n = composition.pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    for (i, commands) in composition.pages.iter().enumerate() {
        let mut content = Content::new();
        draw_page(
            &mut content,
            commands,
            composition.page_height,
            &regular,
            &bold,
            &image_names,
        );
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }
    let t_content = t0.elapsed();

    // Phase 4: document structure
    let payload_ref = payload.map(|data| {
        let r = alloc();
        pdf.stream(r, data);
        r
    });

    {
        let mut catalog = pdf.catalog(catalog_id);
        catalog.pages(pages_id);
        if let Some(r) = payload_ref {
            catalog.pair(Name(PAYLOAD_KEY), r);
        }
    }
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);
    pdf.document_info(info_id)
        .title(TextStr(&composition.title))
        .creator(TextStr(CREATOR));

    let font_pairs = [
        (regular.entry.pdf_name.as_str(), regular.font_ref),
        (bold.entry.pdf_name.as_str(), bold.font_ref),
    ];
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, composition.page_width, composition.page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_pairs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    log::debug!(
        "Render phases: fonts={:.1}ms, images={:.1}ms, content={:.1}ms, assembly={:.1}ms",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_content - t_images).as_secs_f64() * 1000.0,
        (t0.elapsed() - t_content).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}
