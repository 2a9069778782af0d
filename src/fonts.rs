use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use subsetter::GlyphRemapper;
use ttf_parser::Face;

use crate::error::Error;
use crate::layout::TextMeasure;

enum FontSource {
    /// One of the standard 14 fonts; referenced by name, never embedded.
    Builtin(&'static str),
    TrueType(TrueTypeFont),
}

/// A loaded font file, kept whole until render time subsets it.
struct TrueTypeFont {
    family: String,
    data: Vec<u8>,
    metrics: FaceMetrics,
}

/// Face-wide metrics in 1000-unit glyph space.
#[derive(Clone, Copy, Debug)]
struct FaceMetrics {
    units_per_em: f32,
    ascent: f32,
    descent: f32,
    line_gap: f32,
    cap_height: f32,
    bbox: Rect,
}

impl FaceMetrics {
    fn of(face: &Face) -> Self {
        let units_per_em = face.units_per_em() as f32;
        let scale = |v: i16| v as f32 / units_per_em * 1000.0;
        let bb = face.global_bounding_box();
        FaceMetrics {
            units_per_em,
            ascent: scale(face.ascender()),
            descent: scale(face.descender()),
            line_gap: scale(face.line_gap()),
            cap_height: face.capital_height().map_or(700.0, scale),
            bbox: Rect::new(scale(bb.x_min), scale(bb.y_min), scale(bb.x_max), scale(bb.y_max)),
        }
    }

    /// Horizontal advance of `ch` in 1000-units, if the face has a glyph for it.
    fn advance(&self, face: &Face, ch: char) -> Option<f32> {
        let gid = face.glyph_index(ch)?;
        let adv = face.glyph_hor_advance(gid)?;
        Some(adv as f32 / self.units_per_em * 1000.0)
    }
}

pub struct FontEntry {
    pub(crate) pdf_name: String,
    widths_1000: Vec<f32>,
    line_h_ratio: Option<f32>,
    ascender_ratio: Option<f32>,
    source: FontSource,
}

impl FontEntry {
    pub fn helvetica(pdf_name: impl Into<String>) -> Self {
        FontEntry::builtin(pdf_name, "Helvetica", helvetica_widths())
    }

    pub fn helvetica_bold(pdf_name: impl Into<String>) -> Self {
        FontEntry::builtin(pdf_name, "Helvetica-Bold", helvetica_bold_widths())
    }

    fn builtin(pdf_name: impl Into<String>, base: &'static str, widths_1000: Vec<f32>) -> Self {
        FontEntry {
            pdf_name: pdf_name.into(),
            widths_1000,
            line_h_ratio: None,
            ascender_ratio: None,
            source: FontSource::Builtin(base),
        }
    }

    /// Load a TrueType/OpenType file for measurement; it is embedded (subsetted) at render time.
    pub fn load_truetype(path: &Path, pdf_name: impl Into<String>) -> Result<Self, Error> {
        let t0 = Instant::now();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let face = Face::parse(&data, 0)
            .map_err(|e| Error::Font(format!("{}: {e}", path.display())))?;

        let metrics = FaceMetrics::of(&face);
        let widths_1000 = (32u8..=255u8)
            .map(|byte| metrics.advance(&face, winansi_to_char(byte)).unwrap_or(0.0))
            .collect();
        let family = font_family_name(&face)
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "Embedded".to_string());
        drop(face);

        log::debug!(
            "load_truetype: {} ({family}) in {:.1}ms",
            path.display(),
            t0.elapsed().as_secs_f64() * 1000.0,
        );

        Ok(FontEntry {
            pdf_name: pdf_name.into(),
            widths_1000,
            line_h_ratio: Some((metrics.ascent - metrics.descent + metrics.line_gap) / 1000.0),
            ascender_ratio: Some(metrics.ascent / 1000.0),
            source: FontSource::TrueType(TrueTypeFont {
                family,
                data,
                metrics,
            }),
        })
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.source, FontSource::TrueType(_))
    }

    /// Width of a single character in 1000-units. WinAnsi chars use the
    /// precomputed table; other chars are looked up in the TrueType face.
    pub(crate) fn char_width_1000(&self, ch: char) -> f32 {
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            return self.widths_1000[(byte - 32) as usize];
        }
        match &self.source {
            FontSource::TrueType(font) => Face::parse(&font.data, 0)
                .ok()
                .and_then(|face| font.metrics.advance(&face, ch))
                .unwrap_or(0.0),
            FontSource::Builtin(_) => 0.0,
        }
    }

    pub(crate) fn word_width(&self, word: &str, font_size: f32) -> f32 {
        word.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub(crate) fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_h_ratio.unwrap_or(1.2)
    }

    pub(crate) fn ascent(&self, font_size: f32) -> f32 {
        font_size * self.ascender_ratio.unwrap_or(0.75)
    }

    /// Encode text for a content stream `Tj`.
    pub(crate) fn encode(&self, text: &str, char_to_gid: Option<&HashMap<char, u16>>) -> Vec<u8> {
        match char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }

    /// Write the font objects into `pdf`. Returns the glyph map for embedded fonts.
    pub(crate) fn register(
        &self,
        pdf: &mut Pdf,
        font_ref: Ref,
        alloc: &mut impl FnMut() -> Ref,
        used_chars: &HashSet<char>,
    ) -> Option<HashMap<char, u16>> {
        let t0 = Instant::now();
        let embedded = match &self.source {
            FontSource::TrueType(font) => match font.embed(pdf, font_ref, alloc, used_chars) {
                Ok(map) => Some(map),
                Err(reason) => {
                    log::warn!("embedding {} failed ({reason}); using Helvetica", font.family);
                    write_type1(pdf, font_ref, "Helvetica");
                    None
                }
            },
            FontSource::Builtin(base) => {
                write_type1(pdf, font_ref, base);
                None
            }
        };
        log::debug!(
            "register_font: {} in {:.1}ms",
            self.pdf_name,
            t0.elapsed().as_secs_f64() * 1000.0,
        );
        embedded
    }
}

fn write_type1(pdf: &mut Pdf, font_ref: Ref, base: &str) {
    pdf.type1_font(font_ref)
        .base_font(Name(base.as_bytes()))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
}

/// A font at a fixed size; what the table layout measures with.
#[derive(Clone, Copy)]
pub struct SizedFont<'a> {
    pub font: &'a FontEntry,
    pub size: f32,
}

impl TextMeasure for SizedFont<'_> {
    fn text_width(&self, text: &str) -> f32 {
        self.font.word_width(text, self.size)
    }
}

/// The regular and bold faces used by an exported document.
pub struct FontSet {
    pub regular: FontEntry,
    pub bold: FontEntry,
}

impl Default for FontSet {
    fn default() -> Self {
        FontSet::builtin()
    }
}

impl FontSet {
    pub fn builtin() -> Self {
        FontSet {
            regular: FontEntry::helvetica("F1"),
            bold: FontEntry::helvetica_bold("F2"),
        }
    }

    /// Load TrueType faces. Without a bold file the regular face is loaded twice
    /// so headings stay in the same family.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> Result<Self, Error> {
        let Some(regular_path) = regular else {
            if bold.is_some() {
                log::warn!("bold font configured without a regular font; ignoring it");
            }
            return Ok(FontSet::builtin());
        };
        let regular = FontEntry::load_truetype(regular_path, "F1")?;
        let bold = FontEntry::load_truetype(bold.unwrap_or(regular_path), "F2")?;
        Ok(FontSet { regular, bold })
    }
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

/// Windows-1252 (WinAnsi) byte to Unicode char mapping.
/// Bytes 0x80-0x9F are remapped; all others map directly to their Unicode codepoint.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F | 0x00A0..=0x00FF => c as u8,
        _ => (0x80u8..=0x9F)
            .find(|&byte| winansi_to_char(byte) == c && byte as u32 != c as u32)
            .unwrap_or(0),
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes for PDF Str encoding.
/// Unmappable characters are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .filter_map(|c| match char_to_winansi(c) {
            0 => None,
            b => Some(b),
        })
        .collect()
}

/// Two big-endian bytes per char for an Identity-H CIDFont. Chars outside the
/// subset become glyph 0.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    text.chars()
        .flat_map(|ch| char_to_gid.get(&ch).copied().unwrap_or(0).to_be_bytes())
        .collect()
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,                          // space
            33..=47 => 333.0,                     // punctuation
            48..=57 => 556.0,                     // digits
            58..=64 => 333.0,                     // more punctuation
            73 | 74 => 278.0,                     // I J (narrow uppercase)
            77 => 833.0,                          // M (wide)
            65..=90 => 667.0,                     // uppercase A-Z (average)
            91..=96 => 333.0,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
            109 | 119 => 833.0,                   // m w (wide)
            97..=122 => 556.0,                    // lowercase a-z (average)
            0x85 => 1000.0,                       // ellipsis
            _ => 556.0,
        })
        .collect()
}

/// Approximate Helvetica-Bold widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_bold_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278.0,
            33..=47 => 333.0,
            48..=57 => 556.0,
            58..=64 => 333.0,
            73 => 278.0,
            74 => 556.0,
            77 => 833.0,
            87 => 944.0,                    // W
            65..=90 => 722.0,
            91..=96 => 333.0,
            105 | 106 | 108 => 278.0,      // i j l
            102 | 116 => 333.0,            // f t
            109 => 889.0,                  // m
            119 => 778.0,                  // w
            97..=122 => 611.0,
            0x85 => 1000.0,
            _ => 611.0,
        })
        .collect()
}

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

/// The glyphs a document uses, renumbered densely for the subset.
struct GlyphSubset {
    remapper: GlyphRemapper,
    char_to_gid: HashMap<char, u16>,
    /// Subset glyph id to advance in 1000-units.
    widths: BTreeMap<u16, f32>,
}

impl GlyphSubset {
    fn collect(face: &Face, metrics: &FaceMetrics, used_chars: &HashSet<char>) -> Self {
        // Sorted so subset glyph ids are stable between runs.
        let mut chars: Vec<char> = used_chars.iter().copied().collect();
        chars.sort_unstable();

        let mut remapper = GlyphRemapper::new();
        let mut char_to_gid = HashMap::with_capacity(chars.len());
        let mut widths = BTreeMap::new();
        for ch in chars {
            let Some(gid) = face.glyph_index(ch) else {
                log::debug!("no glyph for {ch:?}");
                continue;
            };
            let new_gid = remapper.remap(gid.0);
            char_to_gid.insert(ch, new_gid);
            if let Some(width) = metrics.advance(face, ch) {
                widths.insert(new_gid, width);
            }
        }
        GlyphSubset {
            remapper,
            char_to_gid,
            widths,
        }
    }
}

impl TrueTypeFont {
    /// Write a subsetted Type0 font (CIDFontType2, Identity-H) with a
    /// ToUnicode map. Returns the char to subset glyph id map for encoding.
    fn embed(
        &self,
        pdf: &mut Pdf,
        font_ref: Ref,
        alloc: &mut impl FnMut() -> Ref,
        used_chars: &HashSet<char>,
    ) -> Result<HashMap<char, u16>, String> {
        let face = Face::parse(&self.data, 0).map_err(|e| e.to_string())?;
        let subset = GlyphSubset::collect(&face, &self.metrics, used_chars);

        let program = subsetter::subset(&self.data, 0, &subset.remapper).unwrap_or_else(|e| {
            log::warn!("subsetting {} failed ({e}); embedding the whole font", self.family);
            self.data.clone()
        });
        let program_len = i32::try_from(program.len())
            .map_err(|_| format!("font program of {} bytes is too large", program.len()))?;

        let base_font = self.family.replace(' ', "");
        let descriptor_ref = alloc();
        let program_ref = alloc();
        let cid_ref = alloc();
        let cmap_ref = alloc();

        pdf.stream(program_ref, &program)
            .pair(Name(b"Length1"), program_len);
        pdf.font_descriptor(descriptor_ref)
            .name(Name(base_font.as_bytes()))
            .flags(FontFlags::NON_SYMBOLIC)
            .bbox(self.metrics.bbox)
            .italic_angle(0.0)
            .ascent(self.metrics.ascent)
            .descent(self.metrics.descent)
            .cap_height(self.metrics.cap_height)
            .stem_v(80.0)
            .font_file2(program_ref);

        {
            let mut cid = pdf.cid_font(cid_ref);
            cid.subtype(CidFontType::Type2)
                .base_font(Name(base_font.as_bytes()))
                .system_info(identity_system_info())
                .font_descriptor(descriptor_ref)
                .default_width(0.0)
                .cid_to_gid_map_predefined(Name(b"Identity"));
            if !subset.widths.is_empty() {
                let mut w = cid.widths();
                for (&gid, &width) in &subset.widths {
                    w.consecutive(gid, [width]);
                }
            }
        }

        let cmap_name = format!("{base_font}-UTF16");
        let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), identity_system_info());
        for (&ch, &gid) in &subset.char_to_gid {
            cmap.pair(gid, ch);
        }
        let cmap_data = cmap.finish();
        pdf.stream(cmap_ref, cmap_data.as_slice());

        pdf.type0_font(font_ref)
            .base_font(Name(base_font.as_bytes()))
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_ref)
            .to_unicode(cmap_ref);

        log::debug!(
            "embedded {}: {} glyphs, {} of {} bytes",
            self.family,
            subset.char_to_gid.len(),
            program.len(),
            self.data.len()
        );
        Ok(subset.char_to_gid)
    }
}
