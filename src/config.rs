use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::export::ExportOptions;
use crate::fonts::FontSet;
use crate::model::{Branding, DEFAULT_MAGAZINE_NAME, ImageUpload};

/// Overrides the regular TrueType font path.
pub const FONT_ENV: &str = "MAGAZINE_INVOICE_FONT";
/// Overrides the magazine name.
pub const MAGAZINE_ENV: &str = "MAGAZINE_INVOICE_MAGAZINE";

/// Physical page geometry, in points. Defaults to A4 portrait.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Truncate product-name tokens wider than their column to this many characters.
    pub max_token_chars: Option<usize>,
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup {
            width: 595.0,
            height: 842.0,
            margin: 28.0,
            font_size: 9.0,
            max_token_chars: None,
        }
    }
}

/// Branding file contents. Paths are resolved relative to the file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    pub magazine_name: Option<String>,
    pub logo: Option<PathBuf>,
    pub payment_account: Option<String>,
    pub payment_logo: Option<PathBuf>,
    pub payment_qr: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub bold_font: Option<PathBuf>,
    pub page: PageSetup,
}

/// Everything a session needs from configuration.
pub struct SessionConfig {
    pub branding: Branding,
    pub options: ExportOptions,
}

fn resolve(base: Option<&Path>, path: Option<PathBuf>) -> Option<PathBuf> {
    let path = path?;
    match base {
        Some(dir) if path.is_relative() => Some(dir.join(path)),
        _ => Some(path),
    }
}

fn read_upload(path: Option<&Path>) -> Result<Option<ImageUpload>, Error> {
    let Some(path) = path else {
        return Ok(None);
    };
    let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Some(ImageUpload::new(name, data)))
}

impl BrandingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut cfg = Self::from_json_str(&text)?;
        let base = path.parent();
        cfg.logo = resolve(base, cfg.logo.take());
        cfg.payment_logo = resolve(base, cfg.payment_logo.take());
        cfg.payment_qr = resolve(base, cfg.payment_qr.take());
        cfg.font = resolve(base, cfg.font.take());
        cfg.bold_font = resolve(base, cfg.bold_font.take());
        log::debug!("loaded branding config from {}", path.display());
        Ok(cfg)
    }

    /// Apply `MAGAZINE_INVOICE_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var(FONT_ENV) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                self.font = Some(PathBuf::from(trimmed));
            }
        }
        if let Ok(val) = std::env::var(MAGAZINE_ENV) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                self.magazine_name = Some(trimmed.to_string());
            }
        }
    }

    /// Read the referenced images and fonts. Unreadable files are configuration
    /// errors; images that do not decode are only dropped at export time.
    pub fn load(self) -> Result<SessionConfig, Error> {
        let branding = Branding {
            magazine_name: self
                .magazine_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MAGAZINE_NAME.to_string()),
            logo: read_upload(self.logo.as_deref())?,
            payment_account: self.payment_account,
            payment_logo: read_upload(self.payment_logo.as_deref())?,
            payment_qr: read_upload(self.payment_qr.as_deref())?,
        };
        let fonts = FontSet::load(self.font.as_deref(), self.bold_font.as_deref())?;
        Ok(SessionConfig {
            branding,
            options: ExportOptions {
                page: self.page,
                fonts,
            },
        })
    }
}
