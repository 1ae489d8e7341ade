use anyhow::{anyhow, bail, Context, Result};
use ::image::ImageReader;
use percent_encoding::percent_decode_str;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::config::ConvertOptions;
use crate::model::Image;

const MAX_REMOTE_BYTES: u64 = 32 * 1024 * 1024;
const USER_AGENT: &str = concat!("md2docx/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    fn from_sniffed(format: ::image::ImageFormat) -> Option<Self> {
        match format {
            ::image::ImageFormat::Png => Some(ImageFormat::Png),
            ::image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            ::image::ImageFormat::Gif => Some(ImageFormat::Gif),
            ::image::ImageFormat::Bmp => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    fn sniffed(self) -> ::image::ImageFormat {
        match self {
            ImageFormat::Png => ::image::ImageFormat::Png,
            ImageFormat::Jpeg => ::image::ImageFormat::Jpeg,
            ImageFormat::Gif => ::image::ImageFormat::Gif,
            ImageFormat::Bmp => ::image::ImageFormat::Bmp,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }
}

/// Resolves `img` sources for one conversion. Relative paths are taken from
/// the directory of the Markdown file being converted.
pub struct ImageLoader {
    base_dir: PathBuf,
    timeout: Duration,
    max_width_px: u32,
}

impl ImageLoader {
    pub fn new(base_dir: impl Into<PathBuf>, opts: &ConvertOptions) -> Self {
        Self {
            base_dir: base_dir.into(),
            timeout: opts.image_timeout,
            max_width_px: opts.max_image_width_px(),
        }
    }

    pub fn load(
        &self,
        src: &str,
        explicit_width: Option<u32>,
        caption: Option<String>,
    ) -> Result<Image> {
        let data = if is_remote(src) {
            self.fetch_remote(src)?
        } else {
            self.read_local(src)?
        };

        let sniffed = ::image::guess_format(&data)
            .with_context(|| format!("unrecognised image data in {src}"))?;
        let format = ImageFormat::from_sniffed(sniffed)
            .ok_or_else(|| anyhow!("unsupported image format {sniffed:?} in {src}"))?;
        let natural = ImageReader::with_format(Cursor::new(&data), format.sniffed())
            .into_dimensions()
            .with_context(|| format!("read image header of {src}"))?;
        let (width_px, height_px) = display_size(natural, explicit_width, self.max_width_px);
        debug!(
            "image {src}: {}x{} shown at {width_px}x{height_px}",
            natural.0, natural.1
        );

        Ok(Image {
            src: src.to_string(),
            caption,
            data,
            format,
            width_px,
            height_px,
        })
    }

    fn read_local(&self, src: &str) -> Result<Vec<u8>> {
        let raw = src.strip_prefix("file://").unwrap_or(src);
        let mut candidates = vec![self.resolve(raw)];
        let decoded = percent_decode_str(raw).decode_utf8_lossy();
        if decoded != raw {
            candidates.push(self.resolve(&decoded));
        }
        for path in &candidates {
            if path.is_file() {
                return fs::read(path).with_context(|| format!("read image {}", path.display()));
            }
        }
        bail!("image not found: {}", candidates[0].display())
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let p = Path::new(raw);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        debug!("downloading image {url} (timeout {:?})", self.timeout);
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build http client")?;
        let resp = client
            .get(url)
            .send()
            .with_context(|| format!("fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("fetch {url}"))?;
        read_capped(resp, MAX_REMOTE_BYTES, url)
    }
}

/// Reads a response body, refusing anything over `limit` bytes rather than
/// keeping a truncated prefix.
fn read_capped(body: impl Read, limit: u64, url: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    body.take(limit + 1)
        .read_to_end(&mut buf)
        .with_context(|| format!("download {url}"))?;
    if buf.len() as u64 > limit {
        bail!("image at {url} is larger than {limit} bytes");
    }
    if buf.is_empty() {
        bail!("empty image response from {url}");
    }
    Ok(buf)
}

pub fn is_remote(src: &str) -> bool {
    let low = src.trim_start().to_ascii_lowercase();
    low.starts_with("http://") || low.starts_with("https://")
}

/// Scales to the explicit width when given, then caps at `max_width`.
/// The aspect ratio is kept; nothing is ever enlarged to fit the cap.
pub fn display_size(natural: (u32, u32), explicit_width: Option<u32>, max_width: u32) -> (u32, u32) {
    let (w, h) = (natural.0.max(1), natural.1.max(1));
    let target = explicit_width.filter(|w| *w > 0).unwrap_or(w).min(max_width.max(1));
    let height = (h as f64 * target as f64 / w as f64).round().max(1.0) as u32;
    (target, height)
}
