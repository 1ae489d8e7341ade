use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Windows1252,
    Latin1,
}

// Bytes left undefined by the cp1252 code page.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8d, 0x8f, 0x90, 0x9d];

pub fn decode(bytes: &[u8]) -> (String, SourceEncoding) {
    let body = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(body) {
        return (s.to_string(), SourceEncoding::Utf8);
    }

    if !bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
        return (text.into_owned(), SourceEncoding::Windows1252);
    }

    let text = bytes.iter().map(|&b| b as char).collect();
    (text, SourceEncoding::Latin1)
}

pub fn read_markdown(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let (text, encoding) = decode(&bytes);
    match encoding {
        SourceEncoding::Utf8 => debug!("{} decoded as UTF-8", path.display()),
        SourceEncoding::Windows1252 => {
            warn!("{} is not UTF-8; decoded as cp1252", path.display())
        }
        SourceEncoding::Latin1 => {
            warn!("{} is not UTF-8 or cp1252; decoded as latin-1", path.display())
        }
    }
    Ok(text)
}
