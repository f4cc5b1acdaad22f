//! DjVu format detection.
//!
//! A DjVu file is an IFF85 container: the `AT&T` preamble, a `FORM` chunk
//! header with a big-endian length, then the form type, `DJVU` for a
//! single-page document or `DJVM` for a bundled multi-page one.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Kind of DjVu document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DjvuKind {
    /// Single page (`FORM:DJVU`)
    Single,
    /// Bundled multi-page document (`FORM:DJVM`)
    Bundled,
}

/// DjVu format information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DjvuFormat {
    /// Single page or bundled
    pub kind: DjvuKind,
    /// Length of the top-level `FORM` chunk
    pub form_length: u32,
}

impl std::fmt::Display for DjvuFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            DjvuKind::Single => write!(f, "DjVu (single page)"),
            DjvuKind::Bundled => write!(f, "DjVu (bundled)"),
        }
    }
}

const DJVU_MAGIC: &[u8] = b"AT&TFORM";
const HEADER_LEN: usize = 16;

/// Detect DjVu format from a file path.
///
/// # Example
/// ```no_run
/// use djvu2pdf::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("book.djvu").unwrap();
/// println!("{}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<DjvuFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; HEADER_LEN];
    if let Err(err) = reader.read_exact(&mut header) {
        return match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Err(Error::UnknownFormat),
            _ => Err(err.into()),
        };
    }
    detect_format_from_bytes(&header)
}

/// Detect DjVu format from the first 16 bytes of a file.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<DjvuFormat> {
    if data.len() < HEADER_LEN || !data.starts_with(DJVU_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let form_length = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    let kind = match &data[12..16] {
        b"DJVU" => DjvuKind::Single,
        b"DJVM" => DjvuKind::Bundled,
        _ => return Err(Error::UnknownFormat),
    };

    Ok(DjvuFormat { kind, form_length })
}

/// Check if a file is a DjVu document.
pub fn is_djvu<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start like a DjVu document.
pub fn is_djvu_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
