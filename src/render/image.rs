//! Page background images.
//!
//! JPEG images are embedded as they are; only the frame header is read, to
//! learn the dimensions and component count the PDF image dictionary needs.
//! Raw samples (as rendered by `ddjvu`) are Flate-compressed on embedding.

use crate::error::{Error, Result};

/// A page image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageImage {
    /// Baseline or progressive JPEG, embedded as-is with `DCTDecode`
    Jpeg(Vec<u8>),

    /// 8-bit samples, rows top to bottom, `components` samples per pixel
    Raw {
        width: u32,
        height: u32,
        components: u8,
        data: Vec<u8>,
    },
}

/// Frame properties of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

impl ImageInfo {
    /// PDF color space name for the component count.
    pub fn color_space(&self) -> &'static str {
        match self.components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        }
    }
}

impl PageImage {
    /// Image bytes: the JPEG stream or the raw samples.
    pub fn data(&self) -> &[u8] {
        match self {
            PageImage::Jpeg(data) => data,
            PageImage::Raw { data, .. } => data,
        }
    }

    /// Check if the bytes are a JPEG stream.
    pub fn is_jpeg(&self) -> bool {
        matches!(self, PageImage::Jpeg(_))
    }

    /// Read the image geometry, validating the data against it.
    pub fn info(&self) -> Result<ImageInfo> {
        match self {
            PageImage::Jpeg(data) => read_jpeg_header(data),
            PageImage::Raw {
                width,
                height,
                components,
                data,
            } => {
                if !matches!(components, 1 | 3) {
                    return Err(Error::Render(format!(
                        "unsupported component count {}",
                        components
                    )));
                }
                let expected = u64::from(*width) * u64::from(*height) * u64::from(*components);
                if data.len() as u64 != expected {
                    return Err(Error::Render(format!(
                        "raw image of {}x{}x{} needs {} bytes, got {}",
                        width,
                        height,
                        components,
                        expected,
                        data.len()
                    )));
                }
                Ok(ImageInfo {
                    width: *width,
                    height: *height,
                    components: *components,
                })
            }
        }
    }

    /// Read a binary PGM (`P5`) or PPM (`P6`) image with a maximum sample
    /// value of 255.
    pub fn from_pnm(bytes: &[u8]) -> Result<Self> {
        let mut header = PnmHeader { bytes, pos: 0 };
        let components = match header.token()? {
            b"P5" => 1,
            b"P6" => 3,
            magic => {
                return Err(Error::Render(format!(
                    "unsupported PNM type {:?}",
                    String::from_utf8_lossy(magic)
                )))
            }
        };
        let width = header.number()?;
        let height = header.number()?;
        let max_value = header.number()?;
        if max_value != 255 {
            return Err(Error::Render(format!(
                "unsupported PNM sample range {}",
                max_value
            )));
        }

        // Exactly one whitespace byte separates the header from the samples.
        let start = header.pos + 1;
        let image = PageImage::Raw {
            width,
            height,
            components,
            data: bytes.get(start..).unwrap_or_default().to_vec(),
        };
        image.info()?;
        Ok(image)
    }
}

/// Token reader over a PNM header.
struct PnmHeader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PnmHeader<'a> {
    fn token(&mut self) -> Result<&'a [u8]> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b'#') => {
                    while !matches!(self.bytes.get(self.pos), Some(b'\n') | None) {
                        self.pos += 1;
                    }
                }
                Some(byte) if byte.is_ascii_whitespace() => self.pos += 1,
                Some(_) => break,
                None => return Err(Error::Render("truncated PNM header".to_string())),
            }
        }

        let bytes = self.bytes;
        let start = self.pos;
        while matches!(bytes.get(self.pos), Some(byte) if !byte.is_ascii_whitespace()) {
            self.pos += 1;
        }
        Ok(&bytes[start..self.pos])
    }

    fn number(&mut self) -> Result<u32> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| {
                Error::Render(format!(
                    "bad PNM header field {:?}",
                    String::from_utf8_lossy(token)
                ))
            })
    }
}

/// Find the start-of-frame segment of a JPEG stream.
fn read_jpeg_header(data: &[u8]) -> Result<ImageInfo> {
    if !data.starts_with(&[0xff, 0xd8]) {
        return Err(Error::Render("not a JPEG image".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xff {
            return Err(Error::Render(format!("bad JPEG marker at byte {}", pos)));
        }
        let marker = data[pos + 1];
        pos += 2;

        match marker {
            // Fill byte
            0xff => pos -= 1,
            // Standalone markers
            0x01 | 0xd0..=0xd7 => {}
            0xd9 | 0xda => break,
            _ => {
                let length = read_u16(data, pos)? as usize;
                if length < 2 {
                    return Err(Error::Render("bad JPEG segment length".to_string()));
                }
                let is_frame = matches!(marker, 0xc0..=0xcf) && !matches!(marker, 0xc4 | 0xc8 | 0xcc);
                if is_frame {
                    let components = *data
                        .get(pos + 7)
                        .ok_or_else(|| Error::Render("truncated JPEG frame".to_string()))?;
                    return Ok(ImageInfo {
                        height: u32::from(read_u16(data, pos + 3)?),
                        width: u32::from(read_u16(data, pos + 5)?),
                        components,
                    });
                }
                pos += length;
            }
        }
    }

    Err(Error::Render("JPEG has no frame header".to_string()))
}

fn read_u16(data: &[u8], pos: usize) -> Result<u16> {
    match data.get(pos..pos + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(Error::Render("truncated JPEG".to_string())),
    }
}
