//! Rendering of conversion output: PDF pages, outline and JSON reports.

pub mod canvas;
pub mod image;
mod json;
pub mod writer;

pub use canvas::PdfCanvas;
pub use image::{ImageInfo, PageImage};
pub use json::{to_json, JsonFormat};
pub use writer::{text_string, PdfAssembler};
