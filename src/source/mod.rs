//! Sources of DjVu page data.
//!
//! The converter only needs page geometry, the hidden text tree of each page,
//! the outline and optionally a rendered background per page. A
//! [`DocumentSource`] provides exactly that, whether it comes from djvulibre
//! ([`Djvused`]) or was built in memory ([`MemorySource`]).

mod djvused;

pub use djvused::{Djvused, ImageMode};

use crate::error::{Error, Result};
use crate::render::PageImage;
use crate::sexpr::SExpr;
use std::fs;
use std::path::{Path, PathBuf};

/// Read access to the pages of a DjVu document.
///
/// Page indices are zero-based. Sources are shared by reference between
/// worker threads.
pub trait DocumentSource: Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> Result<u32>;

    /// Page size as `(width, height)` in pixels.
    fn page_size(&self, index: u32) -> Result<(u32, u32)>;

    /// Hidden text tree of a page, `None` when the page has no text layer.
    fn page_text(&self, index: u32) -> Result<Option<SExpr>>;

    /// The `bookmarks` expression, `None` when the document has no outline.
    fn outline(&self) -> Result<Option<SExpr>>;

    /// Rendered background of a page.
    fn page_image(&self, _index: u32) -> Result<Option<PageImage>> {
        Ok(None)
    }
}

impl<S: DocumentSource + ?Sized> DocumentSource for &S {
    fn page_count(&self) -> Result<u32> {
        (**self).page_count()
    }

    fn page_size(&self, index: u32) -> Result<(u32, u32)> {
        (**self).page_size(index)
    }

    fn page_text(&self, index: u32) -> Result<Option<SExpr>> {
        (**self).page_text(index)
    }

    fn outline(&self) -> Result<Option<SExpr>> {
        (**self).outline()
    }

    fn page_image(&self, index: u32) -> Result<Option<PageImage>> {
        (**self).page_image(index)
    }
}

#[derive(Debug, Clone)]
struct MemoryPage {
    width: u32,
    height: u32,
    text: Option<SExpr>,
    image: Option<PageImage>,
}

/// A document held entirely in memory.
///
/// ```
/// use djvu2pdf::source::{DocumentSource, MemorySource};
/// use djvu2pdf::sexpr::parse;
///
/// let source = MemorySource::new()
///     .with_page(100, 200, Some(parse(br#"(page 0 0 100 200 "Hello")"#).unwrap()))
///     .with_page(100, 200, None);
/// assert_eq!(source.page_count().unwrap(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: Vec<MemoryPage>,
    outline: Option<SExpr>,
}

impl MemorySource {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page.
    pub fn with_page(mut self, width: u32, height: u32, text: Option<SExpr>) -> Self {
        self.pages.push(MemoryPage {
            width,
            height,
            text,
            image: None,
        });
        self
    }

    /// Set the background of the last appended page.
    pub fn with_image(mut self, image: PageImage) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.image = Some(image);
        }
        self
    }

    /// Set the outline expression.
    pub fn with_outline(mut self, outline: SExpr) -> Self {
        self.outline = Some(outline);
        self
    }

    fn page(&self, index: u32) -> Result<&MemoryPage> {
        self.pages
            .get(index as usize)
            .ok_or(Error::PageOutOfRange(index + 1, self.pages.len() as u32))
    }
}

impl DocumentSource for MemorySource {
    fn page_count(&self) -> Result<u32> {
        Ok(self.pages.len() as u32)
    }

    fn page_size(&self, index: u32) -> Result<(u32, u32)> {
        let page = self.page(index)?;
        Ok((page.width, page.height))
    }

    fn page_text(&self, index: u32) -> Result<Option<SExpr>> {
        Ok(self.page(index)?.text.clone())
    }

    fn outline(&self) -> Result<Option<SExpr>> {
        Ok(self.outline.clone())
    }

    fn page_image(&self, index: u32) -> Result<Option<PageImage>> {
        Ok(self.page(index)?.image.clone())
    }
}

/// Serves pre-rendered page backgrounds from a directory.
///
/// Page `n` (one-based) is read from `page_bg_<n>.jpg`; a missing file falls
/// back to the wrapped source's own background. Everything else is delegated.
#[derive(Debug, Clone)]
pub struct WithBackgrounds<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: DocumentSource> WithBackgrounds<S> {
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    /// Path of the background file for a zero-based page index.
    pub fn background_path(&self, index: u32) -> PathBuf {
        background_path(&self.dir, index)
    }
}

fn background_path(dir: &Path, index: u32) -> PathBuf {
    dir.join(format!("page_bg_{}.jpg", index + 1))
}

impl<S: DocumentSource> DocumentSource for WithBackgrounds<S> {
    fn page_count(&self) -> Result<u32> {
        self.inner.page_count()
    }

    fn page_size(&self, index: u32) -> Result<(u32, u32)> {
        self.inner.page_size(index)
    }

    fn page_text(&self, index: u32) -> Result<Option<SExpr>> {
        self.inner.page_text(index)
    }

    fn outline(&self) -> Result<Option<SExpr>> {
        self.inner.outline()
    }

    fn page_image(&self, index: u32) -> Result<Option<PageImage>> {
        let path = self.background_path(index);
        if !path.is_file() {
            log::debug!("No background at {}", path.display());
            return self.inner.page_image(index);
        }

        let data = fs::read(&path)?;
        let image = PageImage::Jpeg(data);
        image
            .info()
            .map_err(|e| Error::Source(format!("{}: {}", path.display(), e)))?;
        Ok(Some(image))
    }
}
