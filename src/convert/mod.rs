//! Conversion of a DjVu document into a searchable PDF.
//!
//! Pages are independent: each one gets its own [`PdfCanvas`] and
//! [`TextDrawPlanner`], so they are planned in parallel with rayon and only
//! assembled in order at the end.
//!
//! # Example
//!
//! ```no_run
//! use djvu2pdf::convert::{ConvertOptions, Converter};
//! use djvu2pdf::source::Djvused;
//!
//! fn main() -> djvu2pdf::Result<()> {
//!     let source = Djvused::open("book.djvu")?;
//!     let converter = Converter::new(ConvertOptions::new().with_toc_page_offset(12));
//!
//!     let result = converter.convert(&source)?;
//!     std::fs::write("book.pdf", &result.pdf)?;
//!     Ok(())
//! }
//! ```

mod selection;

pub use selection::PageSelection;

use crate::error::{Error, Result};
use crate::outline::{Outline, OutlineItem, OutlineOptions, OutlineTransformer, PageRefPolicy};
use crate::render::{PageImage, PdfAssembler, PdfCanvas};
use crate::source::DocumentSource;
use crate::text::{extract_page_text, PlanStats, TextDrawPlanner};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// Separator between pages in extracted text.
pub const PAGE_BREAK: char = '\x0c';

/// How to handle pages whose text layer cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail the whole conversion
    Strict,
    /// Log the error and produce the page without text
    #[default]
    Lenient,
}

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Shift applied to outline targets (pages before the printed page 1)
    pub toc_page_offset: i64,

    /// Rule for reading outline page references
    pub page_ref_policy: PageRefPolicy,

    /// Plan pages on the rayon thread pool
    pub parallel: bool,

    /// Write the invisible text layer
    pub text_layer: bool,

    /// Write the outline
    pub outline: bool,

    /// Pages to convert
    pub pages: PageSelection,

    /// What to do when a page's text cannot be read
    pub error_mode: ErrorMode,

    /// Title for the info dictionary
    pub title: Option<String>,

    /// Compress content streams
    pub compress: bool,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TOC page offset.
    pub fn with_toc_page_offset(mut self, offset: i64) -> Self {
        self.toc_page_offset = offset;
        self
    }

    /// Set the page reference policy.
    pub fn with_page_ref_policy(mut self, policy: PageRefPolicy) -> Self {
        self.page_ref_policy = policy;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Enable or disable the text layer.
    pub fn with_text_layer(mut self, text_layer: bool) -> Self {
        self.text_layer = text_layer;
        self
    }

    /// Enable or disable the outline.
    pub fn with_outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set the error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            toc_page_offset: 0,
            page_ref_policy: PageRefPolicy::default(),
            parallel: true,
            text_layer: true,
            outline: true,
            pages: PageSelection::All,
            error_mode: ErrorMode::default(),
            title: None,
            compress: true,
        }
    }
}

/// Counters collected during a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Pages written
    pub pages: u32,
    /// Text runs drawn
    pub text_runs: usize,
    /// Text runs dropped
    pub skipped_runs: usize,
    /// Pages whose text layer could not be read
    pub pages_without_text: u32,
}

impl ConversionStats {
    fn add_page(&mut self, page: &RenderedPage) {
        self.pages += 1;
        self.text_runs += page.stats.emitted;
        self.skipped_runs += page.stats.skipped;
        if page.text_failed {
            self.pages_without_text += 1;
        }
    }
}

/// Result of a conversion.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    /// Serialized PDF
    pub pdf: Vec<u8>,

    /// Number of pages in the PDF
    pub page_count: u32,

    /// Number of outline items written
    pub outline_items: usize,

    pub stats: ConversionStats,
}

impl ConvertedDocument {
    /// Get PDF length in bytes.
    pub fn len(&self) -> usize {
        self.pdf.len()
    }

    /// Check if no PDF bytes were produced.
    pub fn is_empty(&self) -> bool {
        self.pdf.is_empty()
    }
}

/// A page planned but not yet added to the document.
struct RenderedPage {
    canvas: PdfCanvas,
    background: Option<PageImage>,
    stats: PlanStats,
    text_failed: bool,
}

/// Converts a [`DocumentSource`] into a PDF.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert the selected pages of `source`.
    pub fn convert<S: DocumentSource + ?Sized>(&self, source: &S) -> Result<ConvertedDocument> {
        let start = Instant::now();
        let total = source.page_count()?;
        if total == 0 {
            return Err(Error::Source("document has no pages".to_string()));
        }
        let indices = self.options.pages.indices(total)?;
        log::info!("Converting {} of {} pages", indices.len(), total);

        let pages: Vec<RenderedPage> = if self.options.parallel {
            indices
                .par_iter()
                .map(|&index| self.render_page(source, index))
                .collect::<Result<_>>()?
        } else {
            indices
                .iter()
                .map(|&index| self.render_page(source, index))
                .collect::<Result<_>>()?
        };
        log::debug!("Planned {} pages in {:.2}s", pages.len(), start.elapsed().as_secs_f64());

        let mut assembler = PdfAssembler::new().with_compression(self.options.compress);
        if let Some(title) = &self.options.title {
            assembler = assembler.with_title(title.clone());
        }

        let mut stats = ConversionStats::default();
        for page in pages {
            stats.add_page(&page);
            assembler.add_page(page.canvas, page.background.as_ref())?;
        }

        let mut outline_items = 0;
        if self.options.outline {
            let outline = self.outline(source)?;
            let selected = select_outline(&outline, &indices);
            outline_items = assembler.set_outline(&selected)?;
            if outline_items < outline.len() {
                log::info!(
                    "{} of {} bookmarks point outside the selected pages",
                    outline.len() - outline_items,
                    outline.len()
                );
            }
        }

        let pdf = assembler.to_bytes()?;
        log::info!(
            "Produced {} pages with {} text runs in {:.2}s",
            stats.pages,
            stats.text_runs,
            start.elapsed().as_secs_f64()
        );

        Ok(ConvertedDocument {
            pdf,
            page_count: stats.pages,
            outline_items,
            stats,
        })
    }

    /// Read and transform the outline of `source`.
    ///
    /// Targets are zero-based indices into the whole document. A missing or
    /// unreadable outline yields an empty one.
    pub fn outline<S: DocumentSource + ?Sized>(&self, source: &S) -> Result<Outline> {
        let bookmarks = match source.outline() {
            Ok(Some(bookmarks)) => bookmarks,
            Ok(None) => {
                log::info!("No outline to process");
                return Ok(Outline::new());
            }
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Failed to read the outline: {}", e);
                return Ok(Outline::new());
            }
            Err(e) => return Err(e),
        };

        let options = OutlineOptions::new(source.page_count()?)
            .with_toc_page_offset(self.options.toc_page_offset)
            .with_page_ref_policy(self.options.page_ref_policy);
        let outline = OutlineTransformer::new(options).transform(&bookmarks);
        log::debug!("Outline has {} entries", outline.len());
        Ok(outline)
    }

    /// Read the outline as nested items with 1-indexed pages.
    pub fn outline_items<S: DocumentSource + ?Sized>(&self, source: &S) -> Result<Vec<OutlineItem>> {
        Ok(self.outline(source)?.to_items())
    }

    fn render_page<S: DocumentSource + ?Sized>(&self, source: &S, index: u32) -> Result<RenderedPage> {
        let (width, height) = source.page_size(index)?;
        let background = match source.page_image(index) {
            Ok(image) => image,
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Failed to render page {}: {}", index + 1, e);
                None
            }
            Err(e) => return Err(e),
        };
        let mut page = RenderedPage {
            canvas: PdfCanvas::new(f64::from(width), f64::from(height)),
            background,
            stats: PlanStats::default(),
            text_failed: false,
        };

        if self.options.text_layer {
            match source.page_text(index) {
                Ok(Some(text)) => {
                    page.stats = TextDrawPlanner::new(&mut page.canvas).draw_page(&text);
                }
                Ok(None) => log::debug!("Page {} has no text layer", index + 1),
                Err(e) => {
                    if self.options.error_mode == ErrorMode::Strict {
                        return Err(e);
                    }
                    log::warn!("Failed to read text from page {}: {}", index + 1, e);
                    page.text_failed = true;
                }
            }
        }

        log::debug!(
            "Page {}: {}x{}, {} text runs",
            index + 1,
            width,
            height,
            page.stats.emitted
        );
        Ok(page)
    }
}

/// Retarget an outline from document indices to positions among `indices`.
fn select_outline(outline: &Outline, indices: &[u32]) -> Outline {
    let positions: HashMap<u32, u32> = indices
        .iter()
        .enumerate()
        .map(|(position, &index)| (index, position as u32))
        .collect();
    outline.remap_pages(|page| positions.get(&page).copied())
}

/// Extract the plain text of the selected pages, separated by form feeds.
///
/// Pages without a text layer contribute an empty string.
pub fn extract_text<S: DocumentSource + ?Sized>(source: &S, pages: &PageSelection) -> Result<String> {
    let indices = pages.indices(source.page_count()?)?;
    let texts = indices
        .iter()
        .map(|&index| {
            Ok(source
                .page_text(index)?
                .map(|tree| extract_page_text(&tree))
                .unwrap_or_default())
        })
        .collect::<Result<Vec<String>>>()?;
    Ok(texts.join(&PAGE_BREAK.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::tests::tiny_jpeg;
    use crate::sexpr::{parse, SExpr};
    use crate::source::MemorySource;
    use lopdf::Document;

    fn page(text: &str) -> SExpr {
        let source = format!(
            r#"(page 0 0 200 100 (line 10 10 190 30 (word 10 10 90 30 "{}") (word 100 10 190 30 "here")))"#,
            text
        );
        parse(source.as_bytes()).unwrap()
    }

    fn book() -> MemorySource {
        MemorySource::new()
            .with_page(200, 100, Some(page("one")))
            .with_page(200, 100, None)
            .with_page(200, 100, Some(page("three")))
            .with_outline(
                parse(br##"(bookmarks ("First" "#1" ("Inner" "#2")) ("Third" "#3"))"##).unwrap(),
            )
    }

    /// Source whose text layer is unreadable on every page.
    struct BrokenText(MemorySource);

    impl DocumentSource for BrokenText {
        fn page_count(&self) -> Result<u32> {
            self.0.page_count()
        }
        fn page_size(&self, index: u32) -> Result<(u32, u32)> {
            self.0.page_size(index)
        }
        fn page_text(&self, _index: u32) -> Result<Option<SExpr>> {
            Err(Error::Source("print-txt failed".to_string()))
        }
        fn outline(&self) -> Result<Option<SExpr>> {
            self.0.outline()
        }
    }

    /// Source whose pages cannot be rendered.
    struct BrokenImage(MemorySource);

    impl DocumentSource for BrokenImage {
        fn page_count(&self) -> Result<u32> {
            self.0.page_count()
        }
        fn page_size(&self, index: u32) -> Result<(u32, u32)> {
            self.0.page_size(index)
        }
        fn page_text(&self, index: u32) -> Result<Option<SExpr>> {
            self.0.page_text(index)
        }
        fn outline(&self) -> Result<Option<SExpr>> {
            self.0.outline()
        }
        fn page_image(&self, _index: u32) -> Result<Option<PageImage>> {
            Err(Error::Source("ddjvu failed".to_string()))
        }
    }

    #[test]
    fn test_convert_options_builder() {
        let options = ConvertOptions::new()
            .with_toc_page_offset(-2)
            .with_page_ref_policy(PageRefPolicy::FirstDigitRun)
            .sequential()
            .with_text_layer(false)
            .with_pages(PageSelection::Range(1..=2));

        assert_eq!(options.toc_page_offset, -2);
        assert!(!options.parallel);
        assert!(!options.text_layer);
        assert!(options.outline);
        assert_eq!(options.pages, PageSelection::Range(1..=2));
        assert_eq!(options.error_mode, ErrorMode::Lenient);
    }

    #[test]
    fn test_convert_all_pages() {
        let result = Converter::default().convert(&book()).unwrap();

        assert_eq!(result.page_count, 3);
        assert_eq!(result.outline_items, 3);
        assert_eq!(result.stats.text_runs, 4);
        assert_eq!(result.stats.pages_without_text, 0);

        let doc = Document::load_mem(&result.pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let parallel = Converter::default().convert(&book()).unwrap();
        let sequential = Converter::new(ConvertOptions::new().sequential())
            .convert(&book())
            .unwrap();
        assert_eq!(parallel.stats, sequential.stats);
        assert_eq!(parallel.outline_items, sequential.outline_items);
    }

    #[test]
    fn test_selection_remaps_outline() {
        let options = ConvertOptions::new().with_pages(PageSelection::Pages(vec![2, 3]));
        let result = Converter::new(options).convert(&book()).unwrap();

        assert_eq!(result.page_count, 2);
        // "First" targets the dropped page 1 and takes "Inner" with it.
        assert_eq!(result.outline_items, 1);
    }

    #[test]
    fn test_without_text_or_outline() {
        let options = ConvertOptions::new().with_text_layer(false).with_outline(false);
        let result = Converter::new(options).convert(&book()).unwrap();
        assert_eq!(result.stats.text_runs, 0);
        assert_eq!(result.outline_items, 0);
    }

    #[test]
    fn test_unreadable_text_is_lenient_by_default() {
        let result = Converter::default().convert(&BrokenText(book())).unwrap();
        assert_eq!(result.page_count, 3);
        assert_eq!(result.stats.pages_without_text, 3);
        assert_eq!(result.stats.text_runs, 0);
    }

    #[test]
    fn test_unreadable_text_fails_in_strict_mode() {
        let options = ConvertOptions::new().with_error_mode(ErrorMode::Strict);
        let err = Converter::new(options).convert(&BrokenText(book())).unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[test]
    fn test_toc_offset_drops_out_of_range_entries() {
        let options = ConvertOptions::new().with_toc_page_offset(1);
        let items = Converter::new(options).outline_items(&book()).unwrap();
        // "Third" would land on page 4 of 3.
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].page, Some(2));
        assert_eq!(items[0].children[0].page, Some(3));
    }

    #[test]
    fn test_background_is_embedded() {
        let source = MemorySource::new()
            .with_page(200, 100, Some(page("scan")))
            .with_image(PageImage::Jpeg(tiny_jpeg(200, 100, 3)));
        let result = Converter::default().convert(&source).unwrap();

        let doc = Document::load_mem(&result.pdf).unwrap();
        let has_image = doc.objects.values().any(|object| {
            object
                .as_stream()
                .ok()
                .and_then(|stream| stream.dict.get(b"Subtype").ok())
                .and_then(|subtype| subtype.as_name().ok())
                == Some(b"Image".as_slice())
        });
        assert!(has_image);
    }

    #[test]
    fn test_raw_background_is_embedded() {
        let source = MemorySource::new()
            .with_page(2, 2, None)
            .with_image(PageImage::Raw {
                width: 2,
                height: 2,
                components: 3,
                data: vec![200; 12],
            });
        let result = Converter::default().convert(&source).unwrap();

        let doc = Document::load_mem(&result.pdf).unwrap();
        let image = doc
            .objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .find(|stream| {
                stream.dict.get(b"Subtype").and_then(|s| s.as_name()).ok() == Some(b"Image".as_slice())
            })
            .unwrap();
        assert_eq!(image.decompressed_content().unwrap(), vec![200; 12]);
    }

    #[test]
    fn test_unrenderable_page_keeps_text() {
        let result = Converter::default().convert(&BrokenImage(book())).unwrap();
        assert_eq!(result.page_count, 3);
        assert_eq!(result.stats.text_runs, 4);

        let options = ConvertOptions::new().with_error_mode(ErrorMode::Strict);
        let err = Converter::new(options).convert(&BrokenImage(book())).unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[test]
    fn test_extract_text() {
        let text = extract_text(&book(), &PageSelection::All).unwrap();
        assert_eq!(text, "one here\x0c\x0cthree here");

        let text = extract_text(&book(), &PageSelection::Pages(vec![3])).unwrap();
        assert_eq!(text, "three here");
    }

    #[test]
    fn test_empty_document() {
        let err = Converter::default().convert(&MemorySource::new()).unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }
}
