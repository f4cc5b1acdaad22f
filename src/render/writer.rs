//! Assembly of the output PDF.
//!
//! Pages are added in order, each with its invisible text layer and an
//! optional background image scaled to the full page. The outline arena is
//! written as the usual chain of outline item dictionaries.
//!
//! Text is shown with one composite font shared by all pages: `Identity-H`
//! two-byte codes, fixed 600 unit advances and a `ToUnicode` map covering
//! every code drawn, so any script of the Basic Multilingual Plane stays
//! searchable.

use super::canvas::{PdfCanvas, FONT_NAME, FONT_RESOURCE};
use super::image::PageImage;
use crate::error::{Error, Result};
use crate::outline::{Outline, OutlineId};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;

/// Resource name of the page background image.
const IMAGE_RESOURCE: &str = "Im0";

/// Glyph advance of the text font in thousandths of an em.
const GLYPH_WIDTH: i64 = 600;

/// Most `bfchar` entries allowed in one CMap section.
const BFCHAR_CHUNK: usize = 100;

/// Builder of the output document.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    codes: BTreeSet<u16>,
    outlines_id: Option<ObjectId>,
    producer: String,
    title: Option<String>,
    compress: bool,
}

impl PdfAssembler {
    /// Create an empty document.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
            codes: BTreeSet::new(),
            outlines_id: None,
            producer: format!("djvu2pdf {}", env!("CARGO_PKG_VERSION")),
            title: None,
            compress: true,
        }
    }

    /// Set the document title written to the info dictionary.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Enable or disable Flate compression of content streams.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Add a page holding the text drawn on `canvas`.
    ///
    /// The page size is the canvas size. A background, when given, is drawn
    /// first so that the invisible text sits on top of it.
    pub fn add_page(&mut self, canvas: PdfCanvas, background: Option<&PageImage>) -> Result<ObjectId> {
        let (width, height) = (canvas.width(), canvas.height());
        let mut operations = Vec::new();
        let mut resources = dictionary! {
            "Font" => dictionary! { FONT_RESOURCE => Object::Reference(self.font_id) },
        };

        if let Some(image) = background {
            let image_id = self.add_image(image)?;
            resources.set(
                "XObject",
                dictionary! { IMAGE_RESOURCE => Object::Reference(image_id) },
            );
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(width as f32),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(height as f32),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ]);
        }
        let (text, codes) = canvas.into_parts();
        operations.extend(text);
        self.codes.extend(codes);

        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(self.content_stream(content)?);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(self.pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ],
            "Resources" => resources,
            "Contents" => Object::Reference(content_id),
        });
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    fn add_image(&mut self, image: &PageImage) -> Result<ObjectId> {
        let info = image.info()?;
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(i64::from(info.width)),
            "Height" => Object::Integer(i64::from(info.height)),
            "ColorSpace" => info.color_space(),
            "BitsPerComponent" => Object::Integer(8),
        };

        let stream = if image.is_jpeg() {
            dict.set("Filter", "DCTDecode");
            let mut stream = Stream::new(dict, image.data().to_vec());
            stream.allows_compression = false;
            stream
        } else {
            self.flate_stream(dict, image.data())?
        };
        Ok(self.doc.add_object(stream))
    }

    fn content_stream(&self, content: Vec<u8>) -> Result<Stream> {
        self.flate_stream(Dictionary::new(), &content)
    }

    /// A stream compressed with Flate, unless compression is off.
    fn flate_stream(&self, mut dict: Dictionary, data: &[u8]) -> Result<Stream> {
        if !self.compress {
            return Ok(Stream::new(dict, data.to_vec()));
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;

        dict.set("Filter", "FlateDecode");
        let mut stream = Stream::new(dict, compressed);
        stream.allows_compression = false;
        Ok(stream)
    }

    /// Write the text font: a `Type0` font over a CID font with fixed
    /// advances, plus the `ToUnicode` map of every code drawn.
    fn write_font(&mut self) -> Result<()> {
        let descriptor_id = self.doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => FONT_NAME,
            // FixedPitch | Nonsymbolic
            "Flags" => Object::Integer(33),
            "FontBBox" => vec![
                Object::Integer(-23),
                Object::Integer(-250),
                Object::Integer(715),
                Object::Integer(805),
            ],
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => Object::Integer(629),
            "Descent" => Object::Integer(-157),
            "CapHeight" => Object::Integer(562),
            "StemV" => Object::Integer(51),
        });

        let cid_font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => FONT_NAME,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => Object::Reference(descriptor_id),
            "DW" => Object::Integer(GLYPH_WIDTH),
            "CIDToGIDMap" => "Identity",
        });

        let cmap = to_unicode_cmap(&self.codes);
        let to_unicode = self.flate_stream(Dictionary::new(), cmap.as_bytes())?;
        let to_unicode_id = self.doc.add_object(to_unicode);

        self.doc.objects.insert(
            self.font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => FONT_NAME,
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Reference(cid_font_id)],
                "ToUnicode" => Object::Reference(to_unicode_id),
            }),
        );
        Ok(())
    }

    /// Write the outline. Returns the number of items written.
    ///
    /// Every entry must target a page that was added.
    pub fn set_outline(&mut self, outline: &Outline) -> Result<usize> {
        if outline.is_empty() {
            return Ok(0);
        }

        let outlines_id = self.doc.new_object_id();
        let mut ids: HashMap<OutlineId, ObjectId> = HashMap::new();
        ids.insert(outline.root(), outlines_id);
        for (id, _) in outline.entries() {
            ids.insert(id, self.doc.new_object_id());
        }
        let object_ref = |id: Option<OutlineId>| id.and_then(|id| ids.get(&id)).copied();

        let total = self.page_ids.len() as u32;
        for (id, node) in outline.entries() {
            let page = node.target_page.unwrap_or_default();
            let page_id = *self
                .page_ids
                .get(page as usize)
                .ok_or(Error::PageOutOfRange(page + 1, total))?;

            let mut dict = dictionary! {
                "Title" => text_string(&node.title),
                "A" => dictionary! {
                    "S" => "GoTo",
                    "D" => vec![Object::Reference(page_id), "Fit".into()],
                },
            };
            let links = [
                ("Parent", node.parent),
                ("Prev", node.prev_sibling),
                ("Next", node.next_sibling),
                ("First", node.first_child),
                ("Last", node.last_child),
            ];
            for (key, link) in links {
                if let Some(target) = object_ref(link) {
                    dict.set(key, Object::Reference(target));
                }
            }
            if node.child_count > 0 {
                dict.set("Count", Object::Integer(i64::from(node.child_count)));
            }

            if let Some(&object_id) = ids.get(&id) {
                self.doc.objects.insert(object_id, Object::Dictionary(dict));
            }
        }

        let root = &outline[outline.root()];
        let mut outlines = dictionary! {
            "Type" => "Outlines",
            "Count" => Object::Integer(i64::from(root.child_count)),
        };
        if let Some(first) = object_ref(root.first_child) {
            outlines.set("First", Object::Reference(first));
        }
        if let Some(last) = object_ref(root.last_child) {
            outlines.set("Last", Object::Reference(last));
        }
        self.doc
            .objects
            .insert(outlines_id, Object::Dictionary(outlines));

        self.outlines_id = Some(outlines_id);
        Ok(outline.len())
    }

    /// Finish the page tree, catalog and info dictionary.
    pub fn finish(mut self) -> Result<Document> {
        if self.page_ids.is_empty() {
            return Err(Error::Pdf("document has no pages".to_string()));
        }
        self.write_font()?;

        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|id| Object::Reference(*id))
            .collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(self.page_ids.len() as i64),
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        };
        if let Some(outlines_id) = self.outlines_id {
            catalog.set("Outlines", Object::Reference(outlines_id));
            catalog.set("PageMode", "UseOutlines");
        }
        let catalog_id = self.doc.add_object(catalog);

        let mut info = dictionary! {
            "Producer" => text_string(&self.producer),
            "CreationDate" => Object::String(
                chrono::Utc::now()
                    .format("D:%Y%m%d%H%M%S+00'00'")
                    .to_string()
                    .into_bytes(),
                StringFormat::Literal,
            ),
        };
        if let Some(title) = &self.title {
            info.set("Title", text_string(title));
        }
        let info_id = self.doc.add_object(info);

        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));
        Ok(self.doc)
    }

    /// Serialize the finished document.
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut doc = self.finish()?;
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| Error::Pdf(format!("Save failed: {}", e)))?;
        Ok(buffer)
    }

    /// Serialize the finished document to a file.
    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a `ToUnicode` CMap mapping each two-byte code to itself.
///
/// The space is always mapped so that the map is never empty.
fn to_unicode_cmap(codes: &BTreeSet<u16>) -> String {
    let mut codes = codes.clone();
    codes.insert(0x20);
    let codes: Vec<u16> = codes.into_iter().collect();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );
    for chunk in codes.chunks(BFCHAR_CHUNK) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for code in chunk {
            cmap.push_str(&format!("<{:04X}> <{:04X}>\n", code, code));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

/// Encode a PDF text string.
///
/// Printable ASCII is written as a literal; anything else as UTF-16BE with a
/// byte order mark.
pub fn text_string(text: &str) -> Object {
    if text.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
