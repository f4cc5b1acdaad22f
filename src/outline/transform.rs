//! Translation of a DjVu `bookmarks` tree into an [`Outline`].
//!
//! A DjVu outline looks like
//!
//! ```text
//! (bookmarks
//!   ("Chapter 2" "#100"
//!     ("Section 2.1" "#104")))
//! ```
//!
//! Each entry is a plain list `(title page-reference children...)`. Page
//! references are 1-based and embedded in a string; they are resolved
//! through a [`PageRefPolicy`] and shifted by a configurable offset. Entries
//! whose page cannot be resolved are dropped together with their children.

use super::{Outline, OutlineId};
use crate::sexpr::{Handlers, ListDisplay, SExpr, SExprVisitor};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"))
}

fn hash_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([0-9]+)$").expect("hash number pattern is valid"))
}

/// Rule for turning a page-reference string into a 1-based page number.
#[derive(Clone, Copy, Default)]
pub enum PageRefPolicy {
    /// `#` followed by digits and nothing else (`"#f007.djvu"` is rejected).
    #[default]
    HashNumber,

    /// First run of ASCII digits anywhere in the reference
    /// (`"#100"` is 100, `"#p001.djvu"` is 1).
    FirstDigitRun,

    /// Caller-supplied rule.
    Custom(fn(&str) -> Option<u64>),
}

impl PageRefPolicy {
    /// Resolve a reference to a 1-based page number.
    pub fn resolve(&self, reference: &str) -> Option<u64> {
        match self {
            PageRefPolicy::FirstDigitRun => digit_run_regex()
                .find(reference)
                .and_then(|m| m.as_str().parse().ok()),
            PageRefPolicy::HashNumber => hash_number_regex()
                .captures(reference)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok()),
            PageRefPolicy::Custom(resolve) => resolve(reference),
        }
    }
}

impl fmt::Debug for PageRefPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRefPolicy::FirstDigitRun => f.write_str("FirstDigitRun"),
            PageRefPolicy::HashNumber => f.write_str("HashNumber"),
            PageRefPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Options for outline translation.
#[derive(Debug, Clone)]
pub struct OutlineOptions {
    /// Number of pages in the output; targets must lie in `[0, total_pages)`
    pub total_pages: u32,

    /// Added to every resolved page index (front matter not numbered in the
    /// source)
    pub toc_page_offset: i64,

    /// How page references are parsed
    pub page_ref_policy: PageRefPolicy,
}

impl OutlineOptions {
    /// Create options for a document with `total_pages` pages.
    pub fn new(total_pages: u32) -> Self {
        Self {
            total_pages,
            ..Self::default()
        }
    }

    /// Set the page offset.
    pub fn with_toc_page_offset(mut self, offset: i64) -> Self {
        self.toc_page_offset = offset;
        self
    }

    /// Set the page reference policy.
    pub fn with_page_ref_policy(mut self, policy: PageRefPolicy) -> Self {
        self.page_ref_policy = policy;
        self
    }
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            total_pages: u32::MAX,
            toc_page_offset: 0,
            page_ref_policy: PageRefPolicy::default(),
        }
    }
}

/// Visitor building an [`Outline`] from a `bookmarks` tree.
///
/// The context is the parent node new entries are appended under.
pub struct OutlineTransformer {
    options: OutlineOptions,
    handlers: Handlers<Self>,
    outline: Outline,
}

impl OutlineTransformer {
    /// Create a transformer.
    pub fn new(options: OutlineOptions) -> Self {
        let handlers = Handlers::<Self>::new()
            .on_tag("bookmarks", Self::visit_bookmarks)
            .on_plain_list(Self::visit_entry);

        Self {
            options,
            handlers,
            outline: Outline::new(),
        }
    }

    /// Get the options.
    pub fn options(&self) -> &OutlineOptions {
        &self.options
    }

    /// Translate a tree into an outline.
    ///
    /// Anything that is not a `bookmarks` list, or a list without a single
    /// resolvable entry, yields an empty outline.
    pub fn transform(&mut self, node: &SExpr) -> Outline {
        self.outline = Outline::new();
        if self.visit(node, None).is_none() {
            log::debug!("No outline built from {}", node);
        }
        std::mem::take(&mut self.outline)
    }

    fn visit_bookmarks(&mut self, items: &[SExpr], parent: Option<OutlineId>) -> Option<OutlineId> {
        if parent.is_some() {
            log::warn!("Ignoring nested bookmarks list {}", ListDisplay(items));
            return None;
        }

        self.outline = Outline::new();
        let root = self.outline.root();
        for child in &items[1..] {
            self.visit(child, Some(root));
        }
        Some(root)
    }

    fn visit_entry(&mut self, items: &[SExpr], parent: Option<OutlineId>) -> Option<OutlineId> {
        let Some(parent) = parent else {
            log::warn!("Bookmark entry {} outside of a bookmarks list", ListDisplay(items));
            return None;
        };
        let [title, page, rest @ ..] = items else {
            log::warn!("Bookmark entry {} needs a title and a page", ListDisplay(items));
            return None;
        };

        let page_index = self.resolve_page(page)?;
        let title = resolve_title(title);

        let id = self.outline.append(parent, title, page_index);
        for child in rest {
            self.visit(child, Some(id));
        }
        Some(id)
    }

    fn resolve_page(&self, page: &SExpr) -> Option<u32> {
        let Some(bytes) = page.as_bytes() else {
            log::warn!("Page reference {} is not a string", page);
            return None;
        };
        let reference = String::from_utf8_lossy(bytes);

        let Some(number) = self.options.page_ref_policy.resolve(&reference) else {
            log::warn!(
                "Could not determine page number from the page title {}",
                reference
            );
            return None;
        };

        let index = i64::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| n.checked_add(self.options.toc_page_offset))
            .filter(|&n| n >= 0 && n < i64::from(self.options.total_pages))
            .and_then(|n| u32::try_from(n).ok());

        if index.is_none() {
            log::warn!(
                "Page reference {} is outside of the document ({} pages, offset {})",
                reference,
                self.options.total_pages,
                self.options.toc_page_offset
            );
        }
        index
    }
}

impl SExprVisitor for OutlineTransformer {
    type Context = Option<OutlineId>;
    type Output = OutlineId;

    fn handlers(&self) -> &Handlers<Self> {
        &self.handlers
    }
}

fn resolve_title(title: &SExpr) -> String {
    match title.decode_str() {
        Some(Ok(text)) => text.to_string(),
        Some(Err(err)) => {
            let escaped = title
                .as_bytes()
                .map(|bytes| bytes.escape_ascii().to_string())
                .unwrap_or_default();
            log::warn!("Could not decode bookmark title {}: {}", escaped, err);
            escaped
        }
        None => title.to_string(),
    }
}
