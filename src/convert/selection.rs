//! Page selection.

use crate::error::{Error, Result};
use std::ops::RangeInclusive;

/// Highest page number a DjVu document can have; a bundled document's
/// directory counts its components in 16 bits.
pub const MAX_PAGE: u32 = u16::MAX as u32;

/// Pages to convert or extract (1-indexed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed, sorted, no duplicates)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    ///
    /// Page numbers above [`MAX_PAGE`] are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start = parse_page(start, s)?;
                let end = parse_page(end, s)?;
                if start > end {
                    return Err(Error::InvalidPageRange(format!(
                        "{}: start is after end",
                        s
                    )));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        // Comma-separated list with possible ranges
        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page(start, s)?;
                    let end = parse_page(end, s)?;
                    if start > end {
                        return Err(Error::InvalidPageRange(format!(
                            "{}: start is after end in {:?}",
                            s,
                            part.trim()
                        )));
                    }
                    pages.extend(start..=end);
                }
                None => pages.push(parse_page(part, s)?),
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }

    /// Zero-based indices of the selected pages in a document of `total`.
    ///
    /// Selecting a page past the end is an error; so is selecting nothing.
    pub fn indices(&self, total: u32) -> Result<Vec<u32>> {
        let last = match self {
            PageSelection::All => None,
            PageSelection::Range(range) => Some(*range.end()),
            PageSelection::Pages(pages) => pages.iter().copied().max(),
        };
        if let Some(last) = last {
            if last > total {
                return Err(Error::PageOutOfRange(last, total));
            }
        }

        let indices: Vec<u32> = (0..total).filter(|i| self.includes(i + 1)).collect();
        if indices.is_empty() {
            return Err(Error::InvalidPageRange("no pages selected".to_string()));
        }
        Ok(indices)
    }
}

fn parse_page(part: &str, whole: &str) -> Result<u32> {
    match part.trim().parse::<u32>() {
        Ok(0) => Err(Error::InvalidPageRange(format!(
            "{}: pages are numbered from 1",
            whole
        ))),
        Ok(page) if page > MAX_PAGE => Err(Error::InvalidPageRange(format!(
            "{}: page {} is past the last possible page {}",
            whole, page, MAX_PAGE
        ))),
        Ok(page) => Ok(page),
        Err(_) => Err(Error::InvalidPageRange(format!(
            "{}: invalid page number {:?}",
            whole,
            part.trim()
        ))),
    }
}
