//! Integration tests for outline translation.

use djvu2pdf::outline::{Outline, OutlineId, OutlineOptions, OutlineTransformer, PageRefPolicy};
use djvu2pdf::sexpr::{parse, SExpr};

fn transform(source: &str, options: OutlineOptions) -> Outline {
    let bookmarks = parse(source.as_bytes()).unwrap();
    OutlineTransformer::new(options).transform(&bookmarks)
}

/// Check sibling links, parent links and counts of every node.
fn assert_consistent(outline: &Outline, id: OutlineId) {
    let node = &outline[id];
    let children: Vec<OutlineId> = outline.children(id).map(|(child, _)| child).collect();

    assert_eq!(node.child_count as usize, children.len());
    assert_eq!(node.first_child, children.first().copied());
    assert_eq!(node.last_child, children.last().copied());

    if let Some(first) = node.first_child {
        assert_eq!(outline[first].prev_sibling, None);
    }
    if let Some(last) = node.last_child {
        assert_eq!(outline[last].next_sibling, None);
    }
    for pair in children.windows(2) {
        assert_eq!(outline[pair[0]].next_sibling, Some(pair[1]));
        assert_eq!(outline[pair[1]].prev_sibling, Some(pair[0]));
    }
    for &child in &children {
        assert_eq!(outline[child].parent, Some(id));
        assert_consistent(outline, child);
    }
}

#[test]
fn test_basic_bookmark() {
    let outline = transform(
        r##"(bookmarks ("Chapter 2" "#100"))"##,
        OutlineOptions::new(500),
    );
    let root = &outline[outline.root()];
    assert_eq!(root.child_count, 1);

    let chapter = &outline[root.first_child.unwrap()];
    assert_eq!(chapter.title, "Chapter 2");
    assert_eq!(chapter.target_page, Some(99));
    assert_consistent(&outline, outline.root());
}

#[test]
fn test_nested_bookmarks() {
    let outline = transform(
        r##"(bookmarks ("Ch2" "#100" ("Ch2.1" "#200")))"##,
        OutlineOptions::new(500),
    );
    let root = &outline[outline.root()];
    assert_eq!(root.child_count, 1);

    let chapter = &outline[root.first_child.unwrap()];
    assert_eq!(chapter.child_count, 1);
    let section = &outline[chapter.first_child.unwrap()];
    assert_eq!(section.target_page, Some(199));
    assert_consistent(&outline, outline.root());
}

#[test]
fn test_unsupported_references_are_dropped() {
    let outline = transform(
        r##"(bookmarks
            ("Preface" "#f007.djvu")
            ("Contents" "#f011.djvu")
            ("0 Prologue" "#p001.djvu"))"##,
        OutlineOptions::new(500),
    );
    let root = &outline[outline.root()];
    assert_eq!(root.child_count, 0);
    assert!(root.first_child.is_none());
    assert!(outline.is_empty());
}

#[test]
fn test_first_digit_run_reads_embedded_numbers() {
    let outline = transform(
        r##"(bookmarks ("Cover" "#f007.djvu") ("Title" "#p001.djvu"))"##,
        OutlineOptions::new(500).with_page_ref_policy(PageRefPolicy::FirstDigitRun),
    );
    let pages: Vec<Option<u32>> = outline.entries().map(|(_, node)| node.target_page).collect();
    assert_eq!(pages, vec![Some(6), Some(0)]);
}

#[test]
fn test_digitless_references_are_dropped() {
    let outline = transform(
        r##"(bookmarks ("Index" "#index") ("Appendix" "#12"))"##,
        OutlineOptions::new(500),
    );
    let titles: Vec<&str> = outline.entries().map(|(_, node)| node.title.as_str()).collect();
    assert_eq!(titles, vec!["Appendix"]);
}

#[test]
fn test_page_extraction_is_idempotent() {
    let policy = PageRefPolicy::FirstDigitRun;
    for reference in ["#100", "#p001.djvu", "page 42 of 99", "7"] {
        let page = policy.resolve(reference).unwrap();
        assert_eq!(policy.resolve(&page.to_string()), Some(page));
    }
}

#[test]
fn test_toc_offset_and_range() {
    let outline = transform(
        r##"(bookmarks ("One" "#1") ("Two" "#2") ("Nine" "#9"))"##,
        OutlineOptions::new(10).with_toc_page_offset(2),
    );
    let pages: Vec<Option<u32>> = outline.entries().map(|(_, node)| node.target_page).collect();
    // #9 moves to index 10, one past the last page.
    assert_eq!(pages, vec![Some(2), Some(3)]);
}

#[test]
fn test_dropped_parent_drops_children() {
    let outline = transform(
        r##"(bookmarks ("Lost" "#none" ("Child" "#3")) ("Kept" "#4" ("Child" "#5")))"##,
        OutlineOptions::new(10),
    );
    let items = outline.to_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Kept");
    assert_eq!(items[0].children.len(), 1);
    assert_consistent(&outline, outline.root());
}

#[test]
fn test_deep_outline_is_consistent() {
    let outline = transform(
        r##"(bookmarks
            ("Part I" "#1"
                ("Chapter 1" "#2" ("1.1" "#3") ("1.2" "#4") ("1.3" "#5"))
                ("Chapter 2" "#6" ("2.1" "#7")))
            ("Part II" "#8"
                ("Chapter 3" "#9"))
            ("Index" "#10"))"##,
        OutlineOptions::new(10),
    );
    assert_eq!(outline.len(), 11);
    assert_eq!(outline[outline.root()].child_count, 3);
    assert_consistent(&outline, outline.root());
}

#[test]
fn test_non_bookmarks_root_yields_empty_outline() {
    let outline = transform(r##"(page 0 0 10 10 "text")"##, OutlineOptions::new(10));
    assert!(outline.is_empty());

    let outline =
        OutlineTransformer::new(OutlineOptions::new(10)).transform(&SExpr::list(Vec::new()));
    assert!(outline.is_empty());
}
