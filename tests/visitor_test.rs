//! Integration tests for the S-expression visitor.

use djvu2pdf::sexpr::{parse, Handlers, SExpr, SExprVisitor};

/// Visitor recording every node it reaches together with its depth.
struct DepthRecorder {
    handlers: Handlers<Self>,
    seen: Vec<(String, usize)>,
}

impl DepthRecorder {
    fn new() -> Self {
        let handlers = Handlers::<Self>::new()
            .on_integer(|v, n, depth| {
                v.seen.push((n.to_string(), depth));
                Some(())
            })
            .on_string(|v, bytes, depth| {
                v.seen.push((String::from_utf8_lossy(bytes).into_owned(), depth));
                Some(())
            })
            .on_plain_list(|v, items, depth| {
                v.seen.push(("()".to_string(), depth));
                v.visit_children(items, depth)
            })
            .on_tags(&["outer", "inner"], |v, items, depth| {
                let tag = items[0].as_symbol().unwrap_or_default().to_string();
                v.seen.push((tag, depth));
                v.visit_children(&items[1..], depth)
            });

        Self {
            handlers,
            seen: Vec::new(),
        }
    }

    fn visit_children(&mut self, items: &[SExpr], depth: usize) -> Option<()> {
        for item in items {
            self.visit(item, depth + 1);
        }
        Some(())
    }
}

impl SExprVisitor for DepthRecorder {
    type Context = usize;
    type Output = ();

    fn handlers(&self) -> &Handlers<Self> {
        &self.handlers
    }
}

/// Visitor with no handlers at all.
struct Empty {
    handlers: Handlers<Self>,
}

impl SExprVisitor for Empty {
    type Context = ();
    type Output = u32;

    fn handlers(&self) -> &Handlers<Self> {
        &self.handlers
    }
}

#[test]
fn test_dispatch_by_kind_and_tag() {
    let tree = parse(br#"(outer 1 (inner "a") (2 "b"))"#).unwrap();
    let mut recorder = DepthRecorder::new();
    assert_eq!(recorder.visit(&tree, 0), Some(()));

    let seen: Vec<(&str, usize)> = recorder
        .seen
        .iter()
        .map(|(name, depth)| (name.as_str(), *depth))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("outer", 0),
            ("1", 1),
            ("inner", 1),
            ("a", 2),
            ("()", 1),
            ("2", 2),
            ("b", 2),
        ]
    );
}

#[test]
fn test_unknown_tag_is_skipped() {
    let tree = parse(br#"(outer (mystery 1 2) "kept")"#).unwrap();
    let mut recorder = DepthRecorder::new();
    recorder.visit(&tree, 0);

    let names: Vec<&str> = recorder.seen.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["outer", "kept"]);
}

#[test]
fn test_unknown_tag_at_root_yields_none() {
    let tree = parse(b"(mystery 1 2)").unwrap();
    let mut recorder = DepthRecorder::new();
    assert_eq!(recorder.visit(&tree, 0), None);
    assert!(recorder.seen.is_empty());
}

#[test]
fn test_symbols_are_not_dispatched() {
    let mut recorder = DepthRecorder::new();
    assert_eq!(recorder.visit(&SExpr::symbol("outer"), 0), None);
    assert!(recorder.seen.is_empty());
}

#[test]
fn test_empty_handlers_visit_nothing() {
    let mut empty = Empty {
        handlers: Handlers::new(),
    };
    for source in [&b"1"[..], b"\"text\"", b"()", b"(page 0 0 1 1)"] {
        let node = parse(source).unwrap();
        assert_eq!(empty.visit(&node, ()), None);
    }
}

#[test]
fn test_handlers_table_queries() {
    let recorder = DepthRecorder::new();
    let handlers = recorder.handlers();
    assert!(handlers.tag("outer").is_some());
    assert!(handlers.tag("inner").is_some());
    assert!(handlers.tag("word").is_none());
    assert!(handlers.integer().is_some());
    assert!(handlers.plain_list().is_some());
}
