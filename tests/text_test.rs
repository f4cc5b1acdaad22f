//! Integration tests for text extraction and draw planning.

use djvu2pdf::sexpr::{parse, SExpr, SExprVisitor};
use djvu2pdf::text::{
    filter_text, plan_page, DrawInstruction, TextBackend, TextDrawPlanner, TextExtractor, TAB_SIZE,
};

const PAGE: &str = r#"(page 0 0 600 800
    (column 10 10 590 790
        (para 10 10 590 100
            (line 10 10 300 40 (word 10 10 100 40 "Hello") (word 110 10 300 40 "world"))
            (line 10 50 300 80 (word 10 50 200 80 "second") (word 210 50 300 80 "line")))
        (para 10 200 590 300
            (line 10 200 400 230 (word 10 200 400 230 "Next\tparagraph")))))"#;

fn page() -> SExpr {
    parse(PAGE.as_bytes()).unwrap()
}

/// Backend recording everything, measuring one unit per character.
#[derive(Default)]
struct Recorder {
    drawn: Vec<DrawInstruction>,
}

impl TextBackend for Recorder {
    fn page_height(&self) -> f64 {
        800.0
    }

    fn string_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size
    }

    fn draw_text(&mut self, instruction: &DrawInstruction) -> djvu2pdf::Result<()> {
        self.drawn.push(instruction.clone());
        Ok(())
    }
}

#[test]
fn test_page_text() {
    let text = TextExtractor::new().extract(&page());
    let tab = " ".repeat(TAB_SIZE);
    assert_eq!(
        text,
        format!("Hello world\nsecond line\nNext{}paragraph", tab)
    );
}

#[test]
fn test_join_laws() {
    let mut extractor = TextExtractor::new();
    let line = parse(br#"(line 0 0 9 9 (word 0 0 1 1 "a") (word 2 0 3 1 "b") (word 4 0 5 1 "c"))"#).unwrap();
    assert_eq!(extractor.extract(&line), "a b c");

    for tag in ["para", "paragraph", "column", "region", "page"] {
        let source = format!(r#"({} 0 0 9 9 "a" "b")"#, tag);
        let node = parse(source.as_bytes()).unwrap();
        assert_eq!(extractor.extract(&node), "a\nb", "{}", tag);
    }
}

#[test]
fn test_empty_containers() {
    let mut extractor = TextExtractor::new();
    let empty_line = parse(b"(line 0 0 9 9)").unwrap();
    assert_eq!(extractor.extract(&empty_line), "");
}

#[test]
fn test_unknown_children_become_empty() {
    let mut extractor = TextExtractor::new();
    let line = parse(br#"(line 0 0 9 9 (word 0 0 1 1 "a") (mystery 1) (word 2 0 3 1 "b"))"#).unwrap();
    assert_eq!(extractor.extract(&line), "a  b");
}

#[test]
fn test_filtering_is_safe() {
    let raw = "a\tb\nc\u{0}d\u{200b}e\u{e000}f\u{2028}g\u{a0}h é 😀";
    let filtered = filter_text(raw);
    assert_eq!(filtered, format!("a{}b cdefgh é 😀", " ".repeat(TAB_SIZE)));
    assert!(!filtered.chars().any(|c| c.is_control()));
    assert_eq!(filter_text(&filtered), filtered);
}

#[test]
fn test_malformed_utf8_is_empty() {
    let word = parse(br#"(word 0 0 10 10 "\303\050")"#).unwrap();
    assert_eq!(TextExtractor::new().extract(&word), "");

    let mut extractor = TextExtractor::new();
    assert_eq!(
        extractor.visit(&SExpr::String(vec![0xff, 0xfe]), ()),
        Some(String::new())
    );
}

#[test]
fn test_plan_places_every_word() {
    let list = plan_page(&page(), 800.0);
    let texts: Vec<&str> = list.instructions.iter().map(|i| i.text.as_str()).collect();
    let tab = " ".repeat(TAB_SIZE);
    let expected_last = format!("Next{}paragraph", tab);
    assert_eq!(
        texts,
        vec!["Hello", "world", "second", "line", expected_last.as_str()]
    );

    let hello = &list.instructions[0];
    assert_eq!(hello.x, 10.0);
    assert_eq!(hello.y, 790.0);
}

#[test]
fn test_font_size_fits_box_width() {
    let mut recorder = Recorder::default();
    let stats = TextDrawPlanner::new(&mut recorder).draw_page(&page());
    assert_eq!(stats.emitted, 5);
    assert_eq!(stats.skipped, 0);

    // "Hello" is 5 characters in a 90 unit wide box.
    let hello = &recorder.drawn[0];
    let width = recorder.string_width(&hello.text, hello.font_size);
    assert!((width - 90.0).abs() < 1e-9);
}

#[test]
fn test_draw_extract_consistency() {
    let tree = parse(
        br#"(page 0 0 100 100
            (line 0 0 100 10 (word 0 0 10 10 "ok") (word 10 0 10 10 "flat") (word 20 0 30 10 "")
                (word 30 0 40 10 "\001\002") (word 40 0 50 10 "\303\050") (word 50 0 60 10 "fine")))"#,
    )
    .unwrap();

    let mut recorder = Recorder::default();
    TextDrawPlanner::new(&mut recorder).draw_page(&tree);

    let mut extractor = TextExtractor::new();
    let words = tree.as_list().unwrap()[5].as_list().unwrap()[5..].to_vec();
    let drawn: Vec<&str> = recorder.drawn.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(drawn, vec!["ok", "fine"]);

    for word in &words {
        let text = extractor.visit(word, ());
        let was_drawn = recorder
            .drawn
            .iter()
            .any(|i| Some(i.text.as_str()) == text.as_deref());
        if was_drawn {
            assert!(!text.unwrap().is_empty());
        }
    }
}
