use std::path::{Path, PathBuf};

use bindery::epub::{normalize_path, relative_path};
use bindery::export::{Exporter, HtmlExporter, MarkdownExporter, OdtExporter};
use bindery::import::{HtmlImporter, Importer, MarkdownImporter, OdtImporter};
use bindery::util::{generate_section_file_name, sanitize_file_name, strip_numeric_prefix};
use bindery::{Document, Element};
use proptest::prelude::*;

fn segments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z]{1,5}", 1..5)
}

fn join(parts: &[String]) -> PathBuf {
    parts.iter().collect()
}

const TAGS: [&str; 4] = ["lead", "quote", "note", "wide"];

fn tags(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::sample::subsequence(TAGS.to_vec(), 0..=max)
        .prop_map(|tags| tags.into_iter().map(String::from).collect())
}

/// Paragraphs as (block tags, [(text, run tags)]).
type Blocks = Vec<(Vec<String>, Vec<(String, Vec<String>)>)>;

fn blocks(block_tags: usize) -> impl Strategy<Value = Blocks> {
    let run = ("[a-z]{1,6}", tags(3));
    proptest::collection::vec(
        (tags(block_tags), proptest::collection::vec(run, 1..4)),
        1..4,
    )
}

fn styled_document(heading_tags: Vec<String>, paragraphs: &Blocks) -> Document {
    let mut heading = Element::heading_with_text("T");
    heading.styles = heading_tags;
    let mut section = Element::section();
    section.push(heading);
    for (styles, runs) in paragraphs {
        let mut paragraph = Element::paragraph();
        paragraph.styles = styles.clone();
        for (text, styles) in runs {
            let mut run = Element::text(text.as_str());
            run.styles = styles.clone();
            paragraph.push(run);
        }
        section.push(paragraph);
    }
    let mut root = Element::root();
    root.push(section);
    Document::new(root)
}

/// Block tags and run tags, with adjacent equal runs counted once.
fn tag_outline(root: &Element) -> Vec<(Vec<String>, Vec<Vec<String>>)> {
    root.descendants()
        .filter(|e| e.is_heading() || e.is_paragraph())
        .map(|block| {
            let mut runs: Vec<Vec<String>> =
                block.children.iter().map(|run| run.styles.clone()).collect();
            runs.dedup();
            (block.styles.clone(), runs)
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_xhtml_keeps_every_style_tag(heading in tags(3), paragraphs in blocks(3)) {
        let document = styled_document(heading, &paragraphs);
        let bytes = HtmlExporter::new().to_bytes(&document).unwrap();
        let back = HtmlImporter::new().read_content(&bytes).unwrap();
        prop_assert_eq!(tag_outline(&back), tag_outline(&document.root));
        prop_assert_eq!(back.plain_text(), document.root.plain_text());
    }

    #[test]
    fn prop_odt_keeps_every_style_tag(heading in tags(1), paragraphs in blocks(1)) {
        let document = styled_document(heading, &paragraphs);
        let bytes = OdtExporter::new().to_bytes(&document).unwrap();
        let back = OdtImporter::new().read_content(&bytes).unwrap();
        prop_assert_eq!(tag_outline(&back), tag_outline(&document.root));
        prop_assert_eq!(back.plain_text(), document.root.plain_text());
    }

    #[test]
    fn prop_relative_path_resolves_back(target in segments(), base in segments()) {
        let target = join(&target);
        let base = join(&base);
        let href = relative_path(&target, &base);
        prop_assert_eq!(normalize_path(&base.join(&href)), normalize_path(&target));
    }

    #[test]
    fn prop_section_names_keep_the_sanitized_title(
        title in "[ -~]{1,30}",
        total in 1usize..500,
        offset in 0usize..500,
    ) {
        let index = offset % total;
        let name = generate_section_file_name(&title, index, total);
        let sanitized = sanitize_file_name(&title);
        prop_assert_eq!(strip_numeric_prefix(&name), sanitized.as_str());
        let digits = name.split(' ').next().unwrap_or_default();
        prop_assert_eq!(digits.len(), total.to_string().len());
        prop_assert_eq!(digits.parse::<usize>().unwrap(), index + 1);
        prop_assert_eq!(Path::new(&name).components().count(), 1);
    }

    #[test]
    fn prop_markdown_escaping_preserves_text(
        words in proptest::collection::vec("[a-zA-Z0-9*_#\\[\\]]{1,8}", 1..6)
    ) {
        let text = words.join(" ");
        let mut section = Element::section();
        section.push(Element::heading_with_text("T"));
        section.push(Element::paragraph_with_text(text.as_str()));
        let mut root = Element::root();
        root.push(section);

        let markdown = MarkdownExporter::new().to_bytes(&Document::new(root)).unwrap();
        let back = MarkdownImporter::new().read_content(&markdown).unwrap();
        let section = back.sections().next().unwrap();
        let paragraph = section.paragraphs().next().unwrap();
        prop_assert_eq!(paragraph.plain_text(), text);
    }
}
