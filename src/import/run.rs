use crate::tree::{Element, ElementKind};
use crate::util::collapse_whitespace;

/// Accumulates the inline children of one paragraph or heading.
///
/// Raw text collapses whitespace and loses it at both ends of the block;
/// literal text (encoded spaces, tabs, entities) is kept as is. Adjacent
/// text with the same style tags merges into one span unless a soft break
/// or a line break separates it.
#[derive(Debug, Default)]
pub(super) struct RunBuilder {
    children: Vec<Element>,
    spans: Vec<Vec<String>>,
    started: bool,
    /// The last appended character is a collapsed raw space.
    raw_space: bool,
    split: bool,
}

impl RunBuilder {
    /// Style tags in effect, outermost first.
    fn styles(&self) -> Vec<String> {
        self.spans.iter().flatten().cloned().collect()
    }

    pub(super) fn open_span(&mut self, styles: Vec<String>) {
        self.spans.push(styles);
    }

    pub(super) fn close_span(&mut self) {
        self.spans.pop();
    }

    pub(super) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(super) fn push_raw(&mut self, raw: &str) {
        let mut text = collapse_whitespace(raw);
        if (!self.started || self.raw_space) && text.starts_with(' ') {
            text.remove(0);
        }
        if text.is_empty() {
            return;
        }
        self.raw_space = text.ends_with(' ');
        self.append(text);
    }

    pub(super) fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.raw_space = false;
        self.append(text.to_string());
    }

    fn append(&mut self, text: String) {
        self.started = true;
        let styles = self.styles();
        if !self.split
            && let Some(last) = self.children.last_mut()
            && last.styles == styles
            && !last.line_break()
            && let ElementKind::Text { text: existing, .. } = &mut last.kind
        {
            existing.push_str(&text);
            return;
        }
        self.split = false;
        let mut span = Element::text(text);
        span.styles = styles;
        self.children.push(span);
    }

    /// Flag the preceding span with a line break.
    pub(super) fn line_break(&mut self) {
        if self.raw_space {
            self.trim_trailing_space();
        }
        match self.children.last_mut() {
            Some(last) if last.as_text().is_some() && !last.line_break() => {
                last.set_line_break(true);
            }
            _ => {
                let mut span = Element::text("").with_line_break();
                span.styles = self.styles();
                self.children.push(span);
            }
        }
        self.started = true;
        self.raw_space = true;
    }

    /// Start a new span at the next text without flagging a break.
    pub(super) fn soft_break(&mut self) {
        self.split = true;
    }

    pub(super) fn marker(&mut self, marker: Element) {
        self.children.push(marker);
    }

    fn trim_trailing_space(&mut self) {
        let last_text = self.children.iter_mut().rev().find_map(|c| match &mut c.kind {
            ElementKind::Text { text, .. } => Some(text),
            _ => None,
        });
        if let Some(text) = last_text {
            let trimmed = text.trim_end_matches(' ').len();
            text.truncate(trimmed);
        }
    }

    pub(super) fn finish(mut self) -> Vec<Element> {
        if self.raw_space {
            self.trim_trailing_space();
        }
        self.children
            .retain(|c| c.line_break() || c.as_text().is_none_or(|t| !t.is_empty()));
        self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(children: &[Element]) -> Vec<&str> {
        children.iter().filter_map(Element::as_text).collect()
    }

    #[test]
    fn test_raw_whitespace_collapses_and_trims() {
        let mut run = RunBuilder::default();
        run.push_raw("\n  Hello   ");
        run.push_raw("  world \n");
        assert_eq!(texts(&run.finish()), vec!["Hello world"]);
    }

    #[test]
    fn test_literal_spaces_survive() {
        let mut run = RunBuilder::default();
        run.push_literal("  ");
        run.push_raw("x");
        run.push_literal(" ");
        assert_eq!(texts(&run.finish()), vec!["  x "]);
    }

    #[test]
    fn test_styles_split_spans() {
        let mut run = RunBuilder::default();
        run.push_raw("a ");
        run.open_span(vec!["bold".into()]);
        run.push_raw("b");
        run.open_span(vec!["italic".into(), "x".into()]);
        run.push_raw("c");
        run.close_span();
        run.close_span();
        run.push_raw("d");
        let children = run.finish();
        assert_eq!(texts(&children), vec!["a ", "b", "c", "d"]);
        assert_eq!(children[2].styles, vec!["bold", "italic", "x"]);
        assert!(children[3].styles.is_empty());
    }

    #[test]
    fn test_leading_break_creates_empty_span() {
        let mut run = RunBuilder::default();
        run.line_break();
        run.push_raw(" after");
        let children = run.finish();
        assert_eq!(children.len(), 2);
        assert!(children[0].line_break());
        assert_eq!(children[0].as_text(), Some(""));
        assert_eq!(children[1].as_text(), Some("after"));
    }

    #[test]
    fn test_soft_break_splits_without_flag() {
        let mut run = RunBuilder::default();
        run.push_raw("one");
        run.soft_break();
        run.push_raw("two");
        let children = run.finish();
        assert_eq!(texts(&children), vec!["one", "two"]);
        assert!(!children[0].line_break());
    }
}
