//! HTML detection and a built-in HTML to org converter, on top of `scraper`.

use scraper::{ElementRef, Html};

use ical2org_core::{MarkupConverter, MarkupSniffer, Result};

/// Detects bodies that contain at least one HTML element.
///
/// Text such as `a < b` or a lone `&amp;` has no element and is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSniffer;

impl MarkupSniffer for HtmlSniffer {
    fn looks_like_markup(&self, text: &str) -> bool {
        let fragment = Html::parse_fragment(text);
        // skip the implicit <html> wrapper
        fragment
            .root_element()
            .descendants()
            .skip(1)
            .any(|node| node.value().is_element())
    }
}

/// Converts HTML bodies to org markup without external tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlToOrg;

impl HtmlToOrg {
    /// Renders an HTML fragment as org text.
    pub fn render(html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut writer = OrgWriter::default();
        writer.walk(fragment.root_element());
        writer.finish()
    }
}

impl MarkupConverter for HtmlToOrg {
    fn convert(&self, text: &str) -> Result<String> {
        Ok(Self::render(text))
    }
}

/// Accumulates org output while walking the element tree.
#[derive(Debug, Default)]
struct OrgWriter {
    out: String,
    pending_space: bool,
    list_depth: usize,
}

impl OrgWriter {
    fn finish(self) -> String {
        self.out.trim().to_string()
    }

    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                self.push_text(text);
            } else if let Some(child) = ElementRef::wrap(child) {
                self.element(child);
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        match name {
            "script" | "style" | "head" | "title" | "template" => {}
            "br" => self.line_break(),
            "p" | "div" | "section" | "article" | "header" | "footer" | "table" | "tr" => {
                self.end_block();
                self.walk(element);
                self.end_block();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.end_block();
                self.emphasis(element, '*');
                self.end_block();
            }
            "b" | "strong" => self.emphasis(element, '*'),
            "i" | "em" => self.emphasis(element, '/'),
            "u" | "ins" => self.emphasis(element, '_'),
            "s" | "del" | "strike" => self.emphasis(element, '+'),
            "code" | "kbd" | "tt" => self.verbatim(element),
            "a" => self.link(element),
            "img" => {
                if let Some(src) = element.value().attr("src") {
                    self.push_inline(&format!("[[{src}]]"));
                }
            }
            "ul" | "ol" => self.list(element, name == "ol"),
            "pre" => self.example(element),
            "blockquote" => self.quote(element),
            "hr" => {
                self.end_block();
                self.out.push_str("-----");
                self.end_block();
            }
            "td" | "th" => {
                self.pending_space = true;
                self.walk(element);
                self.pending_space = true;
            }
            _ => self.walk(element),
        }
    }

    /// Appends text, collapsing runs of whitespace into one space.
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            self.flush_space();
            self.out.push(c);
        }
    }

    /// Appends pre-rendered inline text as a single word.
    fn push_inline(&mut self, text: &str) {
        self.flush_space();
        self.out.push_str(text);
    }

    fn flush_space(&mut self) {
        if self.pending_space && !self.at_line_start() && !self.out.ends_with(' ') {
            self.out.push(' ');
        }
        self.pending_space = false;
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn trim_trailing_spaces(&mut self) {
        let len = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(len);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        self.out.push('\n');
        self.pending_space = false;
    }

    fn newline(&mut self) {
        self.trim_trailing_spaces();
        self.pending_space = false;
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    /// Ends the current block with a blank line. Inside lists blocks only
    /// separate words, so items stay on one line.
    fn end_block(&mut self) {
        if self.list_depth > 0 {
            self.pending_space = true;
            return;
        }
        self.trim_trailing_spaces();
        self.pending_space = false;
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// Renders the children of `element` on their own.
    fn inline(element: ElementRef<'_>) -> String {
        let mut inner = OrgWriter::default();
        inner.walk(element);
        inner.finish()
    }

    fn emphasis(&mut self, element: ElementRef<'_>, marker: char) {
        let inner = Self::inline(element);
        if !inner.is_empty() {
            self.push_inline(&format!("{marker}{inner}{marker}"));
        }
    }

    fn verbatim(&mut self, element: ElementRef<'_>) {
        let text = element.text().collect::<String>();
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            self.push_inline(&format!("~{text}~"));
        }
    }

    fn link(&mut self, element: ElementRef<'_>) {
        let text = Self::inline(element);
        match element.value().attr("href") {
            Some(href) if text.is_empty() || text == href => {
                self.push_inline(&format!("[[{href}]]"));
            }
            Some(href) => self.push_inline(&format!("[[{href}][{text}]]")),
            None if !text.is_empty() => self.push_inline(&text),
            None => {}
        }
    }

    fn list(&mut self, list: ElementRef<'_>, ordered: bool) {
        if self.list_depth == 0 {
            self.end_block();
        } else {
            self.newline();
        }
        self.list_depth += 1;

        let items = list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|item| item.value().name() == "li");
        for (index, item) in items.enumerate() {
            self.newline();
            self.out.push_str(&"  ".repeat(self.list_depth - 1));
            if ordered {
                self.out.push_str(&format!("{}. ", index + 1));
            } else {
                self.out.push_str("- ");
            }
            self.walk(item);
        }

        self.list_depth -= 1;
        if self.list_depth == 0 {
            self.end_block();
        } else {
            self.newline();
        }
    }

    fn example(&mut self, element: ElementRef<'_>) {
        let text = element.text().collect::<String>();
        self.end_block();
        self.newline();
        self.out.push_str("#+BEGIN_EXAMPLE\n");
        self.out.push_str(text.trim_matches('\n'));
        self.out.push_str("\n#+END_EXAMPLE");
        self.end_block();
    }

    fn quote(&mut self, element: ElementRef<'_>) {
        let inner = Self::inline(element);
        self.end_block();
        self.newline();
        self.out.push_str("#+BEGIN_QUOTE\n");
        self.out.push_str(&inner);
        self.out.push_str("\n#+END_QUOTE");
        self.end_block();
    }
}
