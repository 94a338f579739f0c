//! HTML to normalized markup conversion.
//!
//! The conversion is a single document-order walk. Every element is first
//! mapped to one of a small, closed set of node kinds, and the walk dispatches
//! exhaustively on that kind:
//!
//! | Element | Output |
//! |---|---|
//! | `h1`..`h6` | `hN. text` block |
//! | `b`, `strong` / `i`, `em` | `[b]..[/b]` / `[i]..[/i]` |
//! | `hr` | `[hr]` block |
//! | `img` / `video` | `"[image]":[url]` / `"[video]":[url]` |
//! | `a[href]` | `"text":[url]` |
//! | `ul`, `ol` / `li` | list block / `* ` line |
//! | `br` | line break |
//! | `p`, `div`, `section`, ... | block |
//!
//! Blocks are separated by exactly one blank line, and every output line is
//! trimmed.

use crate::gallery::{self, MediaKind};
use crate::options::TitlePolicy;
use crate::resolver::MediaIndex;
use crate::utils;
use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

static TOP_HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());

/// Commentary extracted from a page or section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentary {
    pub title: String,
    pub body: String,
}

impl Commentary {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Bold,
    Italic,
}

impl Emphasis {
    fn markers(self) -> (&'static str, &'static str) {
        match self {
            Emphasis::Bold => ("[b]", "[/b]"),
            Emphasis::Italic => ("[i]", "[/i]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind<'a> {
    Heading(u8),
    Emphasis(Emphasis),
    Rule,
    Media,
    Link(&'a str),
    LineBreak,
    List,
    ListItem,
    Block,
    Inline,
    Skipped,
}

fn node_kind(element: ElementRef<'_>) -> NodeKind<'_> {
    match element.value().name() {
        "h1" => NodeKind::Heading(1),
        "h2" => NodeKind::Heading(2),
        "h3" => NodeKind::Heading(3),
        "h4" => NodeKind::Heading(4),
        "h5" => NodeKind::Heading(5),
        "h6" => NodeKind::Heading(6),
        "b" | "strong" => NodeKind::Emphasis(Emphasis::Bold),
        "i" | "em" => NodeKind::Emphasis(Emphasis::Italic),
        "hr" => NodeKind::Rule,
        "img" | "video" => NodeKind::Media,
        "a" => match element.value().attr("href") {
            Some(href) if !href.trim().is_empty() => NodeKind::Link(href),
            _ => NodeKind::Inline,
        },
        "br" => NodeKind::LineBreak,
        "ul" | "ol" => NodeKind::List,
        "li" => NodeKind::ListItem,
        "p" | "div" | "section" | "article" | "header" | "footer" | "main" | "nav"
        | "aside" | "blockquote" | "figure" | "figcaption" | "body" | "table" | "tr"
        | "pre" | "address" | "details" | "summary" | "dl" | "dt" | "dd" => NodeKind::Block,
        "script" | "style" | "noscript" | "template" | "head" | "title" | "meta" | "link"
        | "svg" | "iframe" | "form" | "input" | "button" | "select" | "textarea" | "audio"
        | "source" | "track" | "object" | "embed" | "canvas" | "map" => NodeKind::Skipped,
        _ => NodeKind::Inline,
    }
}

fn contains_media(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| matches!(el.value().name(), "img" | "video"))
}

struct Normalizer<'a> {
    base_url: &'a Url,
    media_index: &'a MediaIndex,
    /// Heading promoted to the title, left out of the body
    skip: Option<ElementRef<'a>>,
    out: String,
    /// Line prefix (`h1. `, `* `) written before the line's first content
    pending_prefix: Option<String>,
    /// Whether the current line holds content
    line_open: bool,
    list_depth: usize,
    list_item_depth: usize,
    /// Inside a heading or link text: no line structure allowed
    inline_depth: usize,
}

impl<'a> Normalizer<'a> {
    fn new(base_url: &'a Url, media_index: &'a MediaIndex, skip: Option<ElementRef<'a>>) -> Self {
        Self {
            base_url,
            media_index,
            skip,
            out: String::new(),
            pending_prefix: None,
            line_open: false,
            list_depth: 0,
            list_item_depth: 0,
            inline_depth: 0,
        }
    }

    fn flat(&self) -> bool {
        self.inline_depth > 0
    }

    fn in_list_item(&self) -> bool {
        self.list_item_depth > 0
    }

    fn write_prefix(&mut self) {
        if let Some(prefix) = self.pending_prefix.take() {
            self.out.push_str(&prefix);
        }
    }

    fn push_inline(&mut self, text: &str) {
        let text = if self.line_open { text } else { text.trim_start() };
        if text.is_empty() {
            return;
        }
        self.write_prefix();
        self.out.push_str(text);
        self.line_open = true;
    }

    fn end_line(&mut self) {
        if self.line_open {
            self.out.push('\n');
            self.line_open = false;
        }
    }

    fn line_break(&mut self) {
        if self.flat() {
            self.push_inline(" ");
            return;
        }
        if self.in_list_item() {
            self.end_line();
            return;
        }
        self.out.push('\n');
        self.line_open = false;
    }

    // Inside a list item, blocks continue on unprefixed lines under the bullet.
    fn block_break(&mut self) {
        if self.flat() {
            self.push_inline(" ");
            return;
        }
        if self.in_list_item() {
            self.end_line();
            return;
        }
        self.pending_prefix = None;
        self.line_open = false;
        if self.out.is_empty() {
            return;
        }
        let trailing = self.out.chars().rev().take_while(|&c| c == '\n').count();
        for _ in trailing..2 {
            self.out.push('\n');
        }
    }

    fn visit_children(&mut self, element: ElementRef<'a>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    let collapsed = utils::collapse_source_whitespace(text);
                    self.push_inline(&collapsed);
                }
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.visit_element(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_element(&mut self, element: ElementRef<'a>) {
        if self.skip == Some(element) {
            return;
        }

        match node_kind(element) {
            NodeKind::Heading(level) => self.visit_heading(element, level),
            NodeKind::Emphasis(emphasis) => self.visit_emphasis(element, emphasis),
            NodeKind::Rule => {
                self.block_break();
                self.push_inline("[hr]");
                self.block_break();
            }
            NodeKind::Media => self.visit_media(element),
            NodeKind::Link(href) => self.visit_link(element, href),
            NodeKind::LineBreak => self.line_break(),
            NodeKind::List => self.visit_list(element),
            NodeKind::ListItem => self.visit_list_item(element),
            NodeKind::Block => {
                self.block_break();
                self.visit_children(element);
                self.block_break();
            }
            NodeKind::Inline => self.visit_children(element),
            NodeKind::Skipped => {}
        }
    }

    fn visit_heading(&mut self, element: ElementRef<'a>, level: u8) {
        if self.flat() || self.in_list_item() {
            self.visit_children(element);
            return;
        }
        self.block_break();
        self.pending_prefix = Some(format!("h{level}. "));
        self.inline_depth += 1;
        self.visit_children(element);
        self.inline_depth -= 1;
        self.block_break();
    }

    fn visit_emphasis(&mut self, element: ElementRef<'a>, emphasis: Emphasis) {
        let (open, close) = emphasis.markers();
        let mark = self.out.len();
        let prefix = self.pending_prefix.clone();

        self.write_prefix();
        self.out.push_str(open);
        let after_open = self.out.len();
        self.visit_children(element);

        let inner = self.out.split_off(after_open);
        if inner.trim().is_empty() {
            self.out.truncate(mark);
            self.pending_prefix = prefix;
            if inner.contains('\n') {
                self.out.push_str(&inner);
            } else if !inner.is_empty() && !self.out.ends_with(char::is_whitespace) {
                self.out.push(' ');
            }
        } else {
            self.out.push_str(&inner);
            self.out.push_str(close);
        }
    }

    fn visit_media(&mut self, element: ElementRef<'a>) {
        let Some((raw, kind)) = gallery::media_reference(element, self.base_url) else {
            return;
        };
        let url = self.media_index.resolve(&raw);
        let label = match kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        };
        self.push_inline(&format!("\"[{label}]\":[{url}]"));
    }

    fn visit_link(&mut self, element: ElementRef<'a>, href: &str) {
        // Lightbox thumbnails: the wrapped media is the content.
        if contains_media(element) {
            self.visit_children(element);
            return;
        }
        let Some(target) = utils::resolve_link(self.base_url, href) else {
            self.visit_children(element);
            return;
        };

        let mut text = Normalizer::new(self.base_url, self.media_index, self.skip);
        text.inline_depth = 1;
        text.visit_children(element);
        let text = utils::collapse_whitespace(&text.out);

        if text.is_empty() {
            self.push_inline(target.as_str());
        } else {
            self.push_inline(&format!("\"{text}\":[{target}]"));
        }
    }

    fn visit_list(&mut self, element: ElementRef<'a>) {
        let nested = self.list_item_depth > 0;
        if nested {
            self.end_line();
        } else {
            self.block_break();
        }
        self.list_depth += 1;
        self.visit_children(element);
        self.list_depth -= 1;
        if !nested {
            self.block_break();
        }
    }

    fn visit_list_item(&mut self, element: ElementRef<'a>) {
        self.end_line();
        self.pending_prefix = Some(format!("{} ", "*".repeat(self.list_depth.max(1))));
        self.list_item_depth += 1;
        self.visit_children(element);
        self.list_item_depth -= 1;
        self.pending_prefix = None;
    }

    fn finish(self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for line in self.out.lines() {
            let line = line.trim();
            if line.is_empty() && lines.last().map_or(true, |last| last.is_empty()) {
                continue;
            }
            lines.push(line);
        }
        while lines.last() == Some(&"") {
            lines.pop();
        }
        lines.join("\n")
    }
}

/// Normalize a standalone HTML fragment into markup.
///
/// Image references are rewritten through `media_index`; unknown images keep
/// their own URL without query string.
pub fn normalize(html_fragment: &str, base_url: &Url, media_index: &MediaIndex) -> String {
    let fragment = Html::parse_fragment(html_fragment);
    normalize_section(
        fragment.root_element(),
        base_url,
        media_index,
        TitlePolicy::Inline,
    )
    .body
}

/// Normalize everything under `root`, splitting out a title per `policy`.
pub fn normalize_section(
    root: ElementRef<'_>,
    base_url: &Url,
    media_index: &MediaIndex,
    policy: TitlePolicy,
) -> Commentary {
    let title_heading = match policy {
        TitlePolicy::Inline => None,
        TitlePolicy::FirstTopLevelHeading => root.select(&TOP_HEADING_SELECTOR).next(),
    };
    let title = title_heading
        .map(|heading| utils::collapse_whitespace(&heading.text().collect::<String>()))
        .unwrap_or_default();

    let mut normalizer = Normalizer::new(base_url, media_index, title_heading);
    normalizer.visit_element(root);

    Commentary {
        title,
        body: normalizer.finish(),
    }
}
