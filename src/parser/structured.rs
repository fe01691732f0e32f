//! Structure-aware segmentation for documents without a dedicated extractor.
//!
//! The text is partitioned into typed elements (titles, narrative paragraphs, list items,
//! tables) and then grouped into sections that start at every title. Sections are capped at a
//! character budget; an element that alone exceeds the budget is split on word boundaries.

use std::fmt;

/// Kind of structural element detected in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Heading line.
    Title,
    /// Ordinary paragraph text.
    NarrativeText,
    /// Bullet or numbered list entry.
    ListItem,
    /// Tabular data.
    Table,
}

impl ElementKind {
    /// Label recorded as `element_type` in chunk metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::NarrativeText => "NarrativeText",
            Self::ListItem => "ListItem",
            Self::Table => "Table",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed span of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Detected kind.
    pub kind: ElementKind,
    /// Normalized text.
    pub text: String,
}

impl Element {
    fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A group of elements that becomes one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Kind of the element that opened the section.
    pub element_type: ElementKind,
    /// Section text, elements separated by blank lines.
    pub text: String,
}

/// Markup conventions used to detect elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// `#` headings, `-`/`*`/numbered lists, `|` tables.
    Markdown,
    /// HTML tags.
    Html,
    /// Comma separated rows.
    Csv,
    /// Blank-line separated paragraphs and list items.
    Plain,
}

impl Markup {
    /// Pick the conventions for a lowercase extension without the dot.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "md" | "markdown" => Self::Markdown,
            "html" | "htm" | "xhtml" => Self::Html,
            "csv" => Self::Csv,
            _ => Self::Plain,
        }
    }
}

/// Partition and group `text` into sections of at most `max_characters` characters.
pub fn segment(text: &str, markup: Markup, max_characters: usize) -> Vec<Section> {
    chunk_by_title(partition(text, markup), max_characters)
}

/// Split text into typed elements following the given markup conventions.
pub fn partition(text: &str, markup: Markup) -> Vec<Element> {
    match markup {
        Markup::Markdown => partition_lines(text, true),
        Markup::Plain => partition_lines(text, false),
        Markup::Html => partition_html(text),
        Markup::Csv => partition_csv(text),
    }
}

/// Group elements into sections, opening a new section at each title.
pub fn chunk_by_title(elements: Vec<Element>, max_characters: usize) -> Vec<Section> {
    let max_characters = max_characters.max(1);
    let mut sections = Vec::new();
    let mut current: Option<(ElementKind, String)> = None;

    for element in elements {
        let text = element.text.trim();
        if text.is_empty() {
            continue;
        }
        let length = text.chars().count();

        if element.kind == ElementKind::Table {
            flush(&mut current, &mut sections);
            push_split(&mut sections, ElementKind::Table, text, max_characters);
            continue;
        }

        if element.kind == ElementKind::Title {
            flush(&mut current, &mut sections);
        }

        let buffered = current
            .as_ref()
            .map_or(0, |(_, buffer)| buffer.chars().count());
        if buffered > 0 && buffered + 2 + length > max_characters {
            flush(&mut current, &mut sections);
        }

        if length > max_characters {
            flush(&mut current, &mut sections);
            push_split(&mut sections, element.kind, text, max_characters);
            continue;
        }

        match current.as_mut() {
            Some((_, buffer)) => {
                buffer.push_str("\n\n");
                buffer.push_str(text);
            }
            None => current = Some((element.kind, text.to_string())),
        }
    }

    flush(&mut current, &mut sections);
    sections
}

fn flush(current: &mut Option<(ElementKind, String)>, sections: &mut Vec<Section>) {
    if let Some((element_type, text)) = current.take() {
        sections.push(Section { element_type, text });
    }
}

fn push_split(sections: &mut Vec<Section>, kind: ElementKind, text: &str, max: usize) {
    for piece in split_on_words(text, max) {
        sections.push(Section {
            element_type: kind,
            text: piece,
        });
    }
}

/// Pack words into pieces of at most `max` characters, hard-splitting oversized words.
fn split_on_words(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if chars.len() > max {
            if !buffer.is_empty() {
                pieces.push(std::mem::take(&mut buffer));
                buffer_len = 0;
            }
            for slice in chars.chunks(max) {
                pieces.push(slice.iter().collect());
            }
            continue;
        }
        let needed = if buffer.is_empty() {
            chars.len()
        } else {
            buffer_len + 1 + chars.len()
        };
        if needed > max {
            pieces.push(std::mem::take(&mut buffer));
            buffer_len = 0;
        }
        if !buffer.is_empty() {
            buffer.push(' ');
            buffer_len += 1;
        }
        buffer.push_str(word);
        buffer_len += chars.len();
    }

    if !buffer.is_empty() {
        pieces.push(buffer);
    }
    pieces
}

fn partition_lines(text: &str, markdown: bool) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut table: Vec<&str> = Vec::new();

    fn flush_paragraph(paragraph: &mut Vec<&str>, elements: &mut Vec<Element>) {
        if !paragraph.is_empty() {
            elements.push(Element::new(ElementKind::NarrativeText, paragraph.join(" ")));
            paragraph.clear();
        }
    }
    fn flush_table(table: &mut Vec<&str>, elements: &mut Vec<Element>) {
        if !table.is_empty() {
            elements.push(Element::new(ElementKind::Table, table.join("\n")));
            table.clear();
        }
    }

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            flush_paragraph(&mut paragraph, &mut elements);
            flush_table(&mut table, &mut elements);
            continue;
        }

        if markdown && line.starts_with('|') {
            flush_paragraph(&mut paragraph, &mut elements);
            if !is_table_rule(line) {
                table.push(line);
            }
            continue;
        }
        flush_table(&mut table, &mut elements);

        if let Some(title) = markdown.then(|| markdown_heading(line)).flatten() {
            flush_paragraph(&mut paragraph, &mut elements);
            elements.push(Element::new(ElementKind::Title, title));
            continue;
        }

        if let Some(item) = list_item(line) {
            flush_paragraph(&mut paragraph, &mut elements);
            elements.push(Element::new(ElementKind::ListItem, item));
            continue;
        }

        paragraph.push(line);
    }

    flush_paragraph(&mut paragraph, &mut elements);
    flush_table(&mut table, &mut elements);
    elements
}

fn markdown_heading(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.starts_with(' ') || rest.is_empty() {
            let title = rest.trim().trim_end_matches('#').trim();
            return (!title.is_empty()).then_some(title);
        }
    }
    None
}

fn list_item(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "+ ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(item) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(item.trim());
        }
    }
    None
}

fn is_table_rule(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '+'))
}

const HTML_SKIPPED: [&str; 4] = ["script", "style", "head", "noscript"];
const HTML_BLOCKS: [&str; 18] = [
    "p", "div", "br", "section", "article", "header", "footer", "main", "nav", "aside", "ul",
    "ol", "pre", "blockquote", "body", "html", "dl", "hr",
];

fn partition_html(html: &str) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut buffer = String::new();
    let mut kind = ElementKind::NarrativeText;
    let mut table_depth = 0usize;
    let mut skip_until: Option<String> = None;
    let mut rest = html;

    while !rest.is_empty() {
        let Some(open) = rest.find('<') else {
            if skip_until.is_none() {
                buffer.push_str(rest);
            }
            break;
        };
        if skip_until.is_none() {
            buffer.push_str(&rest[..open]);
        }
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            if skip_until.is_none() {
                buffer.push_str(&rest[open..]);
            }
            break;
        };
        let tag = &after[..close];
        rest = &after[close + 1..];

        let (closing, name) = tag_name(tag);
        if name.is_empty() {
            continue;
        }

        if let Some(skipped) = skip_until.as_deref() {
            if closing && name == skipped {
                skip_until = None;
            }
            continue;
        }
        if !closing && HTML_SKIPPED.contains(&name.as_str()) && !tag.ends_with('/') {
            skip_until = Some(name);
            continue;
        }

        if name == "table" {
            if closing {
                table_depth = table_depth.saturating_sub(1);
                if table_depth == 0 {
                    emit_html(&mut elements, &mut buffer, ElementKind::Table);
                    kind = ElementKind::NarrativeText;
                }
            } else {
                if table_depth == 0 {
                    emit_html(&mut elements, &mut buffer, kind);
                }
                table_depth += 1;
            }
            continue;
        }
        if table_depth > 0 {
            match name.as_str() {
                "tr" if closing => buffer.push('\n'),
                "td" | "th" => buffer.push(' '),
                _ => {}
            }
            continue;
        }

        let heading = name.len() == 2
            && name.starts_with('h')
            && name[1..].chars().all(|c| ('1'..='6').contains(&c));
        if heading || name == "li" || name == "title" {
            emit_html(&mut elements, &mut buffer, kind);
            kind = if closing {
                ElementKind::NarrativeText
            } else if name == "li" {
                ElementKind::ListItem
            } else {
                ElementKind::Title
            };
        } else if HTML_BLOCKS.contains(&name.as_str()) {
            emit_html(&mut elements, &mut buffer, kind);
        } else {
            buffer.push(' ');
        }
    }

    let trailing = if table_depth > 0 {
        ElementKind::Table
    } else {
        kind
    };
    emit_html(&mut elements, &mut buffer, trailing);
    elements
}

fn tag_name(tag: &str) -> (bool, String) {
    let tag = tag.trim();
    if tag.starts_with('!') || tag.starts_with('?') {
        return (false, String::new());
    }
    let (closing, body) = match tag.strip_prefix('/') {
        Some(body) => (true, body),
        None => (false, tag),
    };
    let name: String = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    (closing, name)
}

fn emit_html(elements: &mut Vec<Element>, buffer: &mut String, kind: ElementKind) {
    let decoded = decode_entities(buffer);
    buffer.clear();
    let text = if kind == ElementKind::Table {
        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    };
    if !text.is_empty() {
        elements.push(Element::new(kind, text));
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn partition_csv(text: &str) -> Vec<Element> {
    let rows: Vec<String> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            split_csv_row(line)
                .iter()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        Vec::new()
    } else {
        vec![Element::new(ElementKind::Table, rows.join("\n"))]
    }
}

fn split_csv_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell)),
            other => cell.push(other),
        }
    }
    cells.push(cell);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_sections_start_at_each_heading() {
        let text = "# Intro\n\nFirst paragraph\ncontinues here.\n\n## Details\n\n- one\n- two\n\nClosing words.";
        let sections = segment(text, Markup::Markdown, 1000);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].element_type, ElementKind::Title);
        assert_eq!(sections[0].text, "Intro\n\nFirst paragraph continues here.");
        assert_eq!(sections[1].text, "Details\n\none\n\ntwo\n\nClosing words.");
    }

    #[test]
    fn text_before_first_heading_is_narrative() {
        let sections = segment("Preamble text.\n\n# Heading\nBody", Markup::Markdown, 1000);
        assert_eq!(sections[0].element_type, ElementKind::NarrativeText);
        assert_eq!(sections[0].text, "Preamble text.");
        assert_eq!(sections[1].element_type, ElementKind::Title);
    }

    #[test]
    fn sections_respect_the_character_budget() {
        let paragraph = "word ".repeat(30);
        let text = format!("# Title\n\n{paragraph}\n\n{paragraph}");
        let sections = segment(&text, Markup::Markdown, 60);
        assert!(sections.len() > 2);
        for section in &sections {
            assert!(section.text.chars().count() <= 60, "{section:?}");
        }
    }

    #[test]
    fn oversized_words_are_hard_split() {
        let pieces = split_on_words(&"x".repeat(25), 10);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2], "xxxxx");
    }

    #[test]
    fn html_headings_lists_and_tables_are_detected() {
        let html = "<html><head><title>ignored</title><style>p{}</style></head><body>\
            <h1>Policy &amp; Rules</h1><p>Claims are <b>reviewed</b> weekly.</p>\
            <ul><li>Verify eligibility</li></ul>\
            <table><tr><th>Code</th><th>Meaning</th></tr><tr><td>A1</td><td>Denied</td></tr></table>\
            <script>var x = 1;</script></body></html>";
        let elements = partition(html, Markup::Html);
        let kinds: Vec<ElementKind> = elements.iter().map(|element| element.kind).collect();

        assert_eq!(
            kinds,
            vec![
                ElementKind::Title,
                ElementKind::NarrativeText,
                ElementKind::ListItem,
                ElementKind::Table
            ]
        );
        assert_eq!(elements[0].text, "Policy & Rules");
        assert_eq!(elements[1].text, "Claims are reviewed weekly.");
        assert_eq!(elements[3].text, "Code Meaning\nA1 Denied");
        assert!(elements.iter().all(|element| !element.text.contains("var x")));
    }

    #[test]
    fn csv_becomes_a_table_with_quoted_cells() {
        let elements = partition("code,description\nA1,\"Denied, resubmit\"\n\n", Markup::Csv);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::Table);
        assert_eq!(elements[0].text, "code description\nA1 Denied, resubmit");
    }

    #[test]
    fn plain_text_does_not_treat_hashes_as_headings() {
        let elements = partition("#hashtag line\n\n1. first step", Markup::Plain);
        assert_eq!(elements[0].kind, ElementKind::NarrativeText);
        assert_eq!(elements[1].kind, ElementKind::ListItem);
        assert_eq!(elements[1].text, "first step");
    }
}
