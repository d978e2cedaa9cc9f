//! Streaming extraction of markdown and embeddable sections from Wikipedia
//! page HTML.
//!
//! [`SectionParser`] is an explicit state machine driven by `lol_html`'s
//! streaming events. It renders article content into an ordered markdown
//! stream and, in the same pass, collects [`Section`]s — one per paragraph or
//! list, keyed by the path of enclosing headings. Navigational markup never
//! reaches either output: `<style>` and `<table>` subtrees, the category
//! links container, and `<footer>` are excluded wholesale.
//!
//! Capture only begins once the page title (the first `<h1>`) has closed, and
//! lists are only honored after at least one paragraph — Wikipedia chrome
//! above and below the article body falls out naturally. Unbalanced markup is
//! tolerated everywhere except for `<style>`/`<table>`: a dangling exclusion
//! region would silently swallow article text, so that case fails the parse.

use std::sync::Arc;

use html_escape::decode_html_entities;
use lol_html::html_content::Element;
use lol_html::{HtmlRewriter, OutputSink, Settings, element, text};
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::RagError;

/// Heading titles ending in this suffix hold reference-style lists whose
/// items are retrieved individually, so each list item opens its own section.
const NOTES_HEADING_SUFFIX: &str = "Notes";

/// One paragraph or one list, paired with the headings enclosing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Titles of the enclosing headings, outermost first.
    pub heading_path: Vec<String>,
    /// Text slots: a single slot for a paragraph, one slot per list item.
    pub lines: Vec<String>,
}

impl Section {
    /// Renders the section as one embeddable chunk of text.
    pub fn chunk_text(&self) -> String {
        let body = self.lines.join("\n");
        if self.heading_path.is_empty() {
            body
        } else {
            format!("{}: {}", self.heading_path.join(" > "), body)
        }
    }
}

/// Result of a full parse: the markdown rendering plus the ordered sections.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub markdown: String,
    pub sections: Vec<Section>,
}

/// Streaming section parser. Feed HTML with [`write`](Self::write), then
/// collect the outputs with [`finish`](Self::finish).
pub struct SectionParser {
    rewriter: HtmlRewriter<'static, NoopSink>,
    state: Arc<Mutex<ParserState>>,
}

impl SectionParser {
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(ParserState::default()));
        let element_state = Arc::clone(&state);
        let text_state = Arc::clone(&state);

        let element_handler = element!("*", move |el: &mut Element<'_, '_>| {
            let tag = el.tag_name().to_ascii_lowercase();
            let class_attr = el.get_attribute("class");
            let action = {
                let mut state = element_state.lock();
                open_tag(&mut state, &tag, class_attr.as_deref())
            };
            if let Some(action) = action {
                let close_state = Arc::clone(&element_state);
                if let Some(handlers) = el.end_tag_handlers() {
                    handlers.push(Box::new(move |_end| {
                        close_tag(&close_state, action);
                        Ok(())
                    }));
                }
            }
            Ok(())
        });

        let text_handler = text!("*", move |chunk| {
            let mut state = text_state.lock();
            if state.excluded() {
                return Ok(());
            }
            let capturing = state.in_heading || state.in_paragraph || state.in_list_item;
            if !capturing {
                return Ok(());
            }
            let data = decode_html_entities(chunk.as_str()).into_owned();
            if data.is_empty() {
                return Ok(());
            }
            if let Some(entry) = state.markdown.last_mut() {
                entry.push_str(&data);
            }
            if state.in_heading {
                if let Some(title) = state.heading_path.last_mut() {
                    title.push_str(&data);
                }
            } else if let Some(section) = state.sections.last_mut() {
                if let Some(line) = section.lines.last_mut() {
                    line.push_str(&data);
                }
            }
            Ok(())
        });

        let rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element_handler, text_handler],
                ..Settings::default()
            },
            NoopSink,
        );

        Self { rewriter, state }
    }

    /// Feeds a chunk of HTML into the parser.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RagError> {
        self.rewriter
            .write(chunk)
            .map_err(|err| RagError::Parse(err.to_string()))
    }

    /// Finalizes the stream and returns the markdown and sections.
    ///
    /// Fails if any `<style>` or `<table>` region was left open: an
    /// unbalanced exclusion region means captured text can no longer be
    /// trusted.
    pub fn finish(self) -> Result<ParsedPage, RagError> {
        let SectionParser { rewriter, state } = self;
        rewriter
            .end()
            .map_err(|err| RagError::Parse(err.to_string()))?;

        let state = Arc::try_unwrap(state)
            .map_err(|_| RagError::Parse("parser state still shared after end".into()))?
            .into_inner();

        if state.style_depth != 0 || state.table_depth != 0 {
            return Err(RagError::Parse(format!(
                "unbalanced exclusion region: {} style and {} table tag(s) left open",
                state.style_depth, state.table_depth
            )));
        }

        Ok(ParsedPage {
            markdown: state.markdown.concat(),
            sections: state.sections,
        })
    }
}

impl Default for SectionParser {
    fn default() -> Self {
        SectionParser::new()
    }
}

/// Parses a complete HTML document in one call.
pub fn parse_page(html: &str) -> Result<ParsedPage, RagError> {
    let mut parser = SectionParser::new();
    parser.write(html.as_bytes())?;
    parser.finish()
}

/// Markdown marker style for the innermost open list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMarker {
    Bullet,
    Numbered,
}

impl ListMarker {
    fn render(self) -> &'static str {
        match self {
            ListMarker::Bullet => "* ",
            ListMarker::Numbered => "1. ",
        }
    }
}

/// Close behavior recorded when a tag opens, replayed by its end-tag handler.
#[derive(Debug, Clone, Copy)]
enum OpenTag {
    Style,
    Table,
    Categories,
    Footer,
    Heading { level: usize },
    Paragraph,
    List,
    Item,
}

#[derive(Debug, Default)]
struct ParserState {
    style_depth: usize,
    table_depth: usize,
    category_depth: usize,
    footer_depth: usize,
    in_heading: bool,
    title_seen: bool,
    in_paragraph: bool,
    paragraph_seen: bool,
    in_list_item: bool,
    open_lists: Vec<ListMarker>,
    markdown: Vec<String>,
    heading_path: Vec<String>,
    sections: Vec<Section>,
}

impl ParserState {
    /// True while inside any region whose text must not be captured.
    fn excluded(&self) -> bool {
        self.style_depth > 0
            || self.table_depth > 0
            || self.category_depth > 0
            || self.footer_depth > 0
    }

    /// Exclusion flags that gate opening paragraphs and lists.
    fn blocks_content(&self) -> bool {
        self.table_depth > 0 || self.category_depth > 0 || self.footer_depth > 0
    }
}

fn open_tag(state: &mut ParserState, tag: &str, class_attr: Option<&str>) -> Option<OpenTag> {
    if let Some(level) = heading_level(tag) {
        if !(state.title_seen || level == 1) {
            return None;
        }
        state.in_heading = true;
        state.markdown.push(format!("{} ", "#".repeat(level)));
        state.heading_path.truncate(level - 1);
        state.heading_path.push(String::new());
        return Some(OpenTag::Heading { level });
    }

    match tag {
        "style" => {
            state.style_depth += 1;
            Some(OpenTag::Style)
        }
        "table" => {
            state.table_depth += 1;
            Some(OpenTag::Table)
        }
        "div" if class_attr == Some("catlinks") => {
            state.category_depth += 1;
            Some(OpenTag::Categories)
        }
        "footer" => {
            state.footer_depth += 1;
            Some(OpenTag::Footer)
        }
        "p" if state.title_seen && !state.blocks_content() => {
            state.in_paragraph = true;
            state.markdown.push(String::new());
            let heading_path = state.heading_path.clone();
            state.sections.push(Section {
                heading_path,
                lines: vec![String::new()],
            });
            Some(OpenTag::Paragraph)
        }
        "ul" | "ol"
            if state.title_seen && state.paragraph_seen && !state.blocks_content() =>
        {
            if state.open_lists.is_empty() {
                let heading_path = state.heading_path.clone();
                state.sections.push(Section {
                    heading_path,
                    lines: Vec::new(),
                });
            }
            let marker = if tag == "ul" {
                ListMarker::Bullet
            } else {
                ListMarker::Numbered
            };
            state.open_lists.push(marker);
            Some(OpenTag::List)
        }
        "li" => {
            let marker = state.open_lists.last().copied()?;
            state.in_list_item = true;
            state.markdown.push(marker.render().to_string());
            let split_item = state
                .heading_path
                .last()
                .is_some_and(|title| title.ends_with(NOTES_HEADING_SUFFIX));
            if split_item {
                let heading_path = state.heading_path.clone();
                state.sections.push(Section {
                    heading_path,
                    lines: vec![marker.render().to_string()],
                });
            } else if let Some(section) = state.sections.last_mut() {
                section.lines.push(marker.render().to_string());
            }
            Some(OpenTag::Item)
        }
        _ => None,
    }
}

fn close_tag(state: &Mutex<ParserState>, action: OpenTag) {
    let mut state = state.lock();
    match action {
        OpenTag::Style => state.style_depth = state.style_depth.saturating_sub(1),
        OpenTag::Table => state.table_depth = state.table_depth.saturating_sub(1),
        OpenTag::Categories => state.category_depth = state.category_depth.saturating_sub(1),
        OpenTag::Footer => state.footer_depth = state.footer_depth.saturating_sub(1),
        OpenTag::Heading { level } => {
            if let Some(entry) = state.markdown.last_mut() {
                entry.push('\n');
            }
            state.in_heading = false;
            if level == 1 {
                state.title_seen = true;
            }
        }
        OpenTag::Paragraph => {
            if let Some(entry) = state.markdown.last_mut() {
                entry.push('\n');
            }
            state.in_paragraph = false;
            state.paragraph_seen = true;
        }
        OpenTag::List => {
            state.open_lists.pop();
        }
        OpenTag::Item => {
            if let Some(entry) = state.markdown.last_mut() {
                entry.push('\n');
            }
            state.in_list_item = false;
        }
    }
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

struct NoopSink;

impl OutputSink for NoopSink {
    fn handle_chunk(&mut self, _chunk: &[u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_paragraph_render_markdown() {
        let page = parse_page("<h1>Example</h1><p>Hello world</p>").unwrap();
        assert_eq!(page.markdown, "# Example\nHello world\n");
        assert_eq!(
            page.sections,
            vec![Section {
                heading_path: vec!["Example".to_string()],
                lines: vec!["Hello world".to_string()],
            }]
        );
        assert_eq!(page.sections[0].chunk_text(), "Example: Hello world");
    }

    #[test]
    fn heading_path_truncates_to_heading_level() {
        let page = parse_page(
            "<h1>A</h1><h2>B</h2><p>under b</p><h2>C</h2><p>under c</p>",
        )
        .unwrap();
        let last = page.sections.last().unwrap();
        assert_eq!(last.heading_path, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(page.markdown, "# A\n## B\nunder b\n## C\nunder c\n");
    }

    #[test]
    fn table_inside_paragraph_never_leaks() {
        let page = parse_page(
            "<h1>T</h1><p>before<table><tr><td>cell</td></tr></table>after</p>",
        )
        .unwrap();
        assert_eq!(page.markdown, "# T\nbeforeafter\n");
        assert_eq!(page.sections[0].lines, vec!["beforeafter".to_string()]);
        assert!(!page.markdown.contains("cell"));
    }

    #[test]
    fn content_before_first_title_is_ignored() {
        let page = parse_page("<p>skip me</p><h2>early</h2><h1>T</h1><p>keep</p>").unwrap();
        assert_eq!(page.markdown, "# T\nkeep\n");
        assert_eq!(page.sections.len(), 1);
        assert_eq!(page.sections[0].heading_path, vec!["T".to_string()]);
    }

    #[test]
    fn lists_share_one_section_and_render_markers() {
        let page = parse_page(
            "<h1>T</h1><p>intro</p><ul><li>one</li><li>two</li></ul>\
             <ol><li>first</li></ol>",
        )
        .unwrap();
        assert_eq!(
            page.markdown,
            "# T\nintro\n* one\n* two\n1. first\n"
        );
        // intro paragraph + one section per list
        assert_eq!(page.sections.len(), 3);
        assert_eq!(
            page.sections[1].lines,
            vec!["* one".to_string(), "* two".to_string()]
        );
        assert_eq!(page.sections[2].lines, vec!["1. first".to_string()]);
        assert_eq!(page.sections[1].chunk_text(), "T: * one\n* two");
    }

    #[test]
    fn list_without_preceding_paragraph_is_ignored() {
        let page = parse_page("<h1>T</h1><ul><li>orphan</li></ul>").unwrap();
        assert_eq!(page.markdown, "# T\n");
        assert!(page.sections.is_empty());
    }

    #[test]
    fn notes_heading_splits_list_items_into_sections() {
        let page = parse_page(
            "<h1>T</h1><h2>Notes</h2><p>intro</p><ul><li>ref one</li><li>ref two</li></ul>",
        )
        .unwrap();
        let item_sections: Vec<&Section> = page
            .sections
            .iter()
            .filter(|s| s.lines.first().is_some_and(|l| l.starts_with("* ref")))
            .collect();
        assert_eq!(item_sections.len(), 2);
        assert_eq!(item_sections[0].lines, vec!["* ref one".to_string()]);
        assert_eq!(item_sections[1].lines, vec!["* ref two".to_string()]);
        assert_eq!(
            item_sections[0].heading_path,
            vec!["T".to_string(), "Notes".to_string()]
        );
    }

    #[test]
    fn category_container_and_footer_are_excluded() {
        let page = parse_page(
            "<h1>T</h1><p>body</p>\
             <div class=\"catlinks\"><p>category soup</p></div>\
             <footer><p>footer text</p></footer>",
        )
        .unwrap();
        assert_eq!(page.markdown, "# T\nbody\n");
        assert_eq!(page.sections.len(), 1);
    }

    #[test]
    fn style_content_never_leaks() {
        let page =
            parse_page("<h1>T</h1><style>.infobox { display: none; }</style><p>ok</p>").unwrap();
        assert_eq!(page.markdown, "# T\nok\n");
    }

    #[test]
    fn unbalanced_table_is_a_parse_error() {
        let err = parse_page("<h1>T</h1><table><tr><td>stuck").unwrap_err();
        assert!(matches!(err, RagError::Parse(_)));
    }

    #[test]
    fn unclosed_paragraph_is_tolerated() {
        let page = parse_page("<h1>T</h1><p>tail").unwrap();
        assert_eq!(page.markdown, "# T\ntail");
        assert_eq!(page.sections[0].lines, vec!["tail".to_string()]);
    }

    #[test]
    fn entities_are_decoded() {
        let page = parse_page("<h1>A &amp; B</h1><p>x &lt; y</p>").unwrap();
        assert_eq!(page.markdown, "# A & B\nx < y\n");
        assert_eq!(page.sections[0].heading_path, vec!["A & B".to_string()]);
    }

    #[test]
    fn nested_list_items_keep_their_own_markers() {
        let page = parse_page(
            "<h1>T</h1><p>i</p><ul><li>a<ol><li>n</li></ol></li><li>b</li></ul>",
        )
        .unwrap();
        let list_section = page.sections.last().unwrap();
        assert_eq!(
            list_section.lines,
            vec!["* a".to_string(), "1. n".to_string(), "* b".to_string()]
        );
    }

    #[test]
    fn streaming_feed_matches_single_pass() {
        let html = "<h1>Example</h1><p>Hello world</p><ul></ul>";
        let whole = parse_page(html).unwrap();

        let mut parser = SectionParser::new();
        for chunk in html.as_bytes().chunks(7) {
            parser.write(chunk).unwrap();
        }
        let streamed = parser.finish().unwrap();
        assert_eq!(streamed, whole);
    }
}
