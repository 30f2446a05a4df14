use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::{DomElement, DomParser};

/// Elements that never have children, so a start tag is never closed
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw-text blocks whose content is not markup and confuses an XML reader
static RAW_TEXT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});

static DECIMAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d+);").unwrap());
static HEX_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#[xX]([0-9A-Fa-f]+);").unwrap());

/// Decode common HTML entities in a string
/// Handles: &amp; &lt; &gt; &quot; &apos; &nbsp; &#NNN; (decimal) &#xHHH; (hex)
fn decode_html_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut result = s
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    result = DECIMAL_ENTITY
        .replace_all(&result, |caps: &Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string();

    result = HEX_ENTITY
        .replace_all(&result, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string();

    // Last, so "&amp;lt;" stays "&lt;"
    result.replace("&amp;", "&")
}

/// Normalize text: replace NBSP with space, collapse whitespace, trim
fn normalize_text(s: &str) -> String {
    s.replace('\u{00A0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lenient HTML reader built on quick-xml.
///
/// Real pages are rarely well-formed XML, so end-tag names are not checked,
/// void elements are never pushed on the open-element stack and attributes are
/// read with HTML rules (unquoted and valueless attributes allowed).
#[derive(Debug, Clone, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    fn open_element(e: &quick_xml::events::BytesStart<'_>) -> DomElement {
        let tag = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
        let mut element = DomElement::new(&tag);

        for attr in e.html_attributes().with_checks(false).filter_map(|a| a.ok()) {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
            let value = decode_html_entities(&String::from_utf8_lossy(&attr.value));
            element.attributes.push((key, value));
        }

        element
    }
}

impl DomParser for HtmlParser {
    fn parse(&self, markup: &str) -> Vec<DomElement> {
        let cleaned = RAW_TEXT_BLOCKS.replace_all(markup, "");

        let mut elements: Vec<DomElement> = Vec::new();
        // Indices into `elements` of currently open tags
        let mut open: Vec<usize> = Vec::new();

        let mut reader = Reader::from_str(&cleaned);
        reader.trim_text(true);
        reader.check_end_names(false);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let element = Self::open_element(e);
                    let is_void = VOID_TAGS.contains(&element.tag.as_str());
                    elements.push(element);
                    if !is_void {
                        open.push(elements.len() - 1);
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    elements.push(Self::open_element(e));
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                    // Close up to the matching tag; stray end tags are ignored
                    if let Some(pos) = open.iter().rposition(|&idx| elements[idx].tag == name) {
                        open.truncate(pos);
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let raw = String::from_utf8_lossy(&**e);
                    let text = normalize_text(&decode_html_entities(&raw));
                    if let (false, Some(&idx)) = (text.is_empty(), open.last()) {
                        let owner = &mut elements[idx];
                        if !owner.text.is_empty() {
                            owner.text.push(' ');
                        }
                        owner.text.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    debug!(
                        "Markup parse stopped at byte {}: {:?}; keeping {} elements",
                        reader.buffer_position(),
                        e,
                        elements.len()
                    );
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        elements
    }
}
