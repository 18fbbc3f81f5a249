//! Raw HTML tag scanning using html5ever's tokenizer.
//!
//! Script injection has to edit `index.html` in place without reserializing
//! the document (authoring tools emit markup a DOM round trip would mangle),
//! so tags are located by byte offset and each candidate is handed to
//! html5ever to get its name and attributes.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

/// Parsed information about an HTML tag.
#[derive(Debug, Clone)]
pub struct HtmlTagInfo {
    /// The tag name (lowercased by html5ever).
    pub name: String,
    /// Attributes as (name, value) pairs.
    pub attrs: Vec<(String, String)>,
    /// Whether this is an end tag (`</tag>`).
    pub is_end: bool,
    /// Whether the tag is self-closing (`<br/>`) or a known HTML5 void element.
    pub is_void: bool,
}

impl HtmlTagInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A tag found in a document, with its byte span `start..end`.
#[derive(Debug, Clone)]
pub struct RawTag {
    pub start: usize,
    pub end: usize,
    pub info: HtmlTagInfo,
}

/// HTML5 void elements (self-closing by spec).
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is raw text; tags inside them are not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Tokenize a raw HTML tag string (e.g. `<div class="foo">` or `</div>`)
/// into structured tag info.
pub fn tokenize_html_tag(raw: &str) -> Option<HtmlTagInfo> {
    struct TagSink {
        tag: RefCell<Option<Tag>>,
    }

    impl TokenSink for TagSink {
        type Handle = ();

        fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
            if let Token::TagToken(tag) = token {
                *self.tag.borrow_mut() = Some(tag);
            }
            TokenSinkResult::Continue
        }
    }

    let sink = TagSink {
        tag: RefCell::new(None),
    };
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());

    let input = BufferQueue::default();
    input.push_back(StrTendril::from(raw));
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    let tag = tokenizer.sink.tag.into_inner()?;
    let name = tag.name.to_string();
    let is_end = tag.kind == TagKind::EndTag;
    let is_void = tag.self_closing || VOID_ELEMENTS.contains(&name.as_str());

    Some(HtmlTagInfo {
        name,
        attrs: tag
            .attrs
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect(),
        is_end,
        is_void,
    })
}

/// Find every tag in `html`, in document order.
///
/// Comments, doctypes and processing instructions are skipped, as is the
/// content of raw-text elements such as `<script>`.
pub fn find_tags(html: &str) -> Vec<RawTag> {
    let bytes = html.as_bytes();
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        let rest = &html[start..];

        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(html.len(), |i| start + i + 3);
            continue;
        }
        let next = bytes.get(start + 1).copied().unwrap_or(b' ');
        if !(next.is_ascii_alphabetic() || next == b'/') {
            // `<!DOCTYPE`, `<?xml`, or a stray `<` in text.
            pos = match next {
                b'!' | b'?' => rest.find('>').map_or(html.len(), |i| start + i + 1),
                _ => start + 1,
            };
            continue;
        }

        let Some(end) = tag_end(html, start) else {
            break;
        };
        pos = end;
        let Some(info) = tokenize_html_tag(&html[start..end]) else {
            continue;
        };

        if !info.is_end && !info.is_void && RAW_TEXT_ELEMENTS.contains(&info.name.as_str()) {
            let close = format!("</{}", info.name);
            pos = find_ignore_ascii_case(&bytes[end..], close.as_bytes()).map_or(html.len(), |i| end + i);
        }
        tags.push(RawTag { start, end, info });
    }
    tags
}

/// Offset of the first ASCII case-insensitive match of `needle` in `haystack`.
fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Byte offset just past the `>` closing the tag that starts at `start`,
/// ignoring `>` inside quoted attribute values.
fn tag_end(html: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (i, b) in html.bytes().enumerate().skip(start + 1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i + 1),
            (None, _) => {}
        }
    }
    None
}
